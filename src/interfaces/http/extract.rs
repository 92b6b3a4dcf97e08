//! Extractors whose rejections follow the `{error, message}` contract.

use super::error::ApiError;
use axum::extract::{FromRequest, FromRequestParts};

/// `axum::Json`, rejecting malformed bodies as `VALIDATION_ERROR`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Path`, rejecting malformed ids as `VALIDATION_ERROR`.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);
