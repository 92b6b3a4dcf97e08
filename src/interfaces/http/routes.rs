//! Axum router and handlers for the instant-consultation API.
//!
//! `build_router` is the single entry point. Middleware layers (tracing) are
//! attached by `main.rs` so tests can drive the bare router in-process.
//! The acting user is identified by the `x-caller-id` header.

use super::api_types::{
    CreateConsultationBody, EndSessionBody, HealthResponse, PatchAction, PatchConsultationBody,
    PaymentBody, RespondBody,
};
use super::error::ApiError;
use super::extract::{ApiJson, ApiPath};
use super::state::AppState;
use crate::domain::consultation::ConsultationRequest;
use crate::error::ConsultationError;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use uuid::Uuid;

pub const CALLER_HEADER: &str = "x-caller-id";

type ApiResult<T> = Result<T, ApiError>;

/// Build the complete application router wired to the given shared state.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/instant-consultations", post(create_consultation))
        .route(
            "/instant-consultations/:id",
            get(get_consultation).patch(patch_consultation),
        )
        .route("/instant-consultations/:id/respond", post(respond))
        .route("/instant-consultations/:id/payment", post(capture_payment))
        .route("/instant-consultations/:id/start", post(start_session))
        .route("/instant-consultations/:id/end", post(end_session))
        .with_state(state)
}

fn caller_id(headers: &HeaderMap) -> ApiResult<Uuid> {
    headers
        .get(CALLER_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
        .ok_or(ApiError::Unauthenticated)
}

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
        }),
    )
}

// POST /instant-consultations
pub(crate) async fn create_consultation(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<CreateConsultationBody>,
) -> ApiResult<(StatusCode, Json<ConsultationRequest>)> {
    if caller_id(&headers)? != body.patient_id {
        return Err(ConsultationError::Unauthorized.into());
    }
    let created = st
        .engine
        .create_request(body.patient_id, body.practitioner_id, body.chief_complaint)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

// GET /instant-consultations/:id
pub(crate) async fn get_consultation(
    State(st): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    headers: HeaderMap,
) -> ApiResult<Json<ConsultationRequest>> {
    let caller = caller_id(&headers)?;
    Ok(Json(st.engine.get_status(id, caller).await?))
}

// POST /instant-consultations/:id/respond
pub(crate) async fn respond(
    State(st): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<RespondBody>,
) -> ApiResult<Json<ConsultationRequest>> {
    let caller = caller_id(&headers)?;
    Ok(Json(st.engine.respond(id, caller, body.decision).await?))
}

// POST /instant-consultations/:id/payment
pub(crate) async fn capture_payment(
    State(st): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<PaymentBody>,
) -> ApiResult<Json<ConsultationRequest>> {
    let caller = caller_id(&headers)?;
    let paid = st
        .engine
        .capture_payment(id, caller, body.method)
        .await
        .map_err(ApiError::payment)?;
    Ok(Json(paid))
}

// POST /instant-consultations/:id/start
pub(crate) async fn start_session(
    State(st): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    headers: HeaderMap,
) -> ApiResult<Json<ConsultationRequest>> {
    let caller = caller_id(&headers)?;
    Ok(Json(st.engine.start_session(id, caller).await?))
}

// POST /instant-consultations/:id/end
pub(crate) async fn end_session(
    State(st): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<EndSessionBody>,
) -> ApiResult<Json<ConsultationRequest>> {
    let caller = caller_id(&headers)?;
    Ok(Json(st.engine.end_session(id, caller, body.outcome).await?))
}

// PATCH /instant-consultations/:id
pub(crate) async fn patch_consultation(
    State(st): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<PatchConsultationBody>,
) -> ApiResult<Json<ConsultationRequest>> {
    let caller = caller_id(&headers)?;
    match body.action {
        PatchAction::Cancel => Ok(Json(st.engine.cancel(id, caller, body.reason).await?)),
    }
}
