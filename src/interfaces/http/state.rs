//! Shared state handed to every axum handler.

use crate::application::engine::ConsultationEngine;
use std::sync::Arc;

/// Static build metadata included in health responses.
#[derive(Clone, Debug)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

/// Cloneable handle shared across all handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub engine: Arc<ConsultationEngine>,
    pub build: BuildInfo,
}

impl AppState {
    pub fn new(engine: Arc<ConsultationEngine>) -> Self {
        Self {
            engine,
            build: BuildInfo {
                service: env!("CARGO_PKG_NAME"),
                version: env!("CARGO_PKG_VERSION"),
            },
        }
    }
}
