//! Health check endpoint
//!
//! Provides a simple health check for monitoring and load balancers.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::authorizer::AuthorizerPhase;
use crate::handlers::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: &'static str,
    /// Authorizer lifecycle phase: "ready" or "degraded" after start-up
    pub authorizer: &'static str,
    /// Configured skills
    pub skills: usize,
    /// Functions hosted by this process
    pub hosted_functions: usize,
}

/// Health check handler
///
/// Always 200: a degraded authorizer still serves (it denies everything), so
/// it is reported rather than failing the probe.
pub async fn handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let phase = state.authorizer().phase();
    let status = match phase {
        AuthorizerPhase::Ready => "OK",
        _ => "DEGRADED",
    };

    (
        StatusCode::OK,
        Json(HealthResponse {
            status,
            authorizer: phase.as_str(),
            skills: state.skills().len(),
            hosted_functions: state.functions().len(),
        }),
    )
}
