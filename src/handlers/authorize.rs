//! Authorizer entry point
//!
//! Gateway authorizer event in, IAM-style policy document out. A decoded event
//! always gets 200: a Deny is a policy, not an HTTP error. An event that does
//! not decode gets the builder's JSON 400.

use crate::authorizer::{AuthorizerRequest, AuthorizerResponse};
use crate::error::AppError;
use crate::handlers::AppState;
use crate::ingress::NormalizationError;
use axum::{
    Json,
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
};

/// Handler for `POST /authorize`
pub async fn handler(State(state): State<AppState>, body: Bytes) -> Response {
    let request: AuthorizerRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected undecodable authorizer event");
            return AppError::from(NormalizationError::MalformedEvent {
                reason: e.to_string(),
            })
            .into_response();
        }
    };

    let decision = state.authorizer().authorize(&request);
    if let Err(e) = state.metrics().record_auth_decision(decision.effect) {
        tracing::warn!(error = %e, "Failed to record auth decision metric");
    }
    tracing::debug!(
        resource = %decision.resource,
        effect = %decision.effect,
        "Authorizer decision"
    );
    Json(AuthorizerResponse::from(&decision)).into_response()
}
