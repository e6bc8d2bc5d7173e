//! Gateway-layer bearer token enforcement
//!
//! Consults the [`TokenAuthorizer`](crate::authorizer::TokenAuthorizer) before
//! a request reaches the router. A missing `Authorization` header answers 401,
//! a Deny answers 403. The router handlers never see rejected requests.

use crate::error::AppError;
use crate::handlers::AppState;
use crate::metrics::Outcome;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Require a bearer token the authorizer allows
pub async fn require_bearer(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let resource = format!("{} {}", request.method(), request.uri().path());

    let Some(header) = request.headers().get(AUTHORIZATION) else {
        tracing::warn!(resource = %resource, "Request without Authorization header");
        return reject(&state, AppError::Unauthorized("missing Authorization header".to_string()));
    };
    let Ok(token) = header.to_str() else {
        tracing::warn!(resource = %resource, "Authorization header is not valid UTF-8");
        return reject(&state, AppError::Unauthorized("unreadable Authorization header".to_string()));
    };

    let decision = state.authorizer().authorize_token(Some(token), &resource);
    if let Err(e) = state.metrics().record_auth_decision(decision.effect) {
        tracing::warn!(error = %e, "Failed to record auth decision metric");
    }

    if !decision.is_allowed() {
        return reject(&state, AppError::Forbidden(format!("token denied for {}", resource)));
    }

    next.run(request).await
}

/// Count a rejected request under the request outcome metric and answer it
fn reject(state: &AppState, err: AppError) -> Response {
    if let Err(e) = state.metrics().record_request(Outcome::Unauthorized) {
        tracing::warn!(error = %e, "Failed to record request metric");
    }
    err.into_response()
}
