//! Chat event routing pipeline
//!
//! normalize -> classify -> dispatch -> invoke -> build. Stages run strictly in
//! sequence and the first failure ends the request; every outcome leaves
//! through the same response builder.

use crate::error::AppError;
use crate::handlers::AppState;
use crate::ingress::{ChatEvent, NormalizationError, SOURCE_SYSTEM_HEADER};
use crate::invoker::payload;
use crate::metrics::{Outcome, Stage};
use crate::middleware::RequestId;
use crate::response::GatewayResponse;
use axum::{
    Extension,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use std::time::Instant;

/// Handler for `POST /route`: raw chat payload plus headers
pub async fn handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    body: Bytes,
) -> GatewayResponse {
    let source_header = match headers.get(SOURCE_SYSTEM_HEADER) {
        Some(value) => match value.to_str() {
            Ok(value) => Some(value),
            Err(_) => {
                let err = AppError::from(NormalizationError::UnknownSourceSystem(
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                ));
                return finish(&state, request_id, Err(err));
            }
        },
        None => None,
    };

    route_chat_event(&state, request_id, source_header, &body).await
}

/// Run the pipeline over one chat payload and shape the reply
pub async fn route_chat_event(
    state: &AppState,
    request_id: RequestId,
    source_header: Option<&str>,
    body: &[u8],
) -> GatewayResponse {
    let result = run_pipeline(state, request_id, source_header, body).await;
    finish(state, request_id, result)
}

async fn run_pipeline(
    state: &AppState,
    request_id: RequestId,
    source_header: Option<&str>,
    body: &[u8],
) -> Result<String, AppError> {
    let started = Instant::now();
    let input = ChatEvent::detect(source_header, body)?.normalize()?;
    record_stage(state, Stage::Normalize, started);
    tracing::debug!(
        request_id = %request_id,
        source_system = %input.source_system(),
        text_length = input.text().len(),
        "Normalized chat event"
    );

    let started = Instant::now();
    let skill = state.classifier().classify(&input).await?;
    record_stage(state, Stage::Classify, started);
    tracing::info!(
        request_id = %request_id,
        source_system = %input.source_system(),
        skill = %skill,
        "Classified intent"
    );

    let started = Instant::now();
    let target = state.skills().resolve(&skill)?;
    record_stage(state, Stage::Dispatch, started);

    let started = Instant::now();
    let request_payload = payload::encode_request(target, input.text());
    if let Err(e) = state.metrics().record_skill_invocation(target.skill()) {
        tracing::warn!(error = %e, "Failed to record skill invocation metric");
    }
    let result = state
        .invoker()
        .invoke(target.function(), request_payload)
        .await?;
    record_stage(state, Stage::Invoke, started);
    tracing::info!(
        request_id = %request_id,
        skill = %target.skill(),
        function = %target.function(),
        status = result.status_code,
        "Downstream function returned"
    );

    Ok(payload::decode_reply(target, &result)?)
}

/// Log, count and shape the pipeline result
pub(crate) fn finish(
    state: &AppState,
    request_id: RequestId,
    result: Result<String, AppError>,
) -> GatewayResponse {
    let outcome = match &result {
        Ok(_) => Outcome::Ok,
        Err(e) => outcome_of(e),
    };
    if let Err(e) = state.metrics().record_request(outcome) {
        tracing::warn!(error = %e, "Failed to record request metric");
    }

    match result {
        Ok(reply) => GatewayResponse::ok(reply),
        Err(err) => {
            log_failure(request_id, &err);
            err.to_gateway_response()
        }
    }
}

fn outcome_of(err: &AppError) -> Outcome {
    match err {
        AppError::BadRequest(_) => Outcome::BadRequest,
        AppError::Unauthorized(_) | AppError::Forbidden(_) => Outcome::Unauthorized,
        AppError::Classification(_) => Outcome::ClassificationFailure,
        AppError::Dispatch(_) => Outcome::DispatchFailure,
        AppError::Invocation(_) => Outcome::InvocationFailure,
        _ => Outcome::Internal,
    }
}

fn log_failure(request_id: RequestId, err: &AppError) {
    match err {
        // Shape mismatches warn; events with nothing to classify are routine
        AppError::BadRequest(
            cause @ (NormalizationError::MalformedPayload { .. }
            | NormalizationError::MalformedEvent { .. }),
        ) => tracing::warn!(
            request_id = %request_id,
            kind = cause.kind(),
            error = %err,
            "Rejected chat event"
        ),
        AppError::BadRequest(cause) => tracing::info!(
            request_id = %request_id,
            kind = cause.kind(),
            error = %err,
            "Rejected chat event"
        ),
        AppError::Dispatch(_) => tracing::warn!(
            request_id = %request_id,
            error = %err,
            "No handler for classified skill"
        ),
        _ => tracing::error!(
            request_id = %request_id,
            error = %err,
            "Chat event routing failed"
        ),
    }
}

fn record_stage(state: &AppState, stage: Stage, started: Instant) {
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    if let Err(e) = state.metrics().record_stage_duration(stage, elapsed_ms) {
        tracing::warn!(
            stage = stage.as_str(),
            error = %e,
            "Failed to record stage duration metric"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::*;

    async fn route(state: &AppState, header: Option<&str>, body: &[u8]) -> GatewayResponse {
        route_chat_event(state, RequestId::new(), header, body).await
    }

    #[tokio::test]
    async fn test_telegram_event_routes_to_short_link() {
        let response = route(&test_state(), Some("telegram"), br#"{"text":"shorten this link"}"#).await;
        assert_eq!(response.status_code, 200);
        assert_eq!(response.body, r#"{"response":"https://short.ly/x"}"#);
    }

    #[tokio::test]
    async fn test_empty_body_is_bad_request() {
        let response = route(&test_state(), Some("telegram"), b"").await;
        assert_eq!(response.status_code, 400);
        assert_eq!(response.body, r#"{"error":"bad request"}"#);
    }

    #[tokio::test]
    async fn test_slack_without_elements_is_bad_request() {
        let body = br#"[{"type":"rich_text","elements":[{"type":"rich_text_section","elements":[]}]}]"#;
        let response = route(&test_state(), Some("slack"), body).await;
        assert_eq!(response.status_code, 400);
    }

    #[tokio::test]
    async fn test_catch_all_skill_is_internal_error() {
        let state = state_with(
            StaticClassifier(Ok("other")),
            StaticInvoker(r#"{"shortLink":"unused"}"#),
        );
        let response = route(&state, Some("telegram"), br#"{"text":"tell me a joke"}"#).await;
        assert_eq!(response.status_code, 500);
        assert_eq!(response.body, r#"{"error":"internal server error"}"#);
    }

    #[tokio::test]
    async fn test_classification_failure_is_internal_error() {
        let state = state_with(
            StaticClassifier(Err("not json")),
            StaticInvoker(r#"{"shortLink":"unused"}"#),
        );
        let response = route(&state, Some("telegram"), br#"{"text":"hi"}"#).await;
        assert_eq!(response.status_code, 500);
    }

    #[tokio::test]
    async fn test_malformed_reply_is_internal_error() {
        let state = state_with(
            StaticClassifier(Ok("link_shortener")),
            StaticInvoker(r#"{"url":"https://short.ly/x"}"#),
        );
        let response = route(&state, Some("telegram"), br#"{"text":"hi"}"#).await;
        assert_eq!(response.status_code, 500);
    }

    #[tokio::test]
    async fn test_outcomes_are_counted() {
        let state = test_state();
        route(&state, Some("telegram"), br#"{"text":"hi"}"#).await;
        route(&state, Some("telegram"), b"").await;

        let output = state.metrics().gather().unwrap();
        assert!(output.contains(r#"skillroute_requests_total{outcome="ok"} 1"#));
        assert!(output.contains(r#"skillroute_requests_total{outcome="bad_request"} 1"#));
        assert!(output.contains(r#"skillroute_skill_invocations_total{skill="link_shortener"} 1"#));
    }

    #[test]
    fn test_outcome_mapping() {
        assert_eq!(
            outcome_of(&AppError::from(NormalizationError::EmptyBody)),
            Outcome::BadRequest
        );
        assert_eq!(
            outcome_of(&AppError::Internal("x".into())),
            Outcome::Internal
        );
    }
}
