//! Hosted function invocations
//!
//! Serves `POST /functions/{name}/invocations` for functions registered in the
//! [`FunctionRegistry`](crate::skills::FunctionRegistry). Failures carry the
//! `X-Function-Error` marker so the invoker reports them as function errors.

use crate::dispatch::FunctionId;
use crate::handlers::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Function error marker value for failures inside a function
const UNHANDLED: &str = "Unhandled";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FunctionErrorBody {
    error_message: String,
    error_type: &'static str,
}

/// Handler for `POST /functions/{name}/invocations`
pub async fn handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Response {
    let function_id = FunctionId::from(name);
    let Some(function) = state.functions().get(&function_id) else {
        tracing::warn!(function = %function_id, "Invocation of unknown function");
        return (StatusCode::NOT_FOUND, format!("function {} not found", function_id))
            .into_response();
    };

    match function.handle(&body).await {
        Ok(payload) => ([(CONTENT_TYPE, "application/json")], payload).into_response(),
        Err(failure) => {
            tracing::error!(function = %function_id, error = %failure, "Function failed");
            let error_body = FunctionErrorBody {
                error_message: failure.to_string(),
                error_type: failure.error_type(),
            };
            let body = serde_json::to_vec(&error_body).unwrap_or_default();
            (
                StatusCode::BAD_GATEWAY,
                [
                    (CONTENT_TYPE, "application/json"),
                    (
                        axum::http::HeaderName::from_static(crate::invoker::FUNCTION_ERROR_HEADER),
                        UNHANDLED,
                    ),
                ],
                body,
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::*;
    use crate::skills::{FunctionFailure, FunctionRegistry, SkillFunction};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Fixed(Result<&'static str, FunctionFailure>);

    #[async_trait]
    impl SkillFunction for Fixed {
        async fn handle(&self, _payload: &[u8]) -> Result<Vec<u8>, FunctionFailure> {
            self.0.clone().map(|s| s.as_bytes().to_vec())
        }
    }

    fn state(function: Fixed) -> AppState {
        test_state()
            .with_functions(FunctionRegistry::default().with_function("link-shortener", Arc::new(function)))
    }

    #[tokio::test]
    async fn test_success_returns_payload() {
        let response = handler(
            State(state(Fixed(Ok(r#"{"shortLink":"https://short.ly/x"}"#)))),
            Path("link-shortener".to_string()),
            Bytes::from_static(br#"{"longLink":"https://example.com"}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(crate::invoker::FUNCTION_ERROR_HEADER).is_none());
    }

    #[tokio::test]
    async fn test_failure_sets_function_error_marker() {
        let response = handler(
            State(state(Fixed(Err(FunctionFailure::Upstream("dub down".into()))))),
            Path("link-shortener".to_string()),
            Bytes::new(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            response.headers().get("X-Function-Error").unwrap(),
            "Unhandled"
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["errorMessage"], "upstream failure: dub down");
        assert_eq!(json["errorType"], "Upstream");
    }

    #[tokio::test]
    async fn test_unknown_function_is_not_found() {
        let response = handler(
            State(test_state()),
            Path("missing".to_string()),
            Bytes::new(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
