//! Gateway proxy event entry point
//!
//! Accepts a full [`GatewayRequest`] and answers with the [`GatewayResponse`](crate::response::GatewayResponse)
//! as JSON, the way a proxy-integrated function is invoked. The gateway that
//! produced the event has already run the authorizer.
//!
//! An event that does not decode has no proxy envelope to answer in, so it is
//! answered directly with the builder's `{"error": ...}` body and status 400.

use crate::error::AppError;
use crate::handlers::AppState;
use crate::handlers::route::{finish, route_chat_event};
use crate::ingress::{GatewayRequest, NormalizationError, SOURCE_SYSTEM_HEADER};
use crate::middleware::RequestId;
use axum::{
    Extension, Json,
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
};

/// Handler for `POST /events`
pub async fn handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    body: Bytes,
) -> Response {
    let event: GatewayRequest = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            let err = AppError::from(NormalizationError::MalformedEvent {
                reason: e.to_string(),
            });
            return finish(&state, request_id, Err(err)).into_response();
        }
    };

    tracing::debug!(
        request_id = %request_id,
        http_method = %event.http_method,
        path = ?event.path,
        "Received gateway proxy event"
    );

    let response = route_chat_event(
        &state,
        request_id,
        event.header(SOURCE_SYSTEM_HEADER),
        event.body_bytes(),
    )
    .await;
    Json(response).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::*;
    use crate::response::GatewayResponse;
    use axum::http::StatusCode;

    async fn call(body: &str) -> (StatusCode, GatewayResponse) {
        let response = handler(
            State(test_state()),
            Extension(RequestId::new()),
            Bytes::from(body.to_string()),
        )
        .await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_proxy_event_round_trip() {
        let (status, response) = call(
            r#"{"httpMethod":"POST","headers":{"source-system":"Telegram"},"body":"{\"text\":\"shorten this link\"}"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response.status_code, 200);
        assert_eq!(response.body, r#"{"response":"https://short.ly/x"}"#);
        assert_eq!(response.header("Content-Type"), Some("application/json"));
    }

    #[tokio::test]
    async fn test_proxy_event_without_body() {
        let (status, response) = call(r#"{"httpMethod":"POST"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response.status_code, 400);
        assert_eq!(response.body, r#"{"error":"bad request"}"#);
    }

    #[tokio::test]
    async fn test_undecodable_event_answers_json_bad_request() {
        let state = test_state();
        let response = handler(
            State(state.clone()),
            Extension(RequestId::new()),
            Bytes::from_static(b"not json"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], br#"{"error":"bad request"}"#);
        assert!(
            state
                .metrics()
                .gather()
                .unwrap()
                .contains(r#"skillroute_requests_total{outcome="bad_request"} 1"#)
        );
    }
}
