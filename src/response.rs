//! Gateway response shaping
//!
//! Every reply leaves as `{"response": ...}` on success or `{"error": ...}` on
//! failure, always with `Content-Type: application/json`.

use axum::{
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Content type of every gateway reply
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Gateway proxy response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

/// Body of a gateway reply, serialized as a single-key object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseBody {
    Response(String),
    Error(String),
}

/// Build a gateway response with a JSON body
pub fn build(status: StatusCode, body: ResponseBody) -> GatewayResponse {
    let mut headers = BTreeMap::new();
    headers.insert("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string());

    match serde_json::to_string(&body) {
        Ok(body) => GatewayResponse {
            status_code: status.as_u16(),
            headers,
            body,
        },
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize response body");
            GatewayResponse {
                status_code: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                headers,
                body: format!(
                    r#"{{"error":"{}"}}"#,
                    crate::error::INTERNAL_ERROR_MESSAGE
                ),
            }
        }
    }
}

impl GatewayResponse {
    /// 200 with `{"response": value}`
    pub fn ok(value: impl Into<String>) -> Self {
        build(StatusCode::OK, ResponseBody::Response(value.into()))
    }

    /// Error status with `{"error": message}`
    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        build(status, ResponseBody::Error(message.into()))
    }

    /// Header value by exact name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

impl IntoResponse for GatewayResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, self.body).into_response();

        let headers = response.headers_mut();
        for (name, value) in &self.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => tracing::warn!(header = %name, "Dropping invalid response header"),
            }
        }
        response
    }
}
