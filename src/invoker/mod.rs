//! Downstream function invocation
//!
//! Invokes a skill handler by name over HTTP and hands back its raw reply.
//! One request per call: no retries, no per-call timeout override.

pub mod payload;

use crate::dispatch::FunctionId;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Header a function sets when it failed while handling the request
pub const FUNCTION_ERROR_HEADER: &str = "x-function-error";

/// Characters of upstream bodies kept in error messages
const PREVIEW_CHARS: usize = 200;

/// Raw result of a function invocation
///
/// The payload is opaque to the invoker; [`payload::decode_reply`] projects it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    pub status_code: u16,
    pub payload: Vec<u8>,
}

/// Invocation failures, reported upward unchanged
#[derive(Debug, thiserror::Error)]
pub enum InvocationError {
    #[error("invocation of {function} failed: {source}")]
    Transport {
        function: FunctionId,
        #[source]
        source: reqwest::Error,
    },

    #[error("invocation of {function} returned HTTP {status}: {body_preview}")]
    Status {
        function: FunctionId,
        status: u16,
        body_preview: String,
    },

    #[error("function {function} reported a {kind} error: {message}")]
    FunctionError {
        function: FunctionId,
        kind: String,
        message: String,
    },

    #[error("reply from {function} is malformed: {reason}")]
    MalformedReply { function: FunctionId, reason: String },
}

/// Trait for invoking downstream functions
///
/// Allows dependency injection of invokers that don't make network calls.
#[async_trait]
pub trait FunctionInvoker: Send + Sync {
    async fn invoke(
        &self,
        function: &FunctionId,
        payload: Vec<u8>,
    ) -> Result<InvocationResult, InvocationError>;
}

/// Error body a failing function answers with
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FunctionErrorBody {
    error_message: String,
}

fn preview(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    if text.chars().count() > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        text.into_owned()
    }
}

/// Invoker that posts to `{base_url}/functions/{id}/invocations`
#[derive(Debug, Clone)]
pub struct HttpInvoker {
    http: reqwest::Client,
    base_url: reqwest::Url,
}

impl HttpInvoker {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build invoker client: {}", e)))?;

        let base_url: String = base_url.into();
        let base_url = reqwest::Url::parse(&base_url).map_err(|e| {
            AppError::Config(format!("invoker base URL '{}' is invalid: {}", base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Config(format!(
                "invoker base URL '{}' cannot carry a path",
                base_url
            )));
        }

        Ok(Self { http, base_url })
    }

    /// Invocation URL for a function
    ///
    /// The id is pushed as one path segment, so any reserved character in it
    /// is percent-encoded rather than read as URL syntax.
    pub fn invocation_url(&self, function: &FunctionId) -> reqwest::Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["functions", function.as_str(), "invocations"]);
        }
        url
    }
}

#[async_trait]
impl FunctionInvoker for HttpInvoker {
    async fn invoke(
        &self,
        function: &FunctionId,
        payload: Vec<u8>,
    ) -> Result<InvocationResult, InvocationError> {
        let url = self.invocation_url(function);
        tracing::debug!(
            function = %function,
            url = %url,
            payload_bytes = payload.len(),
            "Invoking downstream function"
        );

        let response = self
            .http
            .post(url.as_str())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(|source| InvocationError::Transport {
                function: function.clone(),
                source,
            })?;

        let status = response.status();
        let error_kind = response
            .headers()
            .get(FUNCTION_ERROR_HEADER)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());

        let body = response
            .bytes()
            .await
            .map_err(|source| InvocationError::Transport {
                function: function.clone(),
                source,
            })?;

        if let Some(kind) = error_kind {
            let message = serde_json::from_slice::<FunctionErrorBody>(&body)
                .map(|b| b.error_message)
                .unwrap_or_else(|_| preview(&body));
            tracing::warn!(
                function = %function,
                kind = %kind,
                status = status.as_u16(),
                "Downstream function reported an error"
            );
            return Err(InvocationError::FunctionError {
                function: function.clone(),
                kind,
                message,
            });
        }

        if !status.is_success() {
            tracing::warn!(
                function = %function,
                status = status.as_u16(),
                "Downstream function returned non-success status"
            );
            return Err(InvocationError::Status {
                function: function.clone(),
                status: status.as_u16(),
                body_preview: preview(&body),
            });
        }

        Ok(InvocationResult {
            status_code: status.as_u16(),
            payload: body.to_vec(),
        })
    }
}
