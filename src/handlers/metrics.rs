//! Prometheus metrics endpoint

use axum::{extract::State, http::StatusCode};

use crate::handlers::AppState;

/// Metrics handler for Prometheus scraping
///
/// - `200 OK` with metrics in Prometheus text format
/// - `500 Internal Server Error` if metrics collection fails
pub async fn handler(State(state): State<AppState>) -> (StatusCode, String) {
    match state.metrics().gather() {
        Ok(output) => (StatusCode::OK, output),
        Err(e) => {
            tracing::error!(error = %e, "Failed to gather metrics for Prometheus scraping");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to gather metrics: {}", e),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::*;
    use crate::metrics::Outcome;

    #[tokio::test]
    async fn test_metrics_handler_returns_prometheus_format() {
        let state = test_state();
        state.metrics().record_request(Outcome::Ok).unwrap();

        let (status, body) = handler(State(state)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("# TYPE skillroute_requests_total counter"));
    }
}
