//! Prometheus metrics collection for skillroute
//!
//! Tracks:
//! - Routed requests by outcome
//! - Pipeline stage latency
//! - Downstream invocations by skill
//! - Authorizer decisions by effect
//!
//! Exposed via the `/metrics` endpoint in Prometheus text format.

use crate::authorizer::Effect;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Final outcome of a routed request
///
/// Enum labels keep cardinality fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    BadRequest,
    Unauthorized,
    ClassificationFailure,
    DispatchFailure,
    InvocationFailure,
    Internal,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Ok => "ok",
            Outcome::BadRequest => "bad_request",
            Outcome::Unauthorized => "unauthorized",
            Outcome::ClassificationFailure => "classification_failure",
            Outcome::DispatchFailure => "dispatch_failure",
            Outcome::InvocationFailure => "invocation_failure",
            Outcome::Internal => "internal",
        }
    }
}

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Normalize,
    Classify,
    Dispatch,
    Invoke,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Normalize => "normalize",
            Stage::Classify => "classify",
            Stage::Dispatch => "dispatch",
            Stage::Invoke => "invoke",
        }
    }
}

/// Metrics collector for skillroute
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    requests_total: IntCounterVec,
    stage_duration: HistogramVec,
    skill_invocations: IntCounterVec,
    auth_decisions: IntCounterVec,
}

impl Metrics {
    /// Create a new Metrics instance with its own registry
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new(
                "skillroute_requests_total",
                "Total number of routed chat events by outcome",
            ),
            &["outcome"],
        )?;

        // Classify and invoke are network-bound, so buckets reach into seconds
        let stage_duration = HistogramVec::new(
            HistogramOpts::new(
                "skillroute_stage_duration_ms",
                "Pipeline stage latency in milliseconds",
            )
            .buckets(vec![
                0.1, 0.5, 1.0, 5.0, 10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0, 30000.0,
            ]),
            &["stage"],
        )?;

        // Skill label values come from the configured skill table only
        let skill_invocations = IntCounterVec::new(
            Opts::new(
                "skillroute_skill_invocations_total",
                "Total downstream invocations by skill",
            ),
            &["skill"],
        )?;

        let auth_decisions = IntCounterVec::new(
            Opts::new(
                "skillroute_auth_decisions_total",
                "Total authorizer decisions by effect",
            ),
            &["effect"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(stage_duration.clone()))?;
        registry.register(Box::new(skill_invocations.clone()))?;
        registry.register(Box::new(auth_decisions.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            requests_total,
            stage_duration,
            skill_invocations,
            auth_decisions,
        })
    }

    /// Record a finished request
    pub fn record_request(&self, outcome: Outcome) -> Result<(), prometheus::Error> {
        self.requests_total
            .get_metric_with_label_values(&[outcome.as_str()])?
            .inc();
        Ok(())
    }

    /// Record a stage duration
    ///
    /// # Errors
    ///
    /// Rejects NaN, infinite and negative values; they corrupt histogram
    /// percentiles.
    pub fn record_stage_duration(
        &self,
        stage: Stage,
        duration_ms: f64,
    ) -> Result<(), prometheus::Error> {
        if !duration_ms.is_finite() {
            return Err(prometheus::Error::Msg(format!(
                "Histogram value must be finite, got: {}",
                duration_ms
            )));
        }
        if duration_ms < 0.0 {
            return Err(prometheus::Error::Msg(format!(
                "Histogram value must be non-negative, got: {}",
                duration_ms
            )));
        }

        self.stage_duration
            .get_metric_with_label_values(&[stage.as_str()])?
            .observe(duration_ms);
        Ok(())
    }

    /// Record a downstream invocation for a resolved skill
    pub fn record_skill_invocation(&self, skill: &str) -> Result<(), prometheus::Error> {
        self.skill_invocations
            .get_metric_with_label_values(&[skill])?
            .inc();
        Ok(())
    }

    /// Record an authorizer decision
    pub fn record_auth_decision(&self, effect: Effect) -> Result<(), prometheus::Error> {
        self.auth_decisions
            .get_metric_with_label_values(&[effect.as_str()])?
            .inc();
        Ok(())
    }

    /// Encode all metrics in Prometheus text format
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    metric_family_count = metric_families.len(),
                    "Prometheus text encoder failed"
                );
                e
            })?;

        String::from_utf8(buffer).map_err(|e| {
            prometheus::Error::Msg(format!(
                "Failed to convert metrics to UTF-8 at byte {}: {}",
                e.utf8_error().valid_up_to(),
                e
            ))
        })
    }
}
