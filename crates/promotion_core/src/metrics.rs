//! Metrics recording abstraction for promotion observability.

use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;

/// How an execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionOutcome {
    Completed,
    Failed,
    SmokeTestFailed,
}

impl ExecutionOutcome {
    /// Label value used for the `outcome` label.
    pub fn as_label(&self) -> &'static str {
        match self {
            ExecutionOutcome::Completed => "completed",
            ExecutionOutcome::Failed => "failed",
            ExecutionOutcome::SmokeTestFailed => "smoke_test_failed",
        }
    }
}

/// Abstraction for recording promotion metrics.
///
/// # Thread Safety
/// All implementations MUST be thread-safe (Send + Sync).
pub trait PromotionMetrics: Send + Sync {
    /// Records the creation of a promotion request.
    fn record_request_created(&self);

    /// Records the end of an execution.
    fn record_execution(&self, outcome: ExecutionOutcome);

    /// Records a successful rollback.
    fn record_rollback(&self);

    /// Increments the in-flight execution gauge.
    fn increment_in_flight(&self);

    /// Decrements the in-flight execution gauge.
    fn decrement_in_flight(&self);
}

/// Prometheus metrics collector for promotions.
///
/// # Metrics
/// - `promotion_requests_created_total` (Counter)
/// - `promotion_executions_total` (Counter, label `outcome`)
/// - `promotion_rollbacks_total` (Counter)
/// - `promotion_executions_in_flight` (Gauge)
pub struct PrometheusPromotionMetrics {
    requests_created: IntCounter,
    executions: IntCounterVec,
    rollbacks: IntCounter,
    in_flight: IntGauge,
}

impl PrometheusPromotionMetrics {
    /// Creates the collectors and registers them with `registry`.
    ///
    /// # Errors
    /// Returns an error if a metric with the same name is already registered.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let requests_created = IntCounter::new(
            "promotion_requests_created_total",
            "Number of promotion requests created",
        )?;
        let executions = IntCounterVec::new(
            Opts::new(
                "promotion_executions_total",
                "Number of finished promotion executions by outcome",
            ),
            &["outcome"],
        )?;
        let rollbacks = IntCounter::new(
            "promotion_rollbacks_total",
            "Number of promotions rolled back",
        )?;
        let in_flight = IntGauge::new(
            "promotion_executions_in_flight",
            "Number of promotion executions currently running",
        )?;

        registry.register(Box::new(requests_created.clone()))?;
        registry.register(Box::new(executions.clone()))?;
        registry.register(Box::new(rollbacks.clone()))?;
        registry.register(Box::new(in_flight.clone()))?;

        Ok(Self {
            requests_created,
            executions,
            rollbacks,
            in_flight,
        })
    }
}

impl PromotionMetrics for PrometheusPromotionMetrics {
    fn record_request_created(&self) {
        self.requests_created.inc();
    }

    fn record_execution(&self, outcome: ExecutionOutcome) {
        self.executions
            .with_label_values(&[outcome.as_label()])
            .inc();
    }

    fn record_rollback(&self) {
        self.rollbacks.inc();
    }

    fn increment_in_flight(&self) {
        self.in_flight.inc();
    }

    fn decrement_in_flight(&self) {
        self.in_flight.dec();
    }
}

/// No-op metrics implementation for testing or when metrics are disabled.
#[derive(Debug, Clone, Default)]
pub struct NoOpPromotionMetrics;

impl NoOpPromotionMetrics {
    pub fn new() -> Self {
        Self
    }
}

impl PromotionMetrics for NoOpPromotionMetrics {
    fn record_request_created(&self) {}
    fn record_execution(&self, _outcome: ExecutionOutcome) {}
    fn record_rollback(&self) {}
    fn increment_in_flight(&self) {}
    fn decrement_in_flight(&self) {}
}
