use crate::Error;
use kube::ResourceExt;
use opentelemetry::trace::TraceId;
use prometheus::{
    histogram_opts, opts, HistogramVec, IntCounter, IntCounterVec, Registry,
};
use tokio::time::Instant;

/// Metrics for the reconcile loop shared across all six per-kind
/// controllers, registered once against the
/// manager's `prometheus::Registry` and exposed on `/metrics`.
#[derive(Clone)]
pub struct Metrics {
    pub runs: IntCounter,
    pub failures: IntCounterVec,
    pub duration: HistogramVec,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            runs: IntCounter::new("neo4j_operator_reconcile_runs", "reconciliations").unwrap(),
            failures: IntCounterVec::new(
                opts!("neo4j_operator_reconcile_failures", "reconciliation errors"),
                &["instance", "error"],
            )
            .unwrap(),
            duration: HistogramVec::new(
                histogram_opts!(
                    "neo4j_operator_reconcile_duration_seconds",
                    "reconcile duration",
                    vec![0.01, 0.1, 0.25, 0.5, 1., 5., 15., 60.]
                ),
                &["trace_id"],
            )
            .unwrap(),
        }
    }
}

impl Metrics {
    /// Registers every metric with the manager's registry. Mirrors the
    /// teacher's `ReconcileMetrics::register`, adapted to the plain
    /// `prometheus` crate already pinned in `Cargo.toml`.
    pub fn register(self, registry: &Registry) -> prometheus::Result<Self> {
        registry.register(Box::new(self.runs.clone()))?;
        registry.register(Box::new(self.failures.clone()))?;
        registry.register(Box::new(self.duration.clone()))?;
        Ok(self)
    }

    pub fn set_failure<K: ResourceExt>(&self, obj: &K, e: &Error) {
        self.failures.with_label_values(&[&obj.name_any(), &e.metric_label()]).inc();
    }

    pub fn count_and_measure(&self, trace_id: &TraceId) -> ReconcileMeasurer {
        self.runs.inc();
        let trace_id = if std::matches!(trace_id, &TraceId::INVALID) {
            None
        } else {
            Some(trace_id.to_string())
        };
        ReconcileMeasurer {
            start: Instant::now(),
            trace_id,
            metric: self.duration.clone(),
        }
    }
}

/// Relies on `Drop` to calculate duration and register the observation
/// in the histogram.
pub struct ReconcileMeasurer {
    start: Instant,
    trace_id: Option<String>,
    metric: HistogramVec,
}

impl Drop for ReconcileMeasurer {
    fn drop(&mut self) {
        #[allow(clippy::cast_precision_loss)]
        let duration = self.start.elapsed().as_millis() as f64 / 1000.0;
        let label = self.trace_id.take().unwrap_or_default();
        self.metric.with_label_values(&[&label]).observe(duration);
    }
}
