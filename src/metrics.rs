//! Prometheus metrics for the datastore
//!
//! # Metrics
//!
//! ## Counters
//! - `kdd_datastore_operations_total{operation, kind}` - Datastore calls made
//! - `kdd_datastore_errors_total{operation, kind}` - Datastore calls that failed

use crate::error::{Error, Result};
use crate::model::KeyKind;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;
use tracing::warn;

const LABELS: &[&str] = &["operation", "kind"];

/// Datastore metrics registry
pub struct DatastoreMetrics {
    registry: Registry,

    /// Calls by operation and key kind
    pub operations: IntCounterVec,
    /// Failed calls by operation and key kind
    pub errors: IntCounterVec,
}

impl DatastoreMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let operations = IntCounterVec::new(
            Opts::new("kdd_datastore_operations_total", "Datastore operations by kind"),
            LABELS,
        )?;
        registry.register(Box::new(operations.clone()))?;

        let errors = IntCounterVec::new(
            Opts::new("kdd_datastore_errors_total", "Failed datastore operations by kind"),
            LABELS,
        )?;
        registry.register(Box::new(errors.clone()))?;

        Ok(Self {
            registry,
            operations,
            errors,
        })
    }

    /// Render all metrics in the Prometheus text format.
    pub fn gather_text(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| Error::Internal(format!("failed to encode metrics: {}", e)))?;
        String::from_utf8(buffer).map_err(|e| Error::Internal(format!("metrics are not UTF-8: {}", e)))
    }
}

static METRICS: OnceLock<Option<DatastoreMetrics>> = OnceLock::new();

/// Process-wide metrics, if they could be registered
pub fn metrics() -> Option<&'static DatastoreMetrics> {
    METRICS
        .get_or_init(|| match DatastoreMetrics::new() {
            Ok(m) => Some(m),
            Err(e) => {
                warn!(error = %e, "Failed to register datastore metrics");
                None
            }
        })
        .as_ref()
}

/// Count one call and, if it failed, one error; the result passes through.
pub fn observe<T>(operation: &'static str, kind: KeyKind, result: Result<T>) -> Result<T> {
    if let Some(m) = metrics() {
        let labels = [operation, kind.as_str()];
        m.operations.with_label_values(&labels).inc();
        if result.is_err() {
            m.errors.with_label_values(&labels).inc();
        }
    }
    result
}
