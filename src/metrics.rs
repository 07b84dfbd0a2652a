use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use once_cell::sync::Lazy;

/// Process-wide counters describing the collector itself.
///
/// Design:
/// - Lock-free (Atomics)
/// - Updated from every endpoint task
/// - Read by the periodic reporter in `main`
#[derive(Default)]
pub struct CollectorMetrics {
    pub cycles: AtomicUsize,
    pub endpoints_polled: AtomicUsize,
    pub measurements_emitted: AtomicUsize,

    pub endpoint_errors: AtomicUsize,
    pub decode_errors: AtomicUsize,
}

impl CollectorMetrics {
    pub fn summary(&self) -> String {
        format!(
            "cycles={} polled={} emitted={} errors={} decode_err={}",
            self.cycles.load(Ordering::Relaxed),
            self.endpoints_polled.load(Ordering::Relaxed),
            self.measurements_emitted.load(Ordering::Relaxed),
            self.endpoint_errors.load(Ordering::Relaxed),
            self.decode_errors.load(Ordering::Relaxed),
        )
    }
}

/// Global metrics registry (singleton)
pub static METRICS: Lazy<Arc<CollectorMetrics>> =
    Lazy::new(|| Arc::new(CollectorMetrics::default()));
