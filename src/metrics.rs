use std::time::Instant;

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec_with_registry, register_int_counter_vec_with_registry, Encoder,
    HistogramVec, IntCounterVec, Registry, TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Request metrics
    pub static ref REQUEST_COUNTER: IntCounterVec = register_int_counter_vec_with_registry!(
        "pod_monitor_requests_total",
        "Total number of requests handled, by endpoint and status code",
        &["endpoint", "status"],
        REGISTRY
    ).unwrap();

    pub static ref REQUEST_DURATION: HistogramVec = register_histogram_vec_with_registry!(
        "pod_monitor_request_duration_seconds",
        "Request duration in seconds",
        &["endpoint"],
        vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 30.0],
        REGISTRY
    ).unwrap();

    // Backend metrics
    pub static ref BACKEND_QUERIES: IntCounterVec = register_int_counter_vec_with_registry!(
        "pod_monitor_backend_queries_total",
        "Queries sent to the metrics backend, by kind and outcome",
        &["kind", "outcome"],
        REGISTRY
    ).unwrap();
}

/// Registers process metrics (CPU, memory, file descriptors) where supported.
pub fn init_metrics() {
    #[cfg(target_os = "linux")]
    {
        let collector = prometheus::process_collector::ProcessCollector::for_self();
        if let Err(e) = REGISTRY.register(Box::new(collector)) {
            tracing::warn!("Failed to register process collector: {}", e);
        }
    }
}

/// Observes the request duration when dropped.
pub struct RequestTimer {
    endpoint: &'static str,
    start: Instant,
}

impl RequestTimer {
    pub fn new(endpoint: &'static str) -> Self {
        Self {
            endpoint,
            start: Instant::now(),
        }
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        REQUEST_DURATION
            .with_label_values(&[self.endpoint])
            .observe(duration);
    }
}

pub fn record_request(endpoint: &str, status: u16) {
    let status = status.to_string();
    REQUEST_COUNTER
        .with_label_values(&[endpoint, status.as_str()])
        .inc();
}

pub fn record_backend_query(kind: &str, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    BACKEND_QUERIES.with_label_values(&[kind, outcome]).inc();
}

/// Renders the registry in the Prometheus text format.
pub fn gather() -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_show_up_in_exposition() {
        record_request("monitor", 200);
        record_backend_query("query_range", false);
        {
            let _timer = RequestTimer::new("monitor");
        }

        let text = gather().unwrap();
        assert!(text.contains("pod_monitor_requests_total{endpoint=\"monitor\",status=\"200\"}"));
        assert!(text.contains("pod_monitor_backend_queries_total{kind=\"query_range\",outcome=\"error\"}"));
        assert!(text.contains("pod_monitor_request_duration_seconds_count{endpoint=\"monitor\"}"));
    }
}
