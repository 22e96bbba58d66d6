use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::backend::MetricsBackend;
use crate::error::{BackendError, QueryError};
use crate::metrics;
use crate::models::{WorkloadIdentity, METRIC_NAME_LABEL};

pub const NAMESPACE_LABEL: &str = "kubernetes_namespace";
pub const POD_NAME_LABEL: &str = "kubernetes_pod_name";

/// How far back series metadata is searched.
pub const DISCOVERY_LOOKBACK_HOURS: i64 = 10_000;

/// Series selector matching everything scraped from the workload's pod.
pub fn pod_selector(identity: &WorkloadIdentity) -> String {
    format!(
        "{{{}=\"{}\", {}=\"{}\"}}",
        NAMESPACE_LABEL,
        escape_label_value(&identity.namespace),
        POD_NAME_LABEL,
        escape_label_value(&identity.pod)
    )
}

fn escape_label_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Lists the metric names recorded for a pod, in the order the backend
/// returns the series. Names are neither sorted nor deduplicated.
pub async fn discover(
    backend: &dyn MetricsBackend,
    identity: &WorkloadIdentity,
    now: DateTime<Utc>,
    timeout: Duration,
) -> Result<Vec<String>, QueryError> {
    let matchers = [pod_selector(identity)];
    let start = now - chrono::Duration::hours(DISCOVERY_LOOKBACK_HOURS);

    let series = match tokio::time::timeout(timeout, backend.series(&matchers, start, now)).await {
        Ok(result) => result,
        Err(_) => Err(BackendError::Timeout(timeout)),
    };
    metrics::record_backend_query("series", series.is_ok());

    let names: Vec<String> = series?
        .into_iter()
        .map(|mut labels| labels.remove(METRIC_NAME_LABEL).unwrap_or_default())
        .collect();

    debug!("metrics of {} are {:?}", identity, names);
    Ok(names)
}
