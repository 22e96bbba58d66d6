use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::models::{LabelSet, QueryValue, TimeWindow};

pub mod http;
#[cfg(test)]
pub(crate) mod stub;

pub use http::{HttpBackendFactory, PrometheusClient};

/// Where the metrics backend lives and how to authenticate against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource {
    pub url: String,
    #[serde(default)]
    pub token: Option<String>,
}

/// The subset of the Prometheus HTTP API the service relies on.
#[async_trait]
pub trait MetricsBackend: Send + Sync {
    /// Evaluates `query` over every step of `window`.
    async fn query_range(
        &self,
        query: &str,
        window: &TimeWindow,
    ) -> Result<QueryValue, BackendError>;

    /// Returns the label sets of all series matching any of `matchers`
    /// between `start` and `end`.
    async fn series(
        &self,
        matchers: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<LabelSet>, BackendError>;
}

/// Builds a backend client for a data source. Called once per request.
pub trait BackendFactory: Send + Sync {
    fn connect(&self, source: &DataSource) -> Result<Arc<dyn MetricsBackend>, BackendError>;
}
