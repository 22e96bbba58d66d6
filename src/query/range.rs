use std::time::Duration;

use tracing::{debug, warn};

use crate::backend::MetricsBackend;
use crate::error::{BackendError, QueryError};
use crate::metrics;
use crate::models::{QueryValue, SampleStream, SeriesSet, TimeWindow};

/// Label set on every returned series so the frontend can tell them apart.
pub const SERIES_NAME_LABEL: &str = "name";

/// A query expression and the value of the `name` label its series gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamedQuery<'a> {
    pub expr: &'a str,
    pub name: &'a str,
}

/// Queries behind the pod monitor endpoint. Both series are labelled
/// `cpu_usage`; clients key on that value.
pub const POD_MONITOR_QUERIES: [NamedQuery<'static>; 2] = [
    NamedQuery {
        expr: "up",
        name: "cpu_usage",
    },
    NamedQuery {
        expr: "process_start_time_seconds",
        name: "cpu_usage",
    },
];

/// Runs a list of range queries one after the other and merges the first
/// series of each result.
pub struct RangeQueryOrchestrator<'a> {
    backend: &'a dyn MetricsBackend,
    timeout: Duration,
}

impl<'a> RangeQueryOrchestrator<'a> {
    pub fn new(backend: &'a dyn MetricsBackend, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Stops at the first failing query; a partial result is never returned.
    pub async fn execute(
        &self,
        window: &TimeWindow,
        queries: &[NamedQuery<'_>],
    ) -> Result<SeriesSet, QueryError> {
        let mut data = SeriesSet::with_capacity(queries.len());

        for query in queries {
            debug!("Running range query {:?} as {:?}", query.expr, query.name);

            let value = match tokio::time::timeout(
                self.timeout,
                self.backend.query_range(query.expr, window),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(BackendError::Timeout(self.timeout)),
            };
            let series = first_series(value);
            metrics::record_backend_query("query_range", series.is_ok());

            let mut series = series.map_err(|e| {
                warn!("Range query {:?} failed: {}", query.expr, e);
                e
            })?;
            series
                .metric
                .insert(SERIES_NAME_LABEL.to_string(), query.name.to_string());
            data.push(series);
        }

        Ok(data)
    }
}

/// One series per query is expected; anything after the first is dropped.
fn first_series(value: Result<QueryValue, BackendError>) -> Result<SampleStream, QueryError> {
    match value? {
        QueryValue::Matrix(matrix) => matrix.into_iter().next().ok_or(QueryError::EmptyResult),
        other => Err(QueryError::UnexpectedValueType(other.kind())),
    }
}
