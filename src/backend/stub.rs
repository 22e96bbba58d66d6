//! In-memory backend used by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::{BackendFactory, DataSource, MetricsBackend};
use crate::error::BackendError;
use crate::models::{LabelSet, QueryValue, SamplePair, SampleStream, TimeWindow};

#[derive(Default)]
pub struct StubBackend {
    ranges: Mutex<HashMap<String, Result<QueryValue, BackendError>>>,
    series: Mutex<Option<Result<Vec<LabelSet>, BackendError>>>,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<String>>,
    series_calls: Mutex<Vec<(Vec<String>, DateTime<Utc>, DateTime<Utc>)>>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_range(self, query: &str, value: Result<QueryValue, BackendError>) -> Self {
        self.ranges.lock().insert(query.to_string(), value);
        self
    }

    pub fn with_series(self, value: Result<Vec<LabelSet>, BackendError>) -> Self {
        *self.series.lock() = Some(value);
        self
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock() = Some(delay);
        self
    }

    /// Queries passed to `query_range`, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn series_calls(&self) -> Vec<(Vec<String>, DateTime<Utc>, DateTime<Utc>)> {
        self.series_calls.lock().clone()
    }
}

#[async_trait]
impl MetricsBackend for StubBackend {
    async fn query_range(
        &self,
        query: &str,
        _window: &TimeWindow,
    ) -> Result<QueryValue, BackendError> {
        self.calls.lock().push(query.to_string());
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.ranges
            .lock()
            .get(query)
            .cloned()
            .unwrap_or_else(|| Err(BackendError::Request(format!("no stub for {query}"))))
    }

    async fn series(
        &self,
        matchers: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<LabelSet>, BackendError> {
        self.series_calls.lock().push((matchers.to_vec(), start, end));
        self.series
            .lock()
            .clone()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Hands out the same [`StubBackend`] for every request and counts connects.
pub struct StubFactory {
    backend: Arc<StubBackend>,
    fail: Option<BackendError>,
    connects: AtomicUsize,
}

impl StubFactory {
    pub fn new(backend: Arc<StubBackend>) -> Self {
        Self {
            backend,
            fail: None,
            connects: AtomicUsize::new(0),
        }
    }

    pub fn failing(err: BackendError) -> Self {
        Self {
            backend: Arc::new(StubBackend::new()),
            fail: Some(err),
            connects: AtomicUsize::new(0),
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl BackendFactory for StubFactory {
    fn connect(&self, _source: &DataSource) -> Result<Arc<dyn MetricsBackend>, BackendError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        match &self.fail {
            Some(err) => Err(err.clone()),
            None => Ok(self.backend.clone()),
        }
    }
}

/// A one-series matrix whose series carries `labels` and the given samples.
pub fn matrix(labels: &[(&str, &str)], samples: &[(f64, &str)]) -> QueryValue {
    QueryValue::Matrix(vec![SampleStream {
        metric: labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        values: samples
            .iter()
            .map(|(ts, v)| SamplePair(*ts, v.to_string()))
            .collect(),
    }])
}
