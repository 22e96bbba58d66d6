use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::debug;

use super::{BackendFactory, DataSource, MetricsBackend};
use crate::error::BackendError;
use crate::models::{LabelSet, QueryValue, TimeWindow};

/// Client for the Prometheus HTTP API.
#[derive(Debug, Clone)]
pub struct PrometheusClient {
    base_url: String,
    token: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

/// The JSON envelope every `/api/v1` endpoint answers with.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse<T> {
    status: String,
    data: Option<T>,
    error_type: Option<String>,
    error: Option<String>,
}

impl PrometheusClient {
    pub fn new(source: &DataSource, timeout: Duration) -> Result<Self, BackendError> {
        let url = reqwest::Url::parse(&source.url)
            .map_err(|e| BackendError::Client(format!("invalid address {:?}: {}", source.url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(BackendError::Client(format!(
                "unsupported scheme {:?} in {:?}",
                url.scheme(),
                source.url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Client(e.to_string()))?;

        Ok(Self {
            base_url: url.as_str().trim_end_matches('/').to_string(),
            token: source.token.clone(),
            timeout,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get(&self, endpoint: &str) -> RequestBuilder {
        let request = self
            .client
            .get(format!("{}/api/v1/{}", self.base_url, endpoint));
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        let response = request.send().await.map_err(|e| self.request_error(e))?;
        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.request_error(e))?;
        decode_body(status, &body)
    }

    fn request_error(&self, err: reqwest::Error) -> BackendError {
        if err.is_timeout() {
            BackendError::Timeout(self.timeout)
        } else {
            BackendError::from(err)
        }
    }
}

/// Decodes an API envelope. Prometheus reports query errors with non-2xx
/// statuses and a JSON body, so the body is decoded before the status is
/// looked at.
fn decode_body<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<T, BackendError> {
    let response: ApiResponse<T> = match serde_json::from_slice(body) {
        Ok(response) => response,
        Err(err) if status.is_success() => return Err(BackendError::Decode(err.to_string())),
        Err(_) => {
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(body).into_owned(),
            })
        }
    };

    if response.status != "success" {
        return Err(BackendError::Api {
            error_type: response.error_type.unwrap_or_default(),
            message: response.error.unwrap_or_default(),
        });
    }

    response
        .data
        .ok_or_else(|| BackendError::Decode("response carries no data".to_string()))
}

fn format_time(t: DateTime<Utc>) -> String {
    let seconds = t.timestamp() as f64 + f64::from(t.timestamp_subsec_nanos()) / 1e9;
    seconds.to_string()
}

fn format_step(step: chrono::Duration) -> String {
    let seconds = match step.num_nanoseconds() {
        Some(nanos) => nanos as f64 / 1e9,
        None => step.num_milliseconds() as f64 / 1e3,
    };
    seconds.to_string()
}

#[async_trait]
impl MetricsBackend for PrometheusClient {
    async fn query_range(
        &self,
        query: &str,
        window: &TimeWindow,
    ) -> Result<QueryValue, BackendError> {
        debug!("Prometheus query_range {} on {}", query, self.base_url);
        let request = self.get("query_range").query(&[
            ("query", query.to_string()),
            ("start", format_time(window.start())),
            ("end", format_time(window.end())),
            ("step", format_step(window.step())),
        ]);
        self.send(request).await
    }

    async fn series(
        &self,
        matchers: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<LabelSet>, BackendError> {
        debug!("Prometheus series {:?} on {}", matchers, self.base_url);
        let mut params: Vec<(&str, String)> = matchers
            .iter()
            .map(|matcher| ("match[]", matcher.clone()))
            .collect();
        params.push(("start", format_time(start)));
        params.push(("end", format_time(end)));

        let request = self.get("series").query(&params);
        self.send(request).await
    }
}

/// Builds a fresh [`PrometheusClient`] for every request.
#[derive(Debug, Clone)]
pub struct HttpBackendFactory {
    timeout: Duration,
}

impl HttpBackendFactory {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl BackendFactory for HttpBackendFactory {
    fn connect(&self, source: &DataSource) -> Result<Arc<dyn MetricsBackend>, BackendError> {
        Ok(Arc::new(PrometheusClient::new(source, self.timeout)?))
    }
}
