use std::collections::BTreeMap;
use std::fmt;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PodMonitorError, ValidationError};

/// Label name carrying the metric name of a series.
pub const METRIC_NAME_LABEL: &str = "__name__";

pub type LabelSet = BTreeMap<String, String>;

/// The workload a request is about, taken from the request path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadIdentity {
    pub cluster: String,
    pub namespace: String,
    pub pod: String,
}

impl fmt::Display for WorkloadIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.cluster, self.namespace, self.pod)
    }
}

/// Raw query-string parameters of a range request. Missing values are empty
/// strings so that they fail parsing with the usual messages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RangeParams {
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
    #[serde(default)]
    pub step: String,
}

impl RangeParams {
    /// Builds the parameters from raw query pairs. A repeated key keeps its
    /// first value; unknown keys are ignored.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let (mut start, mut end, mut step) = (None, None, None);
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "start" => &mut start,
                "end" => &mut end,
                "step" => &mut step,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        Self {
            start: start.unwrap_or_default(),
            end: end.unwrap_or_default(),
            step: step.unwrap_or_default(),
        }
    }
}

/// A validated range-query window: `end >= start` and `step > 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    step: Duration,
}

impl TimeWindow {
    pub fn new(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step: Duration,
    ) -> std::result::Result<Self, ValidationError> {
        if end < start {
            return Err(ValidationError::EndBeforeStart);
        }
        if step <= Duration::zero() {
            return Err(ValidationError::NonPositiveStep);
        }
        Ok(Self { start, end, step })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn step(&self) -> Duration {
        self.step
    }
}

/// `[timestamp, "value"]` exactly as the Prometheus HTTP API encodes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplePair(pub f64, pub String);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub metric: LabelSet,
    pub value: SamplePair,
}

/// One series of a matrix result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleStream {
    pub metric: LabelSet,
    #[serde(default)]
    pub values: Vec<SamplePair>,
}

/// Series in the order the queries producing them were executed.
pub type SeriesSet = Vec<SampleStream>;

/// Result of a query, discriminated by the API's `resultType`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "resultType", content = "result", rename_all = "lowercase")]
pub enum QueryValue {
    Matrix(Vec<SampleStream>),
    Vector(Vec<Sample>),
    Scalar(SamplePair),
    String(SamplePair),
}

impl QueryValue {
    pub fn kind(&self) -> &'static str {
        match self {
            QueryValue::Matrix(_) => "matrix",
            QueryValue::Vector(_) => "vector",
            QueryValue::Scalar(_) => "scalar",
            QueryValue::String(_) => "string",
        }
    }
}

/// Payload of a successful monitor response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryData {
    #[serde(rename = "resultType")]
    pub result_type: String,
    pub result: SeriesSet,
}

impl QueryData {
    pub fn matrix(result: SeriesSet) -> Self {
        Self {
            result_type: "matrix".to_string(),
            result,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Uniform response body: `data` on success, `error` on failure, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope<T> {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ResultEnvelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: Status::Success,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            data: None,
            error: Some(message.into()),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.status {
            Status::Success => StatusCode::OK,
            Status::Error => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl<T: Serialize> ResultEnvelope<T> {
    /// Serializes the envelope. An envelope that cannot be encoded becomes a
    /// plain-text 500.
    pub fn into_reply(self) -> ApiReply {
        match serde_json::to_vec(&self) {
            Ok(body) => ApiReply::json(self.status_code(), body),
            Err(err) => {
                let err = PodMonitorError::from(err);
                tracing::error!("Serialize response envelope failed: {}", err);
                ApiReply::text(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        }
    }
}

impl<T: Serialize> IntoResponse for ResultEnvelope<T> {
    fn into_response(self) -> Response {
        self.into_reply().into_response()
    }
}

/// Framework-independent HTTP reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiReply {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: Bytes,
}

impl ApiReply {
    pub fn json(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.into(),
        }
    }

    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            body: Bytes::from(body.into()),
        }
    }
}

impl IntoResponse for ApiReply {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, self.content_type)],
            self.body,
        )
            .into_response()
    }
}
