use std::time::Duration;

use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::models::ResultEnvelope;

/// Malformed `start`, `end` or `step` values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("cannot parse {0:?} to a valid timestamp")]
    Timestamp(String),

    #[error("cannot parse {0:?} to a valid duration")]
    Duration(String),

    #[error("cannot parse {0:?} to a valid duration. It overflows int64")]
    DurationOverflow(String),
}

/// A well-formed but unusable query window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("End before start")]
    EndBeforeStart,

    #[error("Zero or negative query resolution step width are not accepted")]
    NonPositiveStep,
}

#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("invalid backend configuration: {0}")]
    Client(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("{error_type}: {message}")]
    Api { error_type: String, message: String },

    #[error("cannot decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else {
            BackendError::Request(err.to_string())
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum QueryError {
    #[error("Query Prometheus failed: {0}")]
    Backend(#[from] BackendError),

    #[error("The type of QueryRange value is unexpected: {0}")]
    UnexpectedValueType(&'static str),

    #[error("The length of QueryRange value is 0")]
    EmptyResult,
}

#[derive(Debug, Error)]
pub enum PodMonitorError {
    #[error("Get Prometheus client failed: {0}")]
    Client(BackendError),

    #[error("Parse start time failed: {0}")]
    StartTime(ParseError),

    #[error("Parse end time failed: {0}")]
    EndTime(ParseError),

    #[error("Parse step failed: {0}")]
    Step(ParseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for PodMonitorError {
    fn from(err: serde_json::Error) -> Self {
        PodMonitorError::Serialization(err.to_string())
    }
}

impl From<figment::Error> for PodMonitorError {
    fn from(err: figment::Error) -> Self {
        PodMonitorError::Config(err.to_string())
    }
}

impl IntoResponse for PodMonitorError {
    fn into_response(self) -> Response {
        // Every failure maps to 500 for now; per-kind codes can come later.
        ResultEnvelope::<()>::error(self.to_string()).into_response()
    }
}

pub type Result<T> = std::result::Result<T, PodMonitorError>;
