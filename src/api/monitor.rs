use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use tracing::{info, warn};

use super::AppState;
use crate::{
    error::ValidationError,
    metrics::{self, RequestTimer},
    models::{ApiReply, QueryData, RangeParams, ResultEnvelope, SeriesSet, TimeWindow, WorkloadIdentity},
    parse::{parse_duration, parse_time},
    query::{discover, RangeQueryOrchestrator, POD_MONITOR_QUERIES},
    PodMonitorError, Result,
};

/// Parses and validates `start`, `end` and `step`, in that order.
pub fn parse_window(params: &RangeParams) -> Result<TimeWindow> {
    let start = parse_time(&params.start).map_err(PodMonitorError::StartTime)?;
    let end = parse_time(&params.end).map_err(PodMonitorError::EndTime)?;
    if end < start {
        return Err(ValidationError::EndBeforeStart.into());
    }
    let step = parse_duration(&params.step).map_err(PodMonitorError::Step)?;

    Ok(TimeWindow::new(start, end, step)?)
}

/// Runs the pod monitor queries. The backend is only contacted once the
/// window is valid.
pub async fn query_pod(
    state: &AppState,
    identity: &WorkloadIdentity,
    params: &RangeParams,
) -> Result<SeriesSet> {
    info!(
        "cluster: {}, namespace: {}, pod: {}",
        identity.cluster, identity.namespace, identity.pod
    );

    let window = parse_window(params)?;
    let backend = state
        .factory
        .connect(&state.source)
        .map_err(PodMonitorError::Client)?;

    let data = RangeQueryOrchestrator::new(backend.as_ref(), state.query_timeout)
        .execute(&window, &POD_MONITOR_QUERIES)
        .await?;
    Ok(data)
}

pub async fn monitor_pod(
    state: &AppState,
    identity: &WorkloadIdentity,
    params: &RangeParams,
) -> ApiReply {
    match query_pod(state, identity, params).await {
        Ok(data) => ResultEnvelope::success(QueryData::matrix(data)).into_reply(),
        Err(err) => {
            warn!("Monitor {} failed: {}", identity, err);
            ResultEnvelope::<QueryData>::error(err.to_string()).into_reply()
        }
    }
}

pub async fn list_pod_metrics(state: &AppState, identity: &WorkloadIdentity) -> Result<Vec<String>> {
    info!(
        "cluster: {}, namespace: {}, pod: {}",
        identity.cluster, identity.namespace, identity.pod
    );

    let backend = state
        .factory
        .connect(&state.source)
        .map_err(PodMonitorError::Client)?;
    let names = discover(backend.as_ref(), identity, Utc::now(), state.query_timeout).await?;
    Ok(names)
}

/// Errors on this path are answered with a plain-text body rather than an
/// envelope.
pub async fn pod_metrics(state: &AppState, identity: &WorkloadIdentity) -> ApiReply {
    match list_pod_metrics(state, identity).await {
        Ok(names) => ResultEnvelope::success(names).into_reply(),
        Err(err) => {
            warn!("Listing metrics of {} failed: {}", identity, err);
            ApiReply::text(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

pub async fn monitor_handler(
    State(state): State<AppState>,
    Path(identity): Path<WorkloadIdentity>,
    query: std::result::Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> ApiReply {
    let _timer = RequestTimer::new("monitor");
    let reply = match query {
        Ok(Query(pairs)) => {
            let params = RangeParams::from_pairs(pairs);
            monitor_pod(&state, &identity, &params).await
        }
        Err(rejection) => {
            warn!("Monitor {} rejected query string: {}", identity, rejection);
            ResultEnvelope::<QueryData>::error(rejection.body_text()).into_reply()
        }
    };
    metrics::record_request("monitor", reply.status.as_u16());
    reply
}

pub async fn metrics_handler(
    State(state): State<AppState>,
    Path(identity): Path<WorkloadIdentity>,
) -> ApiReply {
    let _timer = RequestTimer::new("metrics");
    let reply = pod_metrics(&state, &identity).await;
    metrics::record_request("metrics", reply.status.as_u16());
    reply
}
