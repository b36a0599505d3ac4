//! Submission, job polling and record listing handlers.

use super::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT, QueueAllResponse, RecordInfo, RecordsPage, RecordsQuery};
use crate::api::AppState;
use crate::db::RecordStatus;
use crate::error::Error;
use crate::types::{DownloadRequest, SubmissionStatus};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event as SseEvent, KeepAlive, Sse},
    },
};
use std::convert::Infallible;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;

/// POST /download - Queue one track
#[utoipa::path(
    post,
    path = "/api/v1/download",
    tag = "downloads",
    request_body = crate::types::DownloadRequest,
    responses(
        (status = 202, description = "Job queued", body = crate::types::QueueOutcome),
        (status = 200, description = "Same query already queued or downloading", body = crate::types::QueueOutcome),
        (status = 400, description = "Empty query", body = crate::error::ApiError),
        (status = 503, description = "Queue full or shutting down", body = crate::error::ApiError)
    )
)]
pub async fn queue_download(
    State(state): State<AppState>,
    Json(request): Json<DownloadRequest>,
) -> Response {
    match state.downloader.queue_download(request) {
        Ok(outcome) => {
            let status = match outcome.status {
                SubmissionStatus::Queued => StatusCode::ACCEPTED,
                SubmissionStatus::Skipped => StatusCode::OK,
            };
            (status, Json(outcome)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// POST /download/all - Queue every pending record
#[utoipa::path(
    post,
    path = "/api/v1/download/all",
    tag = "downloads",
    responses(
        (status = 202, description = "Pending records queued", body = QueueAllResponse),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn queue_all_pending(State(state): State<AppState>) -> Response {
    match state.downloader.queue_pending().await {
        Ok(queued) => (StatusCode::ACCEPTED, Json(QueueAllResponse { queued })).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to queue pending records");
            e.into_response()
        }
    }
}

/// GET /jobs - Snapshot of queued and in-flight jobs
#[utoipa::path(
    get,
    path = "/api/v1/jobs",
    tag = "downloads",
    responses(
        (status = 200, description = "Active jobs in submission order", body = Vec<crate::types::JobView>)
    )
)]
pub async fn list_jobs(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.downloader.get_active_downloads())
}

/// GET /jobs/stream - Active jobs pushed every `snapshot_interval_ms`
#[utoipa::path(
    get,
    path = "/api/v1/jobs/stream",
    tag = "downloads",
    responses(
        (status = 200, description = "Server-sent `jobs` events carrying the active job list", content_type = "text/event-stream")
    )
)]
pub async fn job_stream(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let mut interval = tokio::time::interval(state.config.server.api.snapshot_interval());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let downloader = state.downloader.clone();

    let stream = IntervalStream::new(interval).filter_map(move |_| {
        let snapshot = downloader.get_active_downloads();
        match SseEvent::default().event("jobs").json_data(&snapshot) {
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize job snapshot");
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// GET /downloads - Persisted records, newest first
#[utoipa::path(
    get,
    path = "/api/v1/downloads",
    tag = "downloads",
    params(RecordsQuery),
    responses(
        (status = 200, description = "One page of records", body = RecordsPage),
        (status = 400, description = "Invalid page, limit or status", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError)
    )
)]
pub async fn list_records(
    State(state): State<AppState>,
    Query(query): Query<RecordsQuery>,
) -> Response {
    let page = query.page.unwrap_or(1);
    if page == 0 {
        return Error::InvalidRequest("page starts at 1".to_string()).into_response();
    }
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    if limit == 0 || limit > MAX_PAGE_LIMIT {
        return Error::InvalidRequest(format!("limit must be between 1 and {MAX_PAGE_LIMIT}"))
            .into_response();
    }
    let status = match query.status.as_deref().map(str::parse::<RecordStatus>) {
        None => None,
        Some(Ok(status)) => Some(status),
        Some(Err(reason)) => return Error::InvalidRequest(reason).into_response(),
    };

    let search = query.search.as_deref();

    let store = state.downloader.store();
    let records = match store.list_records(page, limit, status, search).await {
        Ok(records) => records,
        Err(e) => {
            tracing::error!(error = %e, "Failed to list records");
            return e.into_response();
        }
    };
    let total = match store.count_records(status, search).await {
        Ok(total) => total,
        Err(e) => {
            tracing::error!(error = %e, "Failed to count records");
            return e.into_response();
        }
    };

    let page = RecordsPage {
        items: records.into_iter().map(RecordInfo::from).collect(),
        page,
        limit,
        total,
        total_pages: total.div_ceil(u64::from(limit)),
    };
    (StatusCode::OK, Json(page)).into_response()
}
