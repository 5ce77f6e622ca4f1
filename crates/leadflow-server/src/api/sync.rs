use axum::{extract::State, Extension, Json};
use leadflow_sync::SyncStatus;
use serde::Serialize;

use crate::middleware::RequestId;

use super::{ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct SyncStatusData {
    #[serde(flatten)]
    pub engine: SyncStatus,
    pub interval_ms: u64,
    /// Pipelines with a running detail poller.
    pub watched: usize,
}

/// GET /api/v1/sync
pub(super) async fn sync_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<SyncStatusData>> {
    Json(ApiResponse {
        data: SyncStatusData {
            engine: state.engine.status(),
            interval_ms: u64::try_from(state.engine.interval().as_millis()).unwrap_or(u64::MAX),
            watched: state.watchers.watched(),
        },
        meta: ResponseMeta::new(req_id.0),
    })
}
