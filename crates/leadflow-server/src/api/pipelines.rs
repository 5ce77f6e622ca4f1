//! Pipeline handlers.
//!
//! - `GET /api/v1/pipelines`: list, newest first, filtered
//! - `POST /api/v1/pipelines`: create from a wizard draft
//! - `GET /api/v1/pipelines/stats`: campaign and lead totals
//! - `GET /api/v1/pipelines/:id`: one pipeline
//! - `DELETE /api/v1/pipelines/:id`: delete with its contacts
//! - `POST /api/v1/pipelines/:id/launch`: launch with rollback; 409 once launched
//! - `GET /api/v1/pipelines/:id/contacts`: extracted contacts
//! - `GET /api/v1/pipelines/:id/icebreakers`: icebreaker counts

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use leadflow_core::{
    CampaignKind, CampaignStats, Contact, IcebreakerStats, LeadProgress, LeadTotals, Pipeline,
    PipelineFilter, WizardDraft, WizardError,
};
use leadflow_sync::{LaunchError, SyncError};
use leadflow_webhook::WebhookError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

// ---------------------------------------------------------------------------
// Request and response bodies
// ---------------------------------------------------------------------------

/// Wizard fields as submitted. `criteria` may be the raw JSON text or the
/// already-parsed object.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct CreatePipelineRequest {
    pub name: String,
    pub instruction: String,
    pub campaign_kind: CampaignKind,
    pub external_campaign_id: String,
    pub criteria: Value,
}

impl From<CreatePipelineRequest> for WizardDraft {
    fn from(body: CreatePipelineRequest) -> Self {
        let criteria = match body.criteria {
            Value::Null => String::new(),
            Value::String(text) => text,
            other => other.to_string(),
        };
        Self {
            name: body.name,
            instruction: body.instruction,
            campaign_kind: body.campaign_kind,
            external_campaign_id: body.external_campaign_id,
            criteria,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct PipelineItem {
    #[serde(flatten)]
    pub pipeline: Pipeline,
    pub lead_progress: Option<LeadProgressItem>,
}

#[derive(Debug, Serialize)]
pub(super) struct LeadProgressItem {
    pub target: i32,
    pub processed: i32,
    pub remaining: i32,
    pub percent: u8,
}

impl From<LeadProgress> for LeadProgressItem {
    fn from(progress: LeadProgress) -> Self {
        Self {
            target: progress.target,
            processed: progress.processed,
            remaining: progress.remaining(),
            percent: progress.percent(),
        }
    }
}

impl From<Pipeline> for PipelineItem {
    fn from(pipeline: Pipeline) -> Self {
        let lead_progress = pipeline.lead_progress().map(LeadProgressItem::from);
        Self {
            pipeline,
            lead_progress,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct PipelineStatsData {
    pub campaigns: CampaignStats,
    pub leads: LeadTotals,
}

#[derive(Debug, Serialize)]
pub(super) struct IcebreakerStatsData {
    #[serde(flatten)]
    pub stats: IcebreakerStats,
    pub generated: usize,
    pub generated_percent: u8,
}

#[derive(Debug, Serialize)]
pub(super) struct LaunchData {
    pub launched: bool,
    /// Response text of the workflow engine.
    pub response: String,
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn wizard_error(request_id: &str, error: &WizardError) -> ApiError {
    let api_error = ApiError::new(request_id, "validation_error", error.to_string());
    match error.field_errors() {
        Some(fields) => api_error.with_details(serde_json::json!(fields)),
        None => api_error,
    }
}

fn sync_error(request_id: String, error: &SyncError) -> ApiError {
    match error {
        SyncError::PipelineNotFound(id) => {
            ApiError::new(request_id, "not_found", format!("pipeline {id} not found"))
        }
        SyncError::Store(e) => map_db_error(request_id, e),
    }
}

fn launch_error(request_id: String, error: &LaunchError) -> ApiError {
    match error {
        LaunchError::NotFound(id) => {
            ApiError::new(request_id, "not_found", format!("pipeline {id} not found"))
        }
        LaunchError::NotLaunchable { .. } => {
            ApiError::new(request_id, "conflict", error.to_string())
        }
        LaunchError::Store(e) => map_db_error(request_id, e),
        LaunchError::Webhook(WebhookError::NotConfigured) => ApiError::new(
            request_id,
            "configuration_error",
            "workflow webhook is not configured",
        ),
        LaunchError::Webhook(e) => {
            tracing::error!(error = %e, "launch webhook failed");
            ApiError::new(request_id, "upstream_error", "workflow engine call failed")
        }
    }
}

/// Reloads the sync engine after a write; failures only cost freshness.
async fn refresh_engine(state: &AppState) {
    if let Err(error) = state.engine.reload().await {
        tracing::warn!(error = %error, "sync engine reload failed");
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub(super) async fn list_pipelines(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(filter): Query<PipelineFilter>,
) -> Result<Json<ApiResponse<Vec<PipelineItem>>>, ApiError> {
    let pipelines = leadflow_db::list_pipelines(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = pipelines
        .into_iter()
        .filter(|p| filter.matches(p))
        .map(PipelineItem::from)
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn create_pipeline(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreatePipelineRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PipelineItem>>), ApiError> {
    let new = WizardDraft::from(body)
        .into_submission()
        .map_err(|e| wizard_error(&req_id.0, &e))?;

    let pipeline = leadflow_db::create_pipeline(&state.pool, &new)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    tracing::info!(pipeline_id = %pipeline.id, name = %pipeline.name, "pipeline created");
    refresh_engine(&state).await;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: PipelineItem::from(pipeline),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

pub(super) async fn pipeline_stats(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<PipelineStatsData>>, ApiError> {
    let pipelines = leadflow_db::list_pipelines(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: PipelineStatsData {
            campaigns: CampaignStats::from_pipelines(&pipelines),
            leads: LeadTotals::from_pipelines(&pipelines),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_pipeline(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<PipelineItem>>, ApiError> {
    let pipeline = leadflow_db::get_pipeline(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| {
            ApiError::new(&req_id.0, "not_found", format!("pipeline {id} not found"))
        })?;

    Ok(Json(ApiResponse {
        data: PipelineItem::from(pipeline),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn delete_pipeline(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    leadflow_db::delete_pipeline(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    tracing::info!(pipeline_id = %id, "pipeline deleted");

    state.watchers.forget(id);
    refresh_engine(&state).await;

    Ok(Json(ApiResponse {
        data: serde_json::json!({ "deleted": true }),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn launch_pipeline(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<LaunchData>>, ApiError> {
    let response = leadflow_sync::launch(state.engine.as_ref(), &state.webhook, id)
        .await
        .map_err(|e| launch_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: LaunchData {
            launched: true,
            response,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn list_contacts(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Contact>>>, ApiError> {
    let contacts = leadflow_db::list_contacts(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: contacts,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn icebreaker_stats(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<IcebreakerStatsData>>, ApiError> {
    let stats = state
        .watchers
        .stats(&state.pool, id)
        .await
        .map_err(|e| sync_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: IcebreakerStatsData {
            generated: stats.generated(),
            generated_percent: stats.percent(stats.generated()),
            stats,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}


#[cfg(test)]
mod live_tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use tower::ServiceExt;

    use super::super::build_app;
    use super::super::test_support::{body_json, get, json_request, offline_state};

    fn app_with_pool(pool: sqlx::PgPool) -> axum::Router {
        let mut state = offline_state(None, None);
        state.engine = std::sync::Arc::new(leadflow_sync::SyncEngine::new(
            pool.clone(),
            std::time::Duration::from_secs(3),
        ));
        state.pool = pool;
        build_app(state, None)
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn created_pipeline_is_listed_and_counted(pool: sqlx::PgPool) {
        let body = json!({
            "name": "Marseille founders",
            "campaign_kind": "linkedin",
            "criteria": { "totalResults": 30 }
        });
        let response = app_with_pool(pool.clone())
            .oneshot(json_request("POST", "/api/v1/pipelines", &body))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        assert_eq!(created["data"]["status"], "pending");
        assert_eq!(created["data"]["target_lead_count"], 30);

        let response = app_with_pool(pool.clone())
            .oneshot(get("/api/v1/pipelines?search=MARSEILLE"))
            .await
            .expect("response");
        let listed = body_json(response).await;
        assert_eq!(listed["data"].as_array().map(Vec::len), Some(1));

        let response = app_with_pool(pool)
            .oneshot(get("/api/v1/pipelines/stats"))
            .await
            .expect("response");
        let stats = body_json(response).await;
        assert_eq!(stats["data"]["campaigns"]["pending"], 1);
        assert_eq!(stats["data"]["leads"]["target"], 30);
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn unknown_pipeline_is_404(pool: sqlx::PgPool) {
        let response = app_with_pool(pool)
            .oneshot(get("/api/v1/pipelines/5b0c7a0e-3c1d-4e55-9f8a-2f5e1d9c4b21"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn completed_pipeline_launch_is_409_and_unchanged(pool: sqlx::PgPool) {
        let body = json!({
            "name": "Lyon studios",
            "campaign_kind": "linkedin",
            "criteria": { "totalResults": 10 }
        });
        let response = app_with_pool(pool.clone())
            .oneshot(json_request("POST", "/api/v1/pipelines", &body))
            .await
            .expect("response");
        let created = body_json(response).await;
        let id: uuid::Uuid = created["data"]["id"]
            .as_str()
            .and_then(|id| id.parse().ok())
            .expect("created id");
        leadflow_db::apply_lifecycle(&pool, id, leadflow_core::LifecycleUpdate::COMPLETED)
            .await
            .expect("complete pipeline");

        let uri = format!("/api/v1/pipelines/{id}/launch");
        let response = app_with_pool(pool.clone())
            .oneshot(json_request("POST", &uri, &json!({})))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let stored = leadflow_db::get_pipeline(&pool, id)
            .await
            .expect("query")
            .expect("pipeline");
        assert_eq!(stored.status, leadflow_core::PipelineStatus::Completed);
    }
}
