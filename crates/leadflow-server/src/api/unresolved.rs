use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use leadflow_core::{ReplyChannel, UnresolvedLead};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

/// A reply awaiting review, with the quoted thread split off.
#[derive(Debug, Serialize)]
pub(super) struct UnresolvedLeadItem {
    pub id: i64,
    pub full_name: Option<String>,
    pub company: Option<String>,
    pub channel: ReplyChannel,
    pub reply_source: Option<String>,
    pub reply: String,
    pub thread_quote: Option<String>,
    pub profile_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<UnresolvedLead> for UnresolvedLeadItem {
    fn from(lead: UnresolvedLead) -> Self {
        let channel = lead.channel();
        let (reply, thread_quote) = lead.reply_parts();
        let (reply, thread_quote) = (reply.to_string(), thread_quote.map(str::to_string));
        Self {
            id: lead.id,
            full_name: lead.full_name,
            company: lead.company,
            channel,
            reply_source: lead.reply_source,
            reply,
            thread_quote,
            profile_url: lead.profile_url,
            created_at: lead.created_at,
        }
    }
}

/// GET /api/v1/unresolved-leads
pub(super) async fn list_unresolved_leads(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<UnresolvedLeadItem>>>, ApiError> {
    let leads = leadflow_db::list_unresolved_leads(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: leads.into_iter().map(UnresolvedLeadItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// DELETE /api/v1/unresolved-leads/:id
pub(super) async fn delete_unresolved_lead(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    leadflow_db::delete_unresolved_lead(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    tracing::info!(lead_id = id, "unresolved lead resolved");

    Ok(Json(ApiResponse {
        data: serde_json::json!({ "deleted": true }),
        meta: ResponseMeta::new(req_id.0),
    }))
}
