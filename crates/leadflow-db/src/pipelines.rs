//! Database operations for the `pipelines` table.

use chrono::{DateTime, Utc};
use leadflow_core::{LifecycleUpdate, NewPipeline, Pipeline, PipelineProgress, PipelineStage};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const PIPELINE_COLUMNS: &str = "id, name, instruction, campaign_kind, external_campaign_id, \
     criteria, status, stage, action, target_lead_count, leads_processed, created_at, updated_at";

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `pipelines` table, enumerations still as stored text.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PipelineRow {
    pub id: Uuid,
    pub name: String,
    pub instruction: String,
    pub campaign_kind: String,
    pub external_campaign_id: String,
    pub criteria: String,
    pub status: String,
    pub stage: String,
    pub action: String,
    pub target_lead_count: Option<i32>,
    pub leads_processed: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PipelineRow> for Pipeline {
    type Error = DbError;

    fn try_from(row: PipelineRow) -> Result<Self, Self::Error> {
        Ok(Pipeline {
            id: row.id,
            name: row.name,
            instruction: row.instruction,
            campaign_kind: row.campaign_kind.parse()?,
            external_campaign_id: row.external_campaign_id,
            criteria: row.criteria,
            status: row.status.parse()?,
            stage: row.stage.parse()?,
            action: row.action.parse()?,
            target_lead_count: row.target_lead_count,
            leads_processed: row.leads_processed,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ProgressRow {
    status: String,
    stage: String,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns every pipeline, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::InvalidRow`]
/// if a stored enumeration value is unknown.
pub async fn list_pipelines(pool: &PgPool) -> Result<Vec<Pipeline>, DbError> {
    let rows = sqlx::query_as::<_, PipelineRow>(&format!(
        "SELECT {PIPELINE_COLUMNS} FROM pipelines ORDER BY created_at DESC"
    ))
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Pipeline::try_from).collect()
}

/// Returns a single pipeline by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::InvalidRow`]
/// if a stored enumeration value is unknown.
pub async fn get_pipeline(pool: &PgPool, id: Uuid) -> Result<Option<Pipeline>, DbError> {
    let row = sqlx::query_as::<_, PipelineRow>(&format!(
        "SELECT {PIPELINE_COLUMNS} FROM pipelines WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(Pipeline::try_from).transpose()
}

/// Status and stage only; the detail poller's lightweight check.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::InvalidRow`]
/// if a stored enumeration value is unknown.
pub async fn get_pipeline_progress(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<PipelineProgress>, DbError> {
    let row = sqlx::query_as::<_, ProgressRow>("SELECT status, stage FROM pipelines WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(|r| -> Result<PipelineProgress, DbError> {
        Ok(PipelineProgress {
            status: r.status.parse()?,
            stage: r.stage.parse()?,
        })
    })
    .transpose()
}

/// Inserts a pipeline in its creation state and returns the stored row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_pipeline(pool: &PgPool, new: &NewPipeline) -> Result<Pipeline, DbError> {
    let row = sqlx::query_as::<_, PipelineRow>(&format!(
        "INSERT INTO pipelines \
             (name, instruction, campaign_kind, external_campaign_id, criteria, \
              status, stage, action, target_lead_count) \
         VALUES ($1, $2, $3, $4, $5, 'pending', 'criteria_saved', 'launch_prompt', $6) \
         RETURNING {PIPELINE_COLUMNS}"
    ))
    .bind(&new.name)
    .bind(&new.instruction)
    .bind(new.campaign_kind.as_str())
    .bind(&new.external_campaign_id)
    .bind(new.criteria_text())
    .bind(new.target_lead_count)
    .fetch_one(pool)
    .await?;

    Pipeline::try_from(row)
}

/// Writes status, action, and (when given) stage in one statement.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no pipeline has this id, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn apply_lifecycle(
    pool: &PgPool,
    id: Uuid,
    update: LifecycleUpdate,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE pipelines \
         SET status = $2, stage = COALESCE($3, stage), action = $4 \
         WHERE id = $1",
    )
    .bind(id)
    .bind(update.status.as_str())
    .bind(update.stage.map(PipelineStage::as_str))
    .bind(update.action.as_str())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Deletes one pipeline; its contacts go with it through the foreign key.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no pipeline has this id, or
/// [`DbError::Sqlx`] if the delete fails.
pub async fn delete_pipeline(pool: &PgPool, id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM pipelines WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Deletes every pipeline and returns how many were removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_all_pipelines(pool: &PgPool) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM pipelines").execute(pool).await?;
    Ok(result.rows_affected())
}
