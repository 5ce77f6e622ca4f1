//! Database operations for `unresolved_response_leads`.

use chrono::{DateTime, Utc};
use leadflow_core::{ChangeEvent, UnresolvedLead};
use sqlx::PgPool;

use crate::changes::{ChangeOp, ChangeTable, RowChange};
use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
struct UnresolvedLeadRow {
    id: i64,
    full_name: Option<String>,
    company: Option<String>,
    reply_source: Option<String>,
    reply_html: Option<String>,
    profile_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<UnresolvedLeadRow> for UnresolvedLead {
    fn from(row: UnresolvedLeadRow) -> Self {
        UnresolvedLead {
            id: row.id,
            full_name: row.full_name,
            company: row.company,
            reply_source: row.reply_source,
            reply_html: row.reply_html,
            profile_url: row.profile_url,
            created_at: row.created_at,
        }
    }
}

/// Every lead awaiting review, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_unresolved_leads(pool: &PgPool) -> Result<Vec<UnresolvedLead>, DbError> {
    let rows = sqlx::query_as::<_, UnresolvedLeadRow>(
        "SELECT id, full_name, company, reply_source, reply_html, profile_url, created_at \
         FROM unresolved_response_leads \
         ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(UnresolvedLead::from).collect())
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_unresolved_lead(pool: &PgPool, id: i64) -> Result<Option<UnresolvedLead>, DbError> {
    let row = sqlx::query_as::<_, UnresolvedLeadRow>(
        "SELECT id, full_name, company, reply_source, reply_html, profile_url, created_at \
         FROM unresolved_response_leads \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(UnresolvedLead::from))
}

/// Removes a reviewed lead. Deletion is terminal.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no lead has this id, or
/// [`DbError::Sqlx`] if the delete fails.
pub async fn delete_unresolved_lead(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM unresolved_response_leads WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Turns a raw notification into an event for the unresolved-lead list.
///
/// # Errors
///
/// Returns [`DbError::InvalidNotification`] if the id is not an integer, or
/// [`DbError::Sqlx`] if re-reading the row fails.
pub async fn resolve_unresolved_lead_change(
    pool: &PgPool,
    change: &RowChange,
) -> Result<Option<ChangeEvent<UnresolvedLead>>, DbError> {
    if change.table != ChangeTable::UnresolvedResponseLeads {
        return Ok(None);
    }
    let id = change.bigint_id()?;

    if change.op == ChangeOp::Delete {
        return Ok(Some(ChangeEvent::Delete(id)));
    }

    Ok(get_unresolved_lead(pool, id).await?.map(|lead| match change.op {
        ChangeOp::Insert => ChangeEvent::Insert(lead),
        ChangeOp::Update | ChangeOp::Delete => ChangeEvent::Update(lead),
    }))
}
