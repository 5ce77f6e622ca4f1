//! Read-only access to `pipeline_contacts`.
//!
//! Contacts are written by the external enrichment process; this crate only
//! lists and counts them.

use chrono::{DateTime, Utc};
use leadflow_core::{ChangeEvent, Contact, IcebreakerFlags};
use sqlx::PgPool;
use uuid::Uuid;

use crate::changes::{ChangeOp, ChangeTable, RowChange};
use crate::DbError;

const CONTACT_COLUMNS: &str = "id, pipeline_id, first_name, last_name, full_name, email, \
     email_status, phone, profile_url, position, seniority, functional, city, state, country, \
     org_name, org_industry, org_size, org_website, org_profile_url, org_description, org_city, \
     org_country, lead_info, icebreaker, is_network_post, is_deep_search, is_generic, created_at";

#[derive(Debug, Clone, sqlx::FromRow)]
struct ContactRow {
    id: Uuid,
    pipeline_id: Uuid,
    first_name: Option<String>,
    last_name: Option<String>,
    full_name: Option<String>,
    email: Option<String>,
    email_status: Option<String>,
    phone: Option<String>,
    profile_url: Option<String>,
    position: Option<String>,
    seniority: Option<String>,
    functional: Option<String>,
    city: Option<String>,
    state: Option<String>,
    country: Option<String>,
    org_name: Option<String>,
    org_industry: Option<String>,
    org_size: Option<String>,
    org_website: Option<String>,
    org_profile_url: Option<String>,
    org_description: Option<String>,
    org_city: Option<String>,
    org_country: Option<String>,
    lead_info: Option<String>,
    icebreaker: Option<String>,
    is_network_post: Option<bool>,
    is_deep_search: Option<bool>,
    is_generic: Option<bool>,
    created_at: DateTime<Utc>,
}

impl From<ContactRow> for Contact {
    fn from(row: ContactRow) -> Self {
        Contact {
            id: row.id,
            pipeline_id: row.pipeline_id,
            first_name: row.first_name,
            last_name: row.last_name,
            full_name: row.full_name,
            email: row.email,
            email_status: row.email_status,
            phone: row.phone,
            profile_url: row.profile_url,
            position: row.position,
            seniority: row.seniority,
            functional: row.functional,
            city: row.city,
            state: row.state,
            country: row.country,
            org_name: row.org_name,
            org_industry: row.org_industry,
            org_size: row.org_size,
            org_website: row.org_website,
            org_profile_url: row.org_profile_url,
            org_description: row.org_description,
            org_city: row.org_city,
            org_country: row.org_country,
            lead_info: row.lead_info,
            icebreaker: row.icebreaker,
            is_network_post: row.is_network_post,
            is_deep_search: row.is_deep_search,
            is_generic: row.is_generic,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct FlagsRow {
    is_network_post: Option<bool>,
    is_deep_search: Option<bool>,
    is_generic: Option<bool>,
}

/// Contacts of one pipeline, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_contacts(pool: &PgPool, pipeline_id: Uuid) -> Result<Vec<Contact>, DbError> {
    let rows = sqlx::query_as::<_, ContactRow>(&format!(
        "SELECT {CONTACT_COLUMNS} FROM pipeline_contacts \
         WHERE pipeline_id = $1 \
         ORDER BY created_at DESC"
    ))
    .bind(pipeline_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Contact::from).collect())
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_contact(pool: &PgPool, id: Uuid) -> Result<Option<Contact>, DbError> {
    let row = sqlx::query_as::<_, ContactRow>(&format!(
        "SELECT {CONTACT_COLUMNS} FROM pipeline_contacts WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Contact::from))
}

/// Only the three icebreaker flags of each contact in a pipeline.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_contact_flags(
    pool: &PgPool,
    pipeline_id: Uuid,
) -> Result<Vec<IcebreakerFlags>, DbError> {
    let rows = sqlx::query_as::<_, FlagsRow>(
        "SELECT is_network_post, is_deep_search, is_generic \
         FROM pipeline_contacts \
         WHERE pipeline_id = $1",
    )
    .bind(pipeline_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| IcebreakerFlags {
            is_network_post: r.is_network_post,
            is_deep_search: r.is_deep_search,
            is_generic: r.is_generic,
        })
        .collect())
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_contacts(pool: &PgPool, pipeline_id: Uuid) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM pipeline_contacts WHERE pipeline_id = $1",
    )
    .bind(pipeline_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

/// Turns a raw notification into an event for one pipeline's contact list.
///
/// Returns `None` for other tables, for contacts of other pipelines, and for
/// rows that vanished before they could be re-read. Deletes are passed
/// through unfiltered; folding ignores ids it does not hold.
///
/// # Errors
///
/// Returns [`DbError::InvalidNotification`] if the id is not a UUID, or
/// [`DbError::Sqlx`] if re-reading the row fails.
pub async fn resolve_contact_change(
    pool: &PgPool,
    change: &RowChange,
    pipeline_id: Uuid,
) -> Result<Option<ChangeEvent<Contact>>, DbError> {
    if change.table != ChangeTable::PipelineContacts {
        return Ok(None);
    }
    let id = change.uuid_id()?;

    if change.op == ChangeOp::Delete {
        return Ok(Some(ChangeEvent::Delete(id)));
    }

    let Some(contact) = get_contact(pool, id).await? else {
        return Ok(None);
    };
    if contact.pipeline_id != pipeline_id {
        return Ok(None);
    }

    Ok(Some(match change.op {
        ChangeOp::Insert => ChangeEvent::Insert(contact),
        ChangeOp::Update | ChangeOp::Delete => ChangeEvent::Update(contact),
    }))
}
