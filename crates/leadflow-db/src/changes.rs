//! Realtime row-change notifications over `LISTEN/NOTIFY`.
//!
//! The `notify_row_change` trigger publishes `{table, op, id}` on
//! [`CHANGES_CHANNEL`] for every insert, update, and delete on the three
//! application tables. Consumers re-read inserted and updated rows by id.

use futures::{Stream, StreamExt};
use serde::Deserialize;
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

pub const CHANGES_CHANNEL: &str = "leadflow_changes";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeTable {
    Pipelines,
    PipelineContacts,
    UnresolvedResponseLeads,
    #[serde(other)]
    Other,
}

/// One decoded notification.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RowChange {
    pub table: ChangeTable,
    pub op: ChangeOp,
    /// Primary key as text; UUID or integer depending on the table.
    pub id: String,
}

impl RowChange {
    /// # Errors
    ///
    /// Returns [`DbError::InvalidNotification`] if the payload is not the
    /// trigger's JSON shape.
    pub fn parse(payload: &str) -> Result<Self, DbError> {
        serde_json::from_str(payload)
            .map_err(|e| DbError::InvalidNotification(format!("{e}: {payload}")))
    }

    /// # Errors
    ///
    /// Returns [`DbError::InvalidNotification`] if the id is not a UUID.
    pub fn uuid_id(&self) -> Result<Uuid, DbError> {
        self.id
            .parse()
            .map_err(|_| DbError::InvalidNotification(format!("expected uuid id, got {}", self.id)))
    }

    /// # Errors
    ///
    /// Returns [`DbError::InvalidNotification`] if the id is not an integer.
    pub fn bigint_id(&self) -> Result<i64, DbError> {
        self.id.parse().map_err(|_| {
            DbError::InvalidNotification(format!("expected integer id, got {}", self.id))
        })
    }
}

/// Subscribes to row changes.
///
/// The listener holds its own connection taken from `pool`'s settings and
/// reconnects transparently if it drops; notifications sent while it was
/// disconnected are lost.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the connection or `LISTEN` fails.
pub async fn listen_for_changes(
    pool: &PgPool,
) -> Result<impl Stream<Item = Result<RowChange, DbError>> + Send + 'static, DbError> {
    let mut listener = PgListener::connect_with(pool).await?;
    listener.listen(CHANGES_CHANNEL).await?;

    Ok(listener
        .into_stream()
        .map(|notification| -> Result<RowChange, DbError> {
            let notification = notification?;
            RowChange::parse(notification.payload())
        }))
}
