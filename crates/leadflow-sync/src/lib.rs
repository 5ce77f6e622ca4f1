//! Keeps pipeline state in step with the external processing services.
//!
//! [`SyncEngine`] polls the pipeline list while any pipeline is generating
//! leads, [`DetailPoller`] follows a single pipeline's icebreakers and
//! promotes it once they are ready, and [`launch`] hands a pipeline to the
//! workflow engine with a rollback on failure. [`follow_changes`] reloads
//! the engine when another process writes a pipeline row.

mod changes;
mod detail;
mod engine;
mod launch;
mod poller;
mod store;

#[cfg(test)]
mod testing;

pub use changes::follow_changes;
pub use detail::DetailPoller;
pub use engine::{SyncEngine, SyncState, SyncStatus};
pub use launch::{launch, LaunchError};
pub use store::PipelineStore;

use leadflow_db::DbError;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("pipeline not found: {0}")]
    PipelineNotFound(Uuid),
    #[error("store error: {0}")]
    Store(#[from] DbError),
}
