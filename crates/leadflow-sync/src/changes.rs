use futures::{Stream, StreamExt};
use leadflow_db::{DbError, RowChange};

use crate::engine::SyncEngine;
use crate::store::PipelineStore;

/// Reloads the engine for every pipeline row change on the feed until it
/// ends. Bad notifications and failed reloads are logged and skipped.
///
/// Returns the number of reloads that succeeded.
pub async fn follow_changes<S, St>(engine: &SyncEngine<S>, changes: St) -> usize
where
    S: PipelineStore,
    St: Stream<Item = Result<RowChange, DbError>>,
{
    let mut changes = std::pin::pin!(changes);
    let mut reloads = 0;
    while let Some(change) = changes.next().await {
        let change = match change {
            Ok(change) => change,
            Err(error) => {
                tracing::warn!(error = %error, "invalid change notification");
                continue;
            }
        };
        match engine.handle_change(&change).await {
            Ok(Some(state)) => {
                reloads += 1;
                tracing::debug!(?state, "engine reloaded after pipeline change");
            }
            Ok(None) => {}
            Err(error) => tracing::warn!(error = %error, "reload after pipeline change failed"),
        }
    }
    tracing::info!(reloads, "change feed closed");
    reloads
}
