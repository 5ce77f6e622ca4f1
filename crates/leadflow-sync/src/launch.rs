use chrono::Utc;
use leadflow_core::{LifecycleUpdate, PipelineAction, PipelineStatus};
use leadflow_db::DbError;
use leadflow_webhook::{WebhookError, WebhookPayload, WebhookSink};
use uuid::Uuid;

use crate::engine::SyncEngine;
use crate::store::PipelineStore;

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("pipeline not found: {0}")]
    NotFound(Uuid),
    #[error("pipeline {id} cannot be launched while {}", status.as_str())]
    NotLaunchable { id: Uuid, status: PipelineStatus },
    #[error("store error: {0}")]
    Store(#[from] DbError),
    #[error("webhook dispatch failed: {0}")]
    Webhook(#[from] WebhookError),
}

/// Marks a pipeline launched and hands it to the workflow engine.
///
/// The lifecycle write happens first. If the webhook then fails the write is
/// reverted to the creation state; a failed revert is only logged. The
/// engine is reloaded in every case so polling follows the stored state.
///
/// Returns the workflow engine's response text.
///
/// # Errors
///
/// - [`LaunchError::NotFound`] if no pipeline has this id.
/// - [`LaunchError::NotLaunchable`] unless the pipeline still offers the
///   launch prompt; nothing was written or sent.
/// - [`LaunchError::Store`] if the pipeline cannot be read or marked
///   launched; nothing was sent.
/// - [`LaunchError::Webhook`] with the original dispatch error.
pub async fn launch<S, W>(
    engine: &SyncEngine<S>,
    webhook: &W,
    pipeline_id: Uuid,
) -> Result<String, LaunchError>
where
    S: PipelineStore,
    W: WebhookSink,
{
    let store = engine.store();
    let pipeline = store
        .get_pipeline(pipeline_id)
        .await?
        .ok_or(LaunchError::NotFound(pipeline_id))?;
    if pipeline.action != PipelineAction::LaunchPrompt {
        return Err(LaunchError::NotLaunchable {
            id: pipeline_id,
            status: pipeline.status,
        });
    }

    store
        .apply_lifecycle(pipeline_id, LifecycleUpdate::LAUNCHED)
        .await?;
    tracing::info!(%pipeline_id, name = %pipeline.name, "pipeline marked launched");

    let payload = WebhookPayload::for_pipeline(&pipeline, Utc::now());
    let outcome = webhook.send_pipeline(&payload).await;

    if let Err(error) = &outcome {
        tracing::warn!(
            %pipeline_id,
            error = %error,
            "webhook dispatch failed, rolling back launch"
        );
        if let Err(rollback) = store
            .apply_lifecycle(pipeline_id, LifecycleUpdate::ROLLBACK)
            .await
        {
            tracing::error!(%pipeline_id, error = %rollback, "launch rollback failed");
        }
    }

    if let Err(error) = engine.reload().await {
        tracing::warn!(%pipeline_id, error = %error, "reload after launch failed");
    }

    Ok(outcome?)
}
