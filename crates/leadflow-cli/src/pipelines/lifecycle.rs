use std::time::Duration;

use leadflow_db::DbError;
use leadflow_sync::{launch, SyncEngine};
use leadflow_webhook::WebhookClient;
use uuid::Uuid;

/// Launch a pipeline and print the workflow engine's reply.
///
/// # Errors
///
/// Returns an error if the webhook URL is not configured, the pipeline does
/// not exist, or the launch fails. A failed webhook call has already been
/// rolled back when this returns.
pub(crate) async fn run_pipelines_launch(
    pool: &sqlx::PgPool,
    config: &leadflow_core::AppConfig,
    id: Uuid,
) -> anyhow::Result<()> {
    let webhook = WebhookClient::new(config.webhook_url.as_deref(), config.webhook_timeout_secs)?;
    if !webhook.is_configured() {
        anyhow::bail!("N8N_WEBHOOK_URL is not set; cannot launch pipelines");
    }

    let engine = SyncEngine::new(
        pool.clone(),
        Duration::from_millis(config.list_poll_interval_ms),
    );
    let outcome = launch(&engine, &webhook, id).await;
    engine.stop();

    let response = outcome?;
    println!("launched pipeline {id}");
    if !response.is_empty() {
        println!("workflow engine: {response}");
    }
    Ok(())
}

/// Delete one pipeline, or every pipeline when `all` is set.
///
/// Contacts are removed with their pipeline.
///
/// # Errors
///
/// Returns an error if the pipeline does not exist or the delete fails.
pub(crate) async fn run_pipelines_delete(
    pool: &sqlx::PgPool,
    id: Option<Uuid>,
    all: bool,
) -> anyhow::Result<()> {
    if all {
        let removed = leadflow_db::delete_all_pipelines(pool).await?;
        tracing::info!(removed, "all pipelines deleted");
        println!("deleted {removed} pipeline(s)");
        return Ok(());
    }

    let id = id.ok_or_else(|| anyhow::anyhow!("a pipeline id or --all is required"))?;
    match leadflow_db::delete_pipeline(pool, id).await {
        Ok(()) => {
            tracing::info!(pipeline_id = %id, "pipeline deleted");
            println!("deleted pipeline {id}");
            Ok(())
        }
        Err(DbError::NotFound) => anyhow::bail!("pipeline {id} not found"),
        Err(e) => Err(e.into()),
    }
}
