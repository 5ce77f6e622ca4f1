mod api;
mod middleware;
mod watchers;

use std::sync::Arc;
use std::time::Duration;

use leadflow_campaigns::CampaignsClient;
use leadflow_sync::{follow_changes, SyncEngine};
use leadflow_webhook::WebhookClient;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState},
    watchers::DetailWatchers,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = leadflow_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = leadflow_db::PoolConfig::from_app_config(&config);
    let pool = match config.database_url.as_deref() {
        Some(url) => {
            let pool = leadflow_db::connect_pool(url, pool_config).await?;
            let applied = leadflow_db::run_migrations(&pool).await?;
            tracing::info!(applied, "migrations up to date");
            pool
        }
        None => {
            tracing::warn!("DATABASE_URL is not set; database routes will fail");
            leadflow_db::connect_lazy(None, pool_config)?
        }
    };

    let campaigns = match config.instantly_api_key.as_deref() {
        Some(key) => Some(Arc::new(CampaignsClient::with_base_url(
            key,
            &config.instantly_base_url,
        )?)),
        None => {
            tracing::warn!("INSTANTLY_API_KEY is not set; campaign listing is disabled");
            None
        }
    };

    let webhook = WebhookClient::new(config.webhook_url.as_deref(), config.webhook_timeout_secs)?;
    if !webhook.is_configured() {
        tracing::warn!("N8N_WEBHOOK_URL is not set; launches will fail");
    }

    let engine = Arc::new(SyncEngine::new(
        pool.clone(),
        Duration::from_millis(config.list_poll_interval_ms),
    ));
    let mut change_feed = None;
    if config.database_url.is_some() {
        match engine.start().await {
            Ok(state) => tracing::info!(?state, "sync engine started"),
            Err(error) => tracing::warn!(error = %error, "initial pipeline load failed"),
        }
        match leadflow_db::listen_for_changes(&pool).await {
            Ok(changes) => {
                let engine = Arc::clone(&engine);
                change_feed = Some(tokio::spawn(async move {
                    follow_changes(&engine, changes).await;
                }));
            }
            Err(error) => tracing::warn!(error = %error, "pipeline change feed unavailable"),
        }
    }

    let watchers = DetailWatchers::new(Duration::from_millis(config.detail_poll_interval_ms));
    let state = AppState {
        pool,
        engine: Arc::clone(&engine),
        watchers: watchers.clone(),
        webhook,
        campaigns,
    };
    let app = build_app(state, config.cors_origin());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "leadflow server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(task) = change_feed {
        task.abort();
    }
    engine.stop();
    watchers.clear();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %error, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(error = %error, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
