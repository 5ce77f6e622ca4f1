use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Nothing is strictly required: a missing database URL or API key is
/// reported when the corresponding feature is used, not at startup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_positive_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        match raw.parse::<u64>() {
            Ok(0) => Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must be greater than zero".to_string(),
            }),
            Ok(n) => Ok(n),
            Err(e) => Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            }),
        }
    };

    let database_url = optional("DATABASE_URL");
    let env = parse_environment(&or_default("LEADFLOW_ENV", "development"));

    let bind_addr = parse_addr("LEADFLOW_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("LEADFLOW_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("LEADFLOW_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("LEADFLOW_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_positive_u64("LEADFLOW_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let instantly_api_key = optional("INSTANTLY_API_KEY");
    let instantly_base_url = or_default("INSTANTLY_BASE_URL", "https://api.instantly.ai");

    // the server-only variable takes precedence over the public one
    let webhook_url =
        optional("N8N_WEBHOOK_URL").or_else(|| optional("NEXT_PUBLIC_N8N_WEBHOOK_URL"));
    let webhook_timeout_secs = parse_positive_u64("LEADFLOW_WEBHOOK_TIMEOUT_SECS", "30")?;

    let list_poll_interval_ms = parse_positive_u64("LEADFLOW_LIST_POLL_INTERVAL_MS", "3000")?;
    let detail_poll_interval_ms = parse_positive_u64("LEADFLOW_DETAIL_POLL_INTERVAL_MS", "5000")?;

    let deployment_url = optional("LEADFLOW_DEPLOYMENT_URL");

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        instantly_api_key,
        instantly_base_url,
        webhook_url,
        webhook_timeout_secs,
        list_poll_interval_ms,
        detail_poll_interval_ms,
        deployment_url,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
