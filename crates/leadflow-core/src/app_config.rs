use std::net::SocketAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    /// `None` when `DATABASE_URL` is unset; callers fall back to a
    /// placeholder pool that fails on first use.
    pub database_url: Option<String>,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub instantly_api_key: Option<String>,
    pub instantly_base_url: String,
    pub webhook_url: Option<String>,
    pub webhook_timeout_secs: u64,
    pub list_poll_interval_ms: u64,
    pub detail_poll_interval_ms: u64,
    pub deployment_url: Option<String>,
}

impl AppConfig {
    /// Origin allowed by CORS, if the service should restrict it.
    ///
    /// Only production deployments with a known public URL are restricted.
    #[must_use]
    pub fn cors_origin(&self) -> Option<&str> {
        match self.env {
            Environment::Production => self.deployment_url.as_deref(),
            Environment::Development | Environment::Test => None,
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "instantly_api_key",
                &self.instantly_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("instantly_base_url", &self.instantly_base_url)
            .field("webhook_url", &self.webhook_url.as_ref().map(|_| "[redacted]"))
            .field("webhook_timeout_secs", &self.webhook_timeout_secs)
            .field("list_poll_interval_ms", &self.list_poll_interval_ms)
            .field("detail_poll_interval_ms", &self.detail_poll_interval_ms)
            .field("deployment_url", &self.deployment_url)
            .finish()
    }
}
