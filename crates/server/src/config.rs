use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::net::SocketAddr;
use std::time::Duration;
use store::BackendConfig;

/// Which lead store the server talks to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// PostgREST endpoint (hosted Postgres).
    #[default]
    Rest,
    /// Process-local store; leads are lost on restart.
    Memory,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum request body size in MB
    #[serde(default = "default_max_body_size_mb")]
    pub max_body_size_mb: usize,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Metrics endpoint enabled
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// Path the voice platform posts call events to
    #[serde(default = "default_webhook_path")]
    pub webhook_path: String,

    #[serde(default)]
    pub store_backend: StoreBackend,

    /// Base URL of the PostgREST host (without `/rest/v1`)
    #[serde(default)]
    pub store_url: Option<String>,

    /// Service credential; must bypass row-level security
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub store_key: Option<SecretString>,

    #[serde(default = "default_store_timeout_secs")]
    pub store_timeout_secs: u64,

    /// Optional YAML pipeline config (idempotency, tenant policy, dedupe)
    #[serde(default)]
    pub pipeline_config: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            max_body_size_mb: default_max_body_size_mb(),
            enable_cors: default_true(),
            log_level: default_log_level(),
            metrics_enabled: default_true(),
            webhook_path: default_webhook_path(),
            store_backend: StoreBackend::default(),
            store_url: None,
            store_key: None,
            store_timeout_secs: default_store_timeout_secs(),
            pipeline_config: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from `.env`, an optional `leadflow.*` file, and
    /// `LEADFLOW__*` environment variables.
    pub fn load() -> anyhow::Result<Self> {
        // A missing .env is normal outside development.
        let _ = dotenvy::dotenv();

        let builder = config::Config::builder()
            .add_source(config::File::with_name("leadflow").required(false))
            .add_source(config::Environment::with_prefix("LEADFLOW").separator("__"));

        let mut config: ServerConfig = builder.build()?.try_deserialize()?;
        config.apply_store_fallbacks(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Fill the store endpoint and credential from the hosting platform's
    /// conventional variables when not set explicitly.
    pub fn apply_store_fallbacks<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let first_set = |names: &[&str]| {
            names
                .iter()
                .filter_map(|&name| lookup(name))
                .find(|value| !value.trim().is_empty())
        };

        if self.store_url.is_none() {
            self.store_url = first_set(&["SUPABASE_URL", "VITE_SUPABASE_URL"]);
        }
        if self.store_key.is_none() {
            self.store_key = first_set(&["SUPABASE_SERVICE_ROLE_KEY", "VITE_SUPABASE_ANON_KEY"])
                .map(SecretString::from);
        }
    }

    /// Reject settings the router cannot serve.
    pub fn validate(&self) -> anyhow::Result<()> {
        const RESERVED: [&str; 4] = ["/", "/health", "/ready", "/metrics"];
        anyhow::ensure!(
            self.webhook_path.starts_with('/'),
            "webhook_path must start with '/': {}",
            self.webhook_path
        );
        anyhow::ensure!(
            !RESERVED.contains(&self.webhook_path.as_str()),
            "webhook_path collides with a built-in route: {}",
            self.webhook_path
        );
        anyhow::ensure!(self.max_body_size_mb > 0, "max_body_size_mb must be >= 1");
        Ok(())
    }

    /// Resolve the configured store backend.
    pub fn backend_config(&self) -> anyhow::Result<BackendConfig> {
        match self.store_backend {
            StoreBackend::Memory => Ok(BackendConfig::in_memory()),
            StoreBackend::Rest => {
                let url = self
                    .store_url
                    .as_deref()
                    .filter(|url| !url.trim().is_empty())
                    .ok_or_else(|| anyhow::anyhow!("store_url is required for the rest backend"))?;
                let key = self
                    .store_key
                    .as_ref()
                    .filter(|key| !key.expose_secret().is_empty())
                    .ok_or_else(|| anyhow::anyhow!("store_key is required for the rest backend"))?;
                Ok(BackendConfig::Rest {
                    url: url.to_string(),
                    key: key.clone(),
                    timeout_secs: self.store_timeout_secs,
                })
            }
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get max body size in bytes
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb * 1024 * 1024
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_body_size_mb() -> usize {
    2
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_webhook_path() -> String {
    "/webhook".to_string()
}

fn default_store_timeout_secs() -> u64 {
    10
}
