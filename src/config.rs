use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    /// Exposes `/debug` with upstream diagnostics. Keep off on public listeners.
    pub debug_route: bool,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamBackend {
    Memory,
    UrBackup,
}

#[derive(Clone)]
pub struct UpstreamConfig {
    pub backend: UpstreamBackend,
    /// Web API endpoint, e.g. `http://127.0.0.1:55414/x`
    pub url: String,
    pub username: String,
    pub password: String,
    /// Per-request timeout against the backup server
    pub timeout_secs: u64,
}

impl fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("backend", &self.backend)
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"***")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            backend: UpstreamBackend::UrBackup,
            url: "http://127.0.0.1:55414/x".to_string(),
            username: "admin".to_string(),
            password: String::new(),
            timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = UpstreamConfig::default();

        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let backend = match std::env::var("UPSTREAM_BACKEND")
            .unwrap_or_else(|_| "urbackup".to_string())
            .to_lowercase()
            .as_str()
        {
            "memory" => UpstreamBackend::Memory,
            _ => UpstreamBackend::UrBackup,
        };

        let url = std::env::var("URBACKUP_URL").unwrap_or(defaults.url);
        let username = std::env::var("URBACKUP_USER").unwrap_or(defaults.username);
        let password = std::env::var("URBACKUP_PASSWORD").unwrap_or_default();

        let timeout_secs = std::env::var("URBACKUP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.timeout_secs);

        let debug_route = std::env::var("ENABLE_DEBUG_ROUTE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let config = Config {
            server: ServerConfig { bind_address },
            upstream: UpstreamConfig {
                backend,
                url,
                username,
                password,
                timeout_secs,
            },
            debug_route,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream.backend == UpstreamBackend::UrBackup {
            let url = &self.upstream.url;
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::ValidationError(format!(
                    "URBACKUP_URL must be an http(s) URL, got '{url}'"
                )));
            }

            if self.upstream.password.is_empty() {
                tracing::warn!(
                    "URBACKUP_PASSWORD is empty; only anonymous login to the backup server will work"
                );
            }
        }

        if self.upstream.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "URBACKUP_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
