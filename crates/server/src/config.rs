use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};

const DEFAULT_PROFILES_DIR: &str = "./profiles";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8188;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Server settings read from the environment (and an optional `.env`).
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub profiles_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub request_timeout: Duration,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let profiles_dir = lookup("PACK_MANAGER_PROFILES_DIR")
            .unwrap_or_else(|| DEFAULT_PROFILES_DIR.to_string())
            .into();
        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match lookup("PORT") {
            Some(port_str) => port_str
                .parse::<u16>()
                .with_context(|| format!("Invalid port value '{port_str}'"))?,
            None => DEFAULT_PORT,
        };

        let timeout_secs = match lookup("PACK_MANAGER_REQUEST_TIMEOUT_SECS") {
            Some(secs) => secs
                .parse::<u64>()
                .with_context(|| format!("Invalid request timeout '{secs}'"))?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        Ok(Self {
            profiles_dir,
            host,
            port,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
