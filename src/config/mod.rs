//! Configuration module
//!
//! Settings for the HTTP service and the registration command. Both are read
//! from the process environment (after `.env` is loaded by the binaries), or
//! from any key lookup function in tests.

use crate::error::{PluginError, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default listening port
pub const DEFAULT_PORT: u16 = 3000;

/// Default bind address (all interfaces)
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default base URL of the agent platform API
pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Service identity reported by `/health`
pub const SERVICE_NAME: &str = "postgresql-plugin";

/// Routes listed in the not-found response
pub const AVAILABLE_ENDPOINTS: [&str; 3] = ["/health", "/query", "/database-info"];

/// Read a variable, treating empty values as unset
fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|value| !value.trim().is_empty())
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// HTTP service configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Listening port
    pub port: u16,
    /// Shared bearer secret; authentication is disabled when absent
    pub api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            api_key: None,
        }
    }
}

impl ServerConfig {
    /// Load from `HOST`, `PORT` and `API_KEY`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    /// Load using an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match non_empty(&lookup, "PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| PluginError::config(format!("invalid PORT '{}': {}", raw, e)))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            host: non_empty(&lookup, "HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            api_key: non_empty(&lookup, "API_KEY"),
        })
    }

    /// Socket address to bind
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| PluginError::config(format!("invalid bind address: {}", e)))
    }

    /// Whether bearer authentication is enabled
    pub fn auth_enabled(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Pool settings applied to every cached connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub idle_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 1,
            idle_timeout: Duration::from_secs(20),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Registration command configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationConfig {
    /// Base URL of the platform API
    pub api_url: String,
    /// Target space (required)
    pub space_id: String,
    /// Target project, if any
    pub project_id: Option<String>,
    /// Token the platform should send back to this service
    pub service_token: Option<String>,
    /// Directory holding `ai_plugin.json` and `openapi.yaml`
    pub manifest_dir: PathBuf,
}

impl RegistrationConfig {
    /// Load from `COZE_API_URL`, `SPACE_ID`, `PROJECT_ID`, `API_KEY` and `PLUGIN_MANIFEST_DIR`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    /// Load using an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let space_id = non_empty(&lookup, "SPACE_ID")
            .ok_or_else(|| PluginError::config("SPACE_ID environment variable is required"))?;

        let api_url = non_empty(&lookup, "COZE_API_URL")
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let manifest_dir = non_empty(&lookup, "PLUGIN_MANIFEST_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")));

        Ok(Self {
            api_url,
            space_id,
            project_id: non_empty(&lookup, "PROJECT_ID"),
            service_token: non_empty(&lookup, "API_KEY"),
            manifest_dir,
        })
    }

    /// Full URL of the registration endpoint
    pub fn register_url(&self) -> String {
        format!("{}/api/developer/register", self.api_url)
    }
}
