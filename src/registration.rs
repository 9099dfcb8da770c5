//! Plugin registration
//!
//! One-shot upload of the capability manifest (`ai_plugin.json`) and the
//! interface description (`openapi.yaml`) to the agent platform. There is
//! no retry; any failure ends the run.

use crate::config::RegistrationConfig;
use crate::error::{PluginError, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Capability manifest file name
pub const AI_PLUGIN_FILE: &str = "ai_plugin.json";

/// Interface description file name
pub const OPENAPI_FILE: &str = "openapi.yaml";

/// Default timeout for the registration call (in seconds)
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Payload posted to the registration endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterPluginRequest {
    pub space_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub ai_plugin: String,
    pub openapi: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_token: Option<String>,
}

/// Registered plugin details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredPlugin {
    pub plugin_id: i64,
    #[serde(default)]
    pub openapi: String,
}

/// Response envelope of the registration endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterPluginResponse {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub data: Option<RegisteredPlugin>,
}

impl RegisterPluginRequest {
    /// Read both manifest files from `config.manifest_dir`
    pub async fn load(config: &RegistrationConfig) -> Result<Self> {
        let ai_plugin = tokio::fs::read_to_string(config.manifest_dir.join(AI_PLUGIN_FILE)).await?;
        let openapi = tokio::fs::read_to_string(config.manifest_dir.join(OPENAPI_FILE)).await?;

        Ok(Self {
            space_id: config.space_id.clone(),
            project_id: config.project_id.clone(),
            ai_plugin,
            openapi,
            service_token: config.service_token.clone(),
        })
    }
}

/// HTTP client for the registration endpoint
pub struct Registrar {
    client: Client,
    config: RegistrationConfig,
}

impl Registrar {
    /// Create a registrar with the default timeout
    pub fn new(config: RegistrationConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &RegistrationConfig {
        &self.config
    }

    /// Load the manifest files and register them
    ///
    /// Succeeds only on a 2xx status with `code == 0`.
    pub async fn register(&self) -> Result<RegisterPluginResponse> {
        let payload = RegisterPluginRequest::load(&self.config).await?;
        self.send(&payload).await
    }

    /// Post an already built payload
    pub async fn send(&self, payload: &RegisterPluginRequest) -> Result<RegisterPluginResponse> {
        let response = self
            .client
            .post(self.config.register_url())
            .header(CONTENT_TYPE, "application/json")
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let result: RegisterPluginResponse = serde_json::from_str(&body)?;

        if status.is_success() && result.code == 0 {
            Ok(result)
        } else {
            Err(PluginError::Registration {
                status: status.as_u16(),
                code: result.code,
                message: result.msg,
            })
        }
    }

    /// Remediation hints for a failed registration
    pub fn hints(&self, error: &PluginError) -> Vec<String> {
        match error {
            PluginError::Registration {
                status: 400,
                message,
                ..
            } if message.contains("invalid") => vec![
                "Check that SPACE_ID is correct".to_string(),
                "Verify that PROJECT_ID exists (if provided)".to_string(),
                "Ensure your OpenAPI spec is valid YAML".to_string(),
                format!("Check that {} is valid JSON", AI_PLUGIN_FILE),
            ],
            PluginError::Http(e) if e.is_connect() || e.is_timeout() => vec![format!(
                "Check that the Coze Studio API is running at: {}",
                self.config.api_url
            )],
            PluginError::Io(_) => vec![format!(
                "Check that {} and {} exist in {}",
                AI_PLUGIN_FILE,
                OPENAPI_FILE,
                self.config.manifest_dir.display()
            )],
            _ => Vec::new(),
        }
    }
}
