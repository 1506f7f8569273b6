//! Resolved environment API keys.

use serde::{Deserialize, Serialize};

/// What a key is allowed to call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiKeyRole {
    #[default]
    Unknown,
    /// Client-side SDKs: server-evaluated flags, goal tracking.
    SdkClient,
    /// Server-side SDKs: raw flag and segment definitions.
    SdkServer,
    PublicApiReadOnly,
    PublicApiWrite,
    PublicApiAdmin,
}

/// An API key resolved to its environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentApiKey {
    pub environment_id: String,
    #[serde(default)]
    pub environment_url_code: String,
    pub api_key_id: String,
    pub role: ApiKeyRole,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub environment_disabled: bool,
    #[serde(default)]
    pub organization_id: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub project_url_code: String,
}
