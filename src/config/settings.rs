use serde::Deserialize;

use crate::sources::daps::{AssertionSettings, DEFAULT_ASSERTION_TTL_SECONDS, DEFAULT_AUDIENCE, DEFAULT_SCOPE};

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default)]
    pub settings: SettingsConfig,
    pub daps: DapsConfig,
    pub identity: IdentityConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
}

/// ================================
/// Global service-wide settings
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SettingsConfig {
    pub retry: Option<RetryConfig>,
    pub http: Option<HttpConfig>,
    pub logging: Option<LoggingConfig>
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    pub attempts: Option<u32>,
    /// will be mutiply by 2 on every attempt until max_delay_ms
    pub base_delay_ms: Option<u64>,
    /// max delay for retrying
    /// invariant: >= base_delay_ms.
    pub max_delay_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub timeout_ms: Option<u64>,
}

/// ================================
/// DAPS endpoints
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct DapsConfig {
    pub token_url: String,
    pub key_url: String,
    /// kid of the signing key in the published key set
    pub key_id: Option<String>,
    #[serde(default = "default_audience")]
    pub audience: String,
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default = "default_assertion_ttl_seconds")]
    pub assertion_ttl_seconds: u64,
}

impl DapsConfig {
    pub fn assertion_settings(&self) -> AssertionSettings {
        AssertionSettings {
            audience: self.audience.to_owned(),
            scope: self.scope.to_owned(),
            ttl_seconds: self.assertion_ttl_seconds,
        }
    }
}

/// ================================
/// Connector identity
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct IdentityConfig {
    /// PEM encoded RSA private key of the connector certificate
    pub private_key_path: String,
    /// colon separated hex, e.g. `AB:CD:01`
    pub subject_key_identifier: Option<String>,
    pub authority_key_identifier: Option<String>,
}

/// ================================
/// Inbound validation
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ValidationConfig {
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String, // allowed: trace, debug, info, warn, error
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new (level: String, format: LogFormat) -> Self {
        Self { level: level, format: format }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}

fn default_audience() -> String {
    DEFAULT_AUDIENCE.to_owned()
}

fn default_scope() -> String {
    DEFAULT_SCOPE.to_owned()
}

fn default_assertion_ttl_seconds() -> u64 {
    DEFAULT_ASSERTION_TTL_SECONDS
}
