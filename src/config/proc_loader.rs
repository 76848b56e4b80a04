use std::{fs, path::Path};

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use tracing::{debug, error};

use crate::config::proc_validator;
use crate::config::settings::{IdentityConfig, LogFormat, LoggingConfig, ServiceConfig};
use crate::sources::identity::{parse_key_identifier, CertificateIdentity};

/// Load and validate config from YAML file
pub async fn file_to_config(path: &Path) -> Result<ServiceConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read config {}", path.display()))?;

    let expanded = expand_env_vars(&content)?;
    parse_config(&expanded)
}

pub fn parse_config(content: &str) -> Result<ServiceConfig> {
    let mut service_config: ServiceConfig = serde_yaml::from_str(content)
        .inspect_err(|e| {
            error!("parse config error: {}", e);
        })?;

    // Apply defaults
    if service_config.settings.logging.is_none() {
        service_config.settings.logging = Some(LoggingConfig::new("info".to_owned(), LogFormat::Compact));
    }
    debug!("validation config ...");
    proc_validator::validate_service_config(&service_config).map_err(|errors| {
        anyhow!(
            "config is not valid, total errors:{}, \n{}",
            errors.len(),
            errors.join("\n")
        )
    })?;

    Ok(service_config)
}

/// Replace `${VAR}` and `${VAR:default}` with environment values.
pub fn expand_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{(\w+)(?::([^\}]+))?\}")?;
    let expanded = re.replace_all(input, |caps: &regex::Captures| {
        let var = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        std::env::var(var).unwrap_or_else(|_| default.to_string())
    });
    Ok(expanded.to_string())
}

/// Read the connector key from disk and pair it with the configured key identifiers.
pub fn load_identity(identity: &IdentityConfig) -> Result<CertificateIdentity> {
    let pem = fs::read(&identity.private_key_path)
        .with_context(|| format!("cannot read private key {}", identity.private_key_path))?;

    let ski = identity
        .subject_key_identifier
        .as_deref()
        .map(parse_key_identifier)
        .transpose()
        .context("invalid subject_key_identifier")?;
    let aki = identity
        .authority_key_identifier
        .as_deref()
        .map(parse_key_identifier)
        .transpose()
        .context("invalid authority_key_identifier")?;

    CertificateIdentity::from_rsa_pem(&pem, ski, aki)
        .with_context(|| format!("cannot load private key {}", identity.private_key_path))
}
