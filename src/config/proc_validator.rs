//! Configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - Checks DAPS endpoints, identity, logging and retry invariants

use tracing::{error, info};

use crate::config::settings::{DapsConfig, IdentityConfig, RetryConfig, ServiceConfig, SettingsConfig};
use crate::sources::identity::parse_key_identifier;

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_settings(&cfg.settings, &mut errors);
    validate_daps(&cfg.daps, &mut errors);
    validate_identity(&cfg.identity, &mut errors);

    if errors.is_empty() {
        info!("config valid");
        Ok(())
    } else {
        error!("configuration validation errors ({}):", errors.len());
        for e in &errors {
            error!(" - {}", e);
        }
        Err(errors)
    }
}

fn validate_settings(settings: &SettingsConfig, errors: &mut Vec<String>) {
    // retry invariants
    if let Some(retry) = &settings.retry {
        validate_retry("settings.retry", retry, errors);
    }

    if let Some(http) = &settings.http {
        if http.timeout_ms == Some(0) {
            errors.push("settings.http.timeout_ms must be > 0".to_string());
        }
    }

    // logging level
    if let Some(logging) = &settings.logging {
        let valid = ["trace", "debug", "info", "warn", "error"];
        if !valid.contains(&logging.level.as_str()) {
            errors.push(format!(
                "settings.logging.level '{}' invalid; allowed: {:?}",
                logging.level, valid
            ));
        }
    }
}

fn validate_retry(path: &str, retry: &RetryConfig, errors: &mut Vec<String>) {
    if let Some(attempts) = retry.attempts {
        if attempts == 0 {
            errors.push(format!("{}.attempts must be > 0", path));
        }
    }
    if let (Some(base), Some(max)) = (retry.base_delay_ms, retry.max_delay_ms) {
        if max < base {
            errors.push(format!(
                "{}.max_delay_ms ({}) must be >= base_delay_ms ({})",
                path, max, base
            ));
        }
    }
}

fn validate_daps(daps: &DapsConfig, errors: &mut Vec<String>) {
    for (field, url) in [("token_url", &daps.token_url), ("key_url", &daps.key_url)] {
        if url.trim().is_empty() {
            errors.push(format!("daps.{}: cannot be empty", field));
        } else if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(format!("daps.{}: '{}' must be an http(s) url", field, url));
        }
    }
    if let Some(kid) = &daps.key_id {
        if kid.trim().is_empty() {
            errors.push("daps.key_id: cannot be empty when set".to_string());
        }
    }
    if daps.assertion_ttl_seconds == 0 {
        errors.push("daps.assertion_ttl_seconds must be > 0".to_string());
    }
}

fn validate_identity(identity: &IdentityConfig, errors: &mut Vec<String>) {
    if identity.private_key_path.trim().is_empty() {
        errors.push("identity.private_key_path: cannot be empty".to_string());
    }
    // absent identifiers are reported when a token is requested, malformed ones right away
    for (field, value) in [
        ("subject_key_identifier", &identity.subject_key_identifier),
        ("authority_key_identifier", &identity.authority_key_identifier),
    ] {
        if let Some(value) = value {
            if let Err(e) = parse_key_identifier(value) {
                errors.push(format!("identity.{}: '{}' is not hex: {}", field, value, e));
            }
        }
    }
}
