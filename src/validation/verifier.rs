use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::key_set_cache::KeySetCache;
use crate::cache::token::{decode_claims, Claims};
use crate::error::DapsError;
use crate::observability::metrics::get_metrics;
use crate::sources::jwks::HttpKeySetSource;
use crate::sources::FetchKeySet;
use crate::validation::chain::{ChainResult, ValidationRuleChain};

/// Claims of a verified inbound DAT and the chain's verdict on them.
#[derive(Debug, Clone)]
pub struct VerificationReport {
    pub claims: Claims,
    pub result: ChainResult,
}

impl VerificationReport {
    pub fn is_accepted(&self) -> bool {
        self.result.is_pass()
    }

    /// Reasons to attach when rejecting the message.
    pub fn violations(&self) -> Vec<&str> {
        self.result.failures()
    }
}

/// Checks DATs attached to inbound messages: signature against the authority
/// key, then the configured rule chain.
pub struct TokenVerifier<K = HttpKeySetSource> {
    key_set: Arc<KeySetCache<K>>,
    chain: ValidationRuleChain,
}

impl<K: FetchKeySet> TokenVerifier<K> {
    pub fn new(key_set: Arc<KeySetCache<K>>, chain: ValidationRuleChain) -> Self {
        Self { key_set, chain }
    }

    pub fn chain(&self) -> &ValidationRuleChain {
        &self.chain
    }

    pub async fn verify(&self, token: &str) -> Result<VerificationReport, DapsError> {
        let metrics = get_metrics().await;
        let claims = self
            .key_set
            .verify_with(|key| decode_claims(token, key, &[]))
            .await
            .inspect_err(|e| {
                warn!(error = %e, "inbound DAT rejected before rule evaluation");
                metrics.inbound_tokens.with_label_values(&["error"]).inc();
            })?;

        let result = self.chain.validate(&claims).inspect_err(|e| {
            warn!(error = %e, "validation rule failed to run");
            metrics.inbound_tokens.with_label_values(&["error"]).inc();
        })?;

        if result.is_pass() {
            debug!(sub = ?claims.subject(), "inbound DAT accepted");
            metrics.inbound_tokens.with_label_values(&["accepted"]).inc();
        } else {
            for rule in result.failed_rules() {
                metrics.rule_failures.with_label_values(&[rule]).inc();
            }
            warn!(sub = ?claims.subject(), violations = ?result.failures(), "inbound DAT rejected");
            metrics.inbound_tokens.with_label_values(&["rejected"]).inc();
        }

        Ok(VerificationReport { claims, result })
    }
}
