use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::cache::key_set_cache::{is_key_mismatch, KeySetCache, VerificationKey};
use crate::cache::token::{DynamicAttributeToken, ParsedToken};
use crate::cache::token_cache::{CacheState, TokenCache};
use crate::error::DapsError;
use crate::helpers::time::{get_instant, now_i64};
use crate::observability::metrics::get_metrics;
use crate::sources::daps::DapsTokenAcquirer;
use crate::sources::jwks::HttpKeySetSource;
use crate::sources::{AcquireToken, FetchKeySet};

/// Hands out the connector's current DAT and the authority's verification key.
///
/// Refresh is demand driven. The check, acquire and replace steps run inside
/// one critical section, so concurrent callers hitting a stale cache cause a
/// single acquisition and all read its result.
pub struct TokenProvider<A = DapsTokenAcquirer, K = HttpKeySetSource> {
    token_url: String,
    acquirer: A,
    cache: TokenCache,
    key_set: Arc<KeySetCache<K>>,
    refresh_lock: Mutex<()>,
}

impl<A: AcquireToken, K: FetchKeySet> TokenProvider<A, K> {
    pub fn new(token_url: impl Into<String>, acquirer: A, key_set: Arc<KeySetCache<K>>) -> Self {
        Self {
            token_url: token_url.into(),
            acquirer,
            cache: TokenCache::new(),
            key_set,
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    pub fn key_set(&self) -> &Arc<KeySetCache<K>> {
        &self.key_set
    }

    /// Compact DAT, cached until it expires.
    pub async fn provide_token(&self) -> Result<String, DapsError> {
        self.current_token().await.map(|token| token.value)
    }

    /// DAT wrapped for attachment to outgoing messages.
    pub async fn dat(&self) -> Result<DynamicAttributeToken, DapsError> {
        self.provide_token().await.map(DynamicAttributeToken::jwt)
    }

    /// Key used to verify tokens issued by the authority.
    pub async fn public_key(&self) -> Result<Arc<VerificationKey>, DapsError> {
        Ok(self.key_set.verification_key().await?)
    }

    /// Current DAT with its decoded claims, refreshed if missing or expired.
    pub async fn current_token(&self) -> Result<ParsedToken, DapsError> {
        let metrics = get_metrics().await;
        if let Some(token) = self.cached_valid_token().await? {
            metrics.token_requests.with_label_values(&["cache_hit"]).inc();
            return Ok(token);
        }

        let _guard = self.refresh_lock.lock().await;
        // a refresh may have committed while we waited
        if let Some(token) = self.cached_valid_token().await? {
            metrics.token_requests.with_label_values(&["cache_hit"]).inc();
            return Ok(token);
        }

        info!(url = %self.token_url, "get a new DAT");
        let start = get_instant();
        let value = self
            .acquirer
            .acquire_token(&self.token_url)
            .await
            .inspect_err(|e| {
                error!(url = %self.token_url, kind = e.kind().as_str(), error = %e, "DAT acquisition failed");
                metrics.token_requests.with_label_values(&["failed"]).inc();
            })?;
        metrics.token_acquire_duration.observe(start.elapsed().as_secs_f64());

        let parsed = self
            .key_set
            .verify_with(|key| ParsedToken::decode(&value, key))
            .await
            .map_err(|e| match e {
                DapsError::InvalidToken(err) => DapsError::UnverifiableDat(err),
                other => other,
            })
            .inspect_err(|e| {
                warn!(error = %e, "acquired DAT does not verify, cache left unchanged");
                metrics.token_requests.with_label_values(&["failed"]).inc();
            })?;

        self.cache.replace(value).await;
        metrics.token_requests.with_label_values(&["acquired"]).inc();
        info!(expires_at = ?parsed.expires_at(), "current DAT replaced");
        Ok(parsed)
    }

    async fn cached_valid_token(&self) -> Result<Option<ParsedToken>, DapsError> {
        if self.cache.is_empty().await {
            debug!("no DAT cached");
            return Ok(None);
        }

        let key = self.key_set.verification_key().await?;
        match self.cache.check(&key, now_i64()).await {
            CacheState::Valid(token) => {
                debug!(expires_at = ?token.expires_at(), "cached DAT still valid");
                Ok(Some(token))
            }
            CacheState::Empty => Ok(None),
            CacheState::Expired(token) => {
                debug!(expires_at = ?token.expires_at(), "cached DAT expired");
                Ok(None)
            }
            CacheState::Unverifiable { value, error } => {
                warn!(error = %error, "cannot confirm validity of cached DAT, forcing refresh");
                if is_key_mismatch(&error) {
                    self.key_set.invalidate_stale(&key).await;
                }
                // later checks must not verify it again and drop the refetched key
                self.cache.discard(&value).await;
                Ok(None)
            }
        }
    }
}
