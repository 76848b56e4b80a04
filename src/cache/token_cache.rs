use jsonwebtoken::errors::Error as JwtError;
use tokio::sync::RwLock;

use crate::cache::key_set_cache::VerificationKey;
use crate::cache::token::ParsedToken;

/// What the cache holds right now, judged against a key and an instant.
#[derive(Debug)]
pub enum CacheState {
    Empty,
    Valid(ParsedToken),
    Expired(ParsedToken),
    /// The cached token does not decode or verify with the given key.
    Unverifiable { value: String, error: JwtError },
}

impl CacheState {
    pub fn needs_refresh(&self) -> bool {
        !matches!(self, CacheState::Valid(_))
    }
}

/// Holder of the single current outbound token.
///
/// Only the raw token string is stored; expiry is decoded from it on every
/// check. The value is replaced as a whole, never edited.
#[derive(Debug, Default)]
pub struct TokenCache {
    inner: RwLock<Option<String>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self { inner: RwLock::new(None) }
    }

    pub async fn get(&self) -> Option<String> {
        self.inner.read().await.clone()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_none()
    }

    /// Store `value` in place of whatever token was cached before.
    pub async fn replace(&self, value: String) {
        *self.inner.write().await = Some(value);
    }

    /// Drop the cached token if it is still `stale`. A token stored by a
    /// refresh in the meantime is kept.
    pub async fn discard(&self, stale: &str) -> bool {
        let mut current = self.inner.write().await;
        if current.as_deref() == Some(stale) {
            *current = None;
            true
        } else {
            false
        }
    }

    /// Decode the cached token with `key` and compare its expiry to `now_unix_ts`.
    pub async fn check(&self, key: &VerificationKey, now_unix_ts: i64) -> CacheState {
        let Some(value) = self.get().await else {
            return CacheState::Empty;
        };

        match ParsedToken::decode(&value, key) {
            Ok(parsed) if parsed.is_valid_at(now_unix_ts) => CacheState::Valid(parsed),
            Ok(parsed) => CacheState::Expired(parsed),
            Err(error) => CacheState::Unverifiable { value, error },
        }
    }
}
