use std::fmt;
use std::sync::Arc;

use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use jsonwebtoken::jwk::{AlgorithmParameters, EllipticCurve, Jwk, JwkSet, KeyAlgorithm, PublicKeyUse};
use jsonwebtoken::{Algorithm, DecodingKey};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::{DapsError, KeyRetrievalError};
use crate::observability::metrics::get_metrics;
use crate::sources::jwks::HttpKeySetSource;
use crate::sources::FetchKeySet;

/// Key id looked up when no explicit key id is configured.
pub const DEFAULT_KEY_ID: &str = "default";

/// Public key of the authority, ready for signature verification.
#[derive(Clone)]
pub struct VerificationKey {
    pub key_id: Option<String>,
    pub algorithm: Algorithm,
    pub key: DecodingKey,
}

impl fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationKey")
            .field("key_id", &self.key_id)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl VerificationKey {
    pub fn from_jwk(jwk: &Jwk) -> Result<Self, KeyRetrievalError> {
        let kid = jwk.common.key_id.clone().unwrap_or_default();
        let algorithm = signing_algorithm(jwk).ok_or_else(|| KeyRetrievalError::UnsupportedKey {
            kid: kid.clone(),
            reason: "no usable signature algorithm".to_owned(),
        })?;
        let key = DecodingKey::from_jwk(jwk).map_err(|e| KeyRetrievalError::UnsupportedKey {
            kid,
            reason: e.to_string(),
        })?;

        Ok(Self {
            key_id: jwk.common.key_id.clone(),
            algorithm,
            key,
        })
    }
}

/// Lazily fetched, explicitly invalidated holder of the current verification key.
///
/// Only a successful key-id match is ever cached. A key set that does not
/// contain the wanted key leaves the cache empty so the next call fetches again.
pub struct KeySetCache<K = HttpKeySetSource> {
    source: K,
    key_id: Option<String>,
    current: RwLock<Option<Arc<VerificationKey>>>,
    fetch_lock: Mutex<()>,
}

impl<K: FetchKeySet> KeySetCache<K> {
    pub fn new(source: K, key_id: Option<String>) -> Self {
        Self {
            source,
            key_id,
            current: RwLock::new(None),
            fetch_lock: Mutex::new(()),
        }
    }

    pub fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    /// Return the cached key, fetching the key set on a miss.
    pub async fn verification_key(&self) -> Result<Arc<VerificationKey>, KeyRetrievalError> {
        if let Some(key) = self.cached().await {
            debug!("provide cached verification key");
            return Ok(key);
        }

        // one fetch at a time, late arrivals reuse its result
        let _guard = self.fetch_lock.lock().await;
        if let Some(key) = self.cached().await {
            return Ok(key);
        }

        let metrics = get_metrics().await;
        let key_set = self.source.fetch_key_set().await.inspect_err(|e| {
            warn!(error = %e, "could not fetch key set");
            metrics.key_set_fetches.with_label_values(&["error"]).inc();
        })?;

        let key = select_key(&key_set, self.key_id.as_deref()).inspect_err(|e| {
            warn!(kid = ?self.key_id, error = %e, "fetched key set holds no usable key, nothing cached");
            metrics.key_set_fetches.with_label_values(&["not_found"]).inc();
        })?;

        let key = Arc::new(key);
        *self.current.write().await = Some(key.clone());
        metrics.key_set_fetches.with_label_values(&["ok"]).inc();
        info!(kid = ?key.key_id, alg = ?key.algorithm, "verification key cached");
        Ok(key)
    }

    /// Drop the cached key; the next call fetches the key set again.
    pub async fn invalidate(&self) {
        debug!("verification key invalidated");
        *self.current.write().await = None;
    }

    /// Drop `stale` only if it is still the cached key, so a key fetched
    /// meanwhile by another caller survives.
    pub async fn invalidate_stale(&self, stale: &Arc<VerificationKey>) {
        let mut current = self.current.write().await;
        if current.as_ref().is_some_and(|key| Arc::ptr_eq(key, stale)) {
            debug!(kid = ?stale.key_id, "stale verification key invalidated");
            *current = None;
        }
    }

    /// Run `verify` with the cached key. A signature mismatch invalidates the
    /// key and retries once with a freshly fetched one.
    pub async fn verify_with<T, F>(&self, verify: F) -> Result<T, DapsError>
    where
        F: Fn(&VerificationKey) -> Result<T, JwtError>,
    {
        let key = self.verification_key().await?;
        match verify(&key) {
            Ok(value) => Ok(value),
            Err(err) if is_key_mismatch(&err) => {
                warn!(kid = ?key.key_id, error = %err, "signature does not match cached key, refetching key set");
                self.invalidate_stale(&key).await;
                let key = self.verification_key().await?;
                verify(&key).map_err(DapsError::InvalidToken)
            }
            Err(err) => Err(DapsError::InvalidToken(err)),
        }
    }

    async fn cached(&self) -> Option<Arc<VerificationKey>> {
        self.current.read().await.clone()
    }
}

pub fn is_key_mismatch(err: &JwtError) -> bool {
    matches!(err.kind(), ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm)
}

/// Pick the configured key id, or `default`, or the first signature key.
pub fn select_key(key_set: &JwkSet, key_id: Option<&str>) -> Result<VerificationKey, KeyRetrievalError> {
    let jwk = match key_id {
        Some(kid) => key_set.find(kid),
        None => key_set
            .find(DEFAULT_KEY_ID)
            .or_else(|| key_set.keys.iter().find(|jwk| is_signature_key(jwk))),
    }
    .ok_or_else(|| KeyRetrievalError::KeyNotFound(key_id.unwrap_or(DEFAULT_KEY_ID).to_owned()))?;

    VerificationKey::from_jwk(jwk)
}

fn is_signature_key(jwk: &Jwk) -> bool {
    !matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption))
}

fn signing_algorithm(jwk: &Jwk) -> Option<Algorithm> {
    if let Some(alg) = &jwk.common.key_algorithm {
        return match alg {
            KeyAlgorithm::RS256 => Some(Algorithm::RS256),
            KeyAlgorithm::RS384 => Some(Algorithm::RS384),
            KeyAlgorithm::RS512 => Some(Algorithm::RS512),
            KeyAlgorithm::PS256 => Some(Algorithm::PS256),
            KeyAlgorithm::PS384 => Some(Algorithm::PS384),
            KeyAlgorithm::PS512 => Some(Algorithm::PS512),
            KeyAlgorithm::ES256 => Some(Algorithm::ES256),
            KeyAlgorithm::ES384 => Some(Algorithm::ES384),
            KeyAlgorithm::EdDSA => Some(Algorithm::EdDSA),
            // encryption algorithms and symmetric keys never verify DATs
            _ => None,
        };
    }

    match &jwk.algorithm {
        AlgorithmParameters::RSA(_) => Some(Algorithm::RS256),
        AlgorithmParameters::EllipticCurve(params) => match params.curve {
            EllipticCurve::P256 => Some(Algorithm::ES256),
            EllipticCurve::P384 => Some(Algorithm::ES384),
            _ => None,
        },
        AlgorithmParameters::OctetKeyPair(_) => Some(Algorithm::EdDSA),
        _ => None,
    }
}
