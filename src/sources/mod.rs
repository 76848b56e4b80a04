//! Sources module
//!
//! Network capabilities the caches depend on: obtaining a fresh DAT from the
//! authority and fetching its published key set.

use jsonwebtoken::jwk::JwkSet;

use crate::error::{DapsError, KeyRetrievalError};

pub mod daps;
pub mod identity;
pub mod jwks;

pub trait AcquireToken: Send + Sync {
    /// Obtain a freshly issued compact token from `endpoint`. Never retries.
    fn acquire_token(
        &self,
        endpoint: &str,
    ) -> impl std::future::Future<Output = Result<String, DapsError>> + Send;
}

pub trait FetchKeySet: Send + Sync {
    fn fetch_key_set(&self) -> impl std::future::Future<Output = Result<JwkSet, KeyRetrievalError>> + Send;
}
