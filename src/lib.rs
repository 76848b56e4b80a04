//! # DAPS Client Library
//!
//! Acquires, caches and validates Dynamic Attribute Tokens (DATs) issued by
//! a Dynamic Attribute Provisioning Service (DAPS) for a trust-network connector.
//!
//! Modules:
//! - `cache` — outbound token cache and authority key cache
//! - `sources` — DAPS token exchange, key set fetch, connector identity
//! - `provider` — the outbound token provider composing both caches
//! - `validation` — rule chain and verifier for inbound tokens
//! - `messaging` — lazily deserialized message payloads
//! - `config` — YAML service configuration

pub mod cache;
pub mod config;
pub mod error;
pub mod helpers;
pub mod messaging;
pub mod observability;
pub mod provider;
pub mod resilience;
pub mod sources;
pub mod utils;
pub mod validation;

#[cfg(test)]
mod tests;


pub use crate::cache::token::{Claims, DynamicAttributeToken, ParsedToken};
pub use crate::error::{DapsError, FaultKind, KeyRetrievalError};
pub use crate::provider::token_provider::TokenProvider;
pub use crate::validation::chain::{ChainResult, ValidationRuleChain};
pub use crate::validation::rule::{DatValidationRule, ValidationRuleError, ValidationRuleResult};
pub use crate::validation::verifier::{TokenVerifier, VerificationReport};
