use serde_json::Value;

use crate::cache::token::Claims;
use crate::helpers::time::{is_valid_at, now_i64};
use crate::validation::chain::ValidationRuleChain;
use crate::validation::rule::{DatValidationRule, ValidationRuleError, ValidationRuleResult};

pub const TOKEN_EXPIRED: &str = "token expired";

/// Fails once `exp` is reached.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpiryRule {
    now_unix_ts: Option<i64>,
}

impl ExpiryRule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate against a fixed instant instead of the wall clock.
    pub fn at(now_unix_ts: i64) -> Self {
        Self { now_unix_ts: Some(now_unix_ts) }
    }
}

impl DatValidationRule for ExpiryRule {
    fn name(&self) -> &str {
        "expiry"
    }

    fn check_rule(&self, claims: &Claims) -> Result<ValidationRuleResult, ValidationRuleError> {
        let exp = match (claims.get("exp"), claims.expiry()) {
            (None, _) => return Ok(ValidationRuleResult::fail("token has no exp claim")),
            (Some(_), Some(exp)) => exp,
            (Some(value), None) => {
                return Err(ValidationRuleError::new(self.name(), format!("exp is not a number: {value}")))
            }
        };

        let now = self.now_unix_ts.unwrap_or_else(now_i64);
        if is_valid_at(exp, now) {
            Ok(ValidationRuleResult::pass_with(format!("expires at {exp}")))
        } else {
            Ok(ValidationRuleResult::fail(TOKEN_EXPIRED))
        }
    }
}

/// Requires `iss` to equal the trusted authority.
#[derive(Debug, Clone)]
pub struct IssuerRule {
    expected: String,
}

impl IssuerRule {
    pub fn new(expected: impl Into<String>) -> Self {
        Self { expected: expected.into() }
    }
}

impl DatValidationRule for IssuerRule {
    fn name(&self) -> &str {
        "issuer"
    }

    fn check_rule(&self, claims: &Claims) -> Result<ValidationRuleResult, ValidationRuleError> {
        match claims.get("iss") {
            None => Ok(ValidationRuleResult::fail("token has no iss claim")),
            Some(Value::String(iss)) if *iss == self.expected => Ok(ValidationRuleResult::pass()),
            Some(Value::String(iss)) => Ok(ValidationRuleResult::fail(format!("untrusted issuer '{iss}'"))),
            Some(other) => Err(ValidationRuleError::new(self.name(), format!("iss is not a string: {other}"))),
        }
    }
}

/// Requires `aud` to contain the expected audience.
#[derive(Debug, Clone)]
pub struct AudienceRule {
    expected: String,
}

impl AudienceRule {
    pub fn new(expected: impl Into<String>) -> Self {
        Self { expected: expected.into() }
    }
}

impl DatValidationRule for AudienceRule {
    fn name(&self) -> &str {
        "audience"
    }

    fn check_rule(&self, claims: &Claims) -> Result<ValidationRuleResult, ValidationRuleError> {
        if claims.audiences().contains(&self.expected.as_str()) {
            Ok(ValidationRuleResult::pass())
        } else {
            Ok(ValidationRuleResult::fail(format!("audience '{}' not granted", self.expected)))
        }
    }
}

impl ValidationRuleChain {
    /// Expiry always, issuer and audience when configured.
    pub fn dat_defaults(issuer: Option<&str>, audience: Option<&str>) -> Self {
        let mut chain = ValidationRuleChain::new().with_rule(ExpiryRule::new());
        if let Some(issuer) = issuer {
            chain = chain.with_rule(IssuerRule::new(issuer));
        }
        if let Some(audience) = audience {
            chain = chain.with_rule(AudienceRule::new(audience));
        }
        chain
    }
}
