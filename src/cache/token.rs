use chrono::{DateTime, Utc};
use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use jsonwebtoken::Validation;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cache::key_set_cache::VerificationKey;
use crate::helpers::time::is_valid_at;

pub const DAT_TYPE: &str = "ids:DynamicAttributeToken";

/// Decoded claim set of a token, claim name to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.0.insert(name.to_owned(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn issuer(&self) -> Option<&str> {
        self.get("iss").and_then(Value::as_str)
    }

    pub fn subject(&self) -> Option<&str> {
        self.get("sub").and_then(Value::as_str)
    }

    /// `aud` may be a single string or an array of strings.
    pub fn audiences(&self) -> Vec<&str> {
        match self.get("aud") {
            Some(Value::String(aud)) => vec![aud.as_str()],
            Some(Value::Array(auds)) => auds.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Expiry as whole unix seconds. A fractional NumericDate is floored;
    /// `None` when absent or not a number.
    pub fn expiry(&self) -> Option<i64> {
        let exp = self.get("exp")?;
        exp.as_i64().or_else(|| exp.as_f64().map(|secs| secs.floor() as i64))
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for Claims {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Verify the signature of `value` with `key` and return its claims.
///
/// Time based claims are not checked here: expiry is compared by the caller
/// (cache) or by a validation rule (inbound tokens).
pub fn decode_claims(value: &str, key: &VerificationKey, required: &[&str]) -> Result<Claims, JwtError> {
    let mut validation = Validation::new(key.algorithm);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.set_required_spec_claims(required);

    let data = jsonwebtoken::decode::<Claims>(value, &key.key, &validation)?;
    Ok(data.claims)
}

/// Outbound token together with the claims it was decoded into.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedToken {
    pub value: String,
    pub claims: Claims,
    pub exp_unix_ts: i64,
}

impl ParsedToken {
    pub fn decode(value: &str, key: &VerificationKey) -> Result<Self, JwtError> {
        let claims = decode_claims(value, key, &[])?;
        let exp_unix_ts = claims
            .expiry()
            .ok_or_else(|| JwtError::from(ErrorKind::MissingRequiredClaim("exp".to_owned())))?;

        Ok(Self {
            value: value.to_owned(),
            claims,
            exp_unix_ts,
        })
    }

    pub fn is_valid_at(&self, now_unix_ts: i64) -> bool {
        is_valid_at(self.exp_unix_ts, now_unix_ts)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp_unix_ts, 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "@id")]
pub enum TokenFormat {
    #[serde(rename = "idsc:JWT")]
    Jwt,
}

/// Information-model wrapper of a DAT as attached to outgoing messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicAttributeToken {
    #[serde(rename = "@type")]
    pub type_name: String,
    #[serde(rename = "ids:tokenFormat")]
    pub token_format: TokenFormat,
    #[serde(rename = "ids:tokenValue")]
    pub token_value: String,
}

impl DynamicAttributeToken {
    pub fn jwt(token_value: String) -> Self {
        Self {
            type_name: DAT_TYPE.to_owned(),
            token_format: TokenFormat::Jwt,
            token_value,
        }
    }
}
