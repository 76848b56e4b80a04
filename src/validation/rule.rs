use crate::cache::token::Claims;

/// Outcome of one rule against one claim set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationRuleResult {
    Pass { info: Option<String> },
    Fail { reason: String },
}

impl ValidationRuleResult {
    pub fn pass() -> Self {
        ValidationRuleResult::Pass { info: None }
    }

    pub fn pass_with(info: impl Into<String>) -> Self {
        ValidationRuleResult::Pass { info: Some(info.into()) }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        ValidationRuleResult::Fail { reason: reason.into() }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, ValidationRuleResult::Pass { .. })
    }
}

/// A rule could not be evaluated at all, e.g. a claim of unexpected shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("validation rule '{rule}' could not be evaluated: {message}")]
pub struct ValidationRuleError {
    pub rule: String,
    pub message: String,
}

impl ValidationRuleError {
    pub fn new(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            message: message.into(),
        }
    }
}

/// Custom check applied to the claims of an inbound DAT.
///
/// A failed check is a normal [`ValidationRuleResult::Fail`]; `Err` is
/// reserved for rules that cannot run.
pub trait DatValidationRule: Send + Sync {
    fn name(&self) -> &str {
        "custom"
    }

    fn check_rule(&self, claims: &Claims) -> Result<ValidationRuleResult, ValidationRuleError>;
}

impl<F> DatValidationRule for F
where
    F: Fn(&Claims) -> Result<ValidationRuleResult, ValidationRuleError> + Send + Sync,
{
    fn check_rule(&self, claims: &Claims) -> Result<ValidationRuleResult, ValidationRuleError> {
        self(claims)
    }
}

/// Closure rule carrying a name for reports.
pub struct NamedRule<F> {
    name: String,
    check: F,
}

pub fn named<F>(name: impl Into<String>, check: F) -> NamedRule<F>
where
    F: Fn(&Claims) -> Result<ValidationRuleResult, ValidationRuleError> + Send + Sync,
{
    NamedRule {
        name: name.into(),
        check,
    }
}

impl<F> DatValidationRule for NamedRule<F>
where
    F: Fn(&Claims) -> Result<ValidationRuleResult, ValidationRuleError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn check_rule(&self, claims: &Claims) -> Result<ValidationRuleResult, ValidationRuleError> {
        (self.check)(claims)
    }
}
