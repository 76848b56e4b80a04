use tracing::debug;

use crate::cache::token::Claims;
use crate::validation::rule::{DatValidationRule, ValidationRuleError, ValidationRuleResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOutcome {
    pub rule: String,
    pub result: ValidationRuleResult,
}

/// Per-rule report of one chain run, in configured order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainResult {
    pub outcomes: Vec<RuleOutcome>,
}

impl ChainResult {
    /// PASS iff every rule passed. An empty chain passes.
    pub fn is_pass(&self) -> bool {
        self.outcomes.iter().all(|outcome| outcome.result.is_pass())
    }

    /// Failure reasons in rule order.
    pub fn failures(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match &outcome.result {
                ValidationRuleResult::Fail { reason } => Some(reason.as_str()),
                ValidationRuleResult::Pass { .. } => None,
            })
            .collect()
    }

    pub fn failed_rules(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|outcome| !outcome.result.is_pass())
            .map(|outcome| outcome.rule.as_str())
            .collect()
    }
}

/// Ordered rules evaluated exhaustively against inbound claims.
#[derive(Default)]
pub struct ValidationRuleChain {
    rules: Vec<Box<dyn DatValidationRule>>,
}

impl ValidationRuleChain {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn with_rule(mut self, rule: impl DatValidationRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run every rule; a failing rule never stops the ones after it.
    /// Only a rule that cannot be evaluated aborts the run.
    pub fn validate(&self, claims: &Claims) -> Result<ChainResult, ValidationRuleError> {
        let mut outcomes = Vec::with_capacity(self.rules.len());
        for rule in &self.rules {
            let result = rule.check_rule(claims)?;
            debug!(rule = rule.name(), pass = result.is_pass(), "validation rule evaluated");
            outcomes.push(RuleOutcome {
                rule: rule.name().to_owned(),
                result,
            });
        }
        Ok(ChainResult { outcomes })
    }
}
