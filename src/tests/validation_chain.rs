#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use serde_json::json;

    use crate::cache::token::Claims;
    use crate::helpers::time::is_valid_at;
    use crate::validation::rule::named;
    use crate::validation::rules::{AudienceRule, ExpiryRule, IssuerRule, TOKEN_EXPIRED};
    use crate::{DatValidationRule, ValidationRuleChain, ValidationRuleError, ValidationRuleResult};

    const NOW: i64 = 1_700_000_000;

    fn claims(exp: i64) -> Claims {
        Claims::new()
            .with("iss", "https://daps.example.org")
            .with("sub", "AB:CD:0E:keyid:01:FF")
            .with("aud", json!(["idsc:IDS_CONNECTORS_ALL", "urn:broker"]))
            .with("exp", exp)
    }

    fn failing(name: &'static str, counter: Arc<AtomicUsize>) -> impl DatValidationRule {
        named(name, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(ValidationRuleResult::fail(format!("{name} says no")))
        })
    }

    fn passing(name: &'static str, counter: Arc<AtomicUsize>) -> impl DatValidationRule {
        named(name, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(ValidationRuleResult::pass())
        })
    }

    #[test]
    fn every_rule_runs_even_after_failures() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = ValidationRuleChain::new()
            .with_rule(failing("first", calls.clone()))
            .with_rule(passing("second", calls.clone()))
            .with_rule(failing("third", calls.clone()));

        let result = chain.validate(&claims(NOW + 60)).expect("rules run");

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(!result.is_pass());
        assert_eq!(result.failures(), vec!["first says no", "third says no"]);
        assert_eq!(result.failed_rules(), vec!["first", "third"]);
        assert_eq!(result.outcomes.len(), 3);
    }

    #[test]
    fn single_failure_anywhere_fails_the_chain() {
        for failing_at in 0..3 {
            let calls = Arc::new(AtomicUsize::new(0));
            let mut chain = ValidationRuleChain::new();
            for position in 0..3 {
                chain = if position == failing_at {
                    chain.with_rule(failing("bad", calls.clone()))
                } else {
                    chain.with_rule(passing("good", calls.clone()))
                };
            }

            let result = chain.validate(&claims(NOW + 60)).expect("rules run");
            assert!(!result.is_pass(), "failure at {failing_at} not reported");
            assert_eq!(result.failures().len(), 1);
            assert_eq!(calls.load(Ordering::SeqCst), 3);
        }
    }

    #[test]
    fn all_passing_rules_pass() {
        let chain = ValidationRuleChain::new()
            .with_rule(ExpiryRule::at(NOW))
            .with_rule(IssuerRule::new("https://daps.example.org"))
            .with_rule(AudienceRule::new("urn:broker"));

        let result = chain.validate(&claims(NOW + 60)).expect("rules run");
        assert!(result.is_pass());
        assert!(result.failures().is_empty());
    }

    #[test]
    fn empty_chain_passes() {
        let chain = ValidationRuleChain::new();
        assert!(chain.is_empty());
        assert!(chain.validate(&Claims::new()).expect("nothing to run").is_pass());
    }

    #[test]
    fn rule_error_aborts_the_run() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = ValidationRuleChain::new()
            .with_rule(named("broken", |_| Err(ValidationRuleError::new("broken", "claim store offline"))))
            .with_rule(passing("after", calls.clone()));

        let err = chain.validate(&claims(NOW + 60)).expect_err("rule error");
        assert_eq!(err.rule, "broken");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn plain_closure_is_a_custom_rule() {
        let rule = |claims: &Claims| -> Result<ValidationRuleResult, ValidationRuleError> {
            match claims.get("securityProfile") {
                Some(_) => Ok(ValidationRuleResult::pass()),
                None => Ok(ValidationRuleResult::fail("no security profile")),
            }
        };
        assert_eq!(rule.name(), "custom");

        let chain = ValidationRuleChain::new().with_rule(rule);
        let result = chain.validate(&claims(NOW + 60)).expect("rules run");
        assert_eq!(result.outcomes[0].rule, "custom");
        assert_eq!(result.failures(), vec!["no security profile"]);
    }

    #[test]
    fn expired_token_reports_token_expired() {
        let chain = ValidationRuleChain::new().with_rule(ExpiryRule::at(NOW));

        let result = chain.validate(&claims(NOW - 1)).expect("rules run");
        assert!(!result.is_pass());
        assert_eq!(result.failures(), vec![TOKEN_EXPIRED]);
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        assert!(is_valid_at(NOW + 1, NOW));
        assert!(!is_valid_at(NOW, NOW));
        assert!(!is_valid_at(NOW - 1, NOW));

        let rule = ExpiryRule::at(NOW);
        assert!(rule.check_rule(&claims(NOW + 1)).expect("evaluated").is_pass());
        assert_eq!(
            rule.check_rule(&claims(NOW)).expect("evaluated"),
            ValidationRuleResult::fail(TOKEN_EXPIRED)
        );
    }

    #[test]
    fn expiry_rule_handles_missing_and_malformed_exp() {
        let rule = ExpiryRule::at(NOW);
        let missing = rule.check_rule(&Claims::new()).expect("evaluated");
        assert!(!missing.is_pass());

        let malformed = Claims::new().with("exp", "tomorrow");
        let err = rule.check_rule(&malformed).expect_err("exp is a string");
        assert_eq!(err.rule, "expiry");
    }

    #[test]
    fn expiry_rule_accepts_fractional_numeric_date() {
        let rule = ExpiryRule::at(NOW);
        let later = Claims::new().with("exp", NOW as f64 + 0.5);
        assert_eq!(later.expiry(), Some(NOW));
        // floored to `now`, so already expired
        assert_eq!(rule.check_rule(&later).expect("evaluated"), ValidationRuleResult::fail(TOKEN_EXPIRED));

        let next_second = Claims::new().with("exp", NOW as f64 + 1.25);
        assert!(rule.check_rule(&next_second).expect("evaluated").is_pass());
    }

    #[test]
    fn issuer_and_audience_rules() {
        let token = claims(NOW + 60);
        assert!(IssuerRule::new("https://daps.example.org").check_rule(&token).expect("evaluated").is_pass());
        assert!(!IssuerRule::new("https://other.example.org").check_rule(&token).expect("evaluated").is_pass());
        assert!(AudienceRule::new("idsc:IDS_CONNECTORS_ALL").check_rule(&token).expect("evaluated").is_pass());
        assert!(!AudienceRule::new("urn:nobody").check_rule(&token).expect("evaluated").is_pass());

        let numeric_issuer = Claims::new().with("iss", 7);
        assert!(IssuerRule::new("x").check_rule(&numeric_issuer).is_err());
    }

    #[test]
    fn dat_defaults_add_only_configured_rules() {
        assert_eq!(ValidationRuleChain::dat_defaults(None, None).len(), 1);
        assert_eq!(ValidationRuleChain::dat_defaults(Some("iss"), None).len(), 2);

        let chain = ValidationRuleChain::dat_defaults(Some("https://daps.example.org"), Some("urn:broker"));
        assert_eq!(chain.len(), 3);
        let result = chain.validate(&claims(crate::helpers::time::now_i64() + 600)).expect("rules run");
        assert!(result.is_pass());
    }
}
