pub mod chain;
pub mod rule;
pub mod rules;
pub mod verifier;
