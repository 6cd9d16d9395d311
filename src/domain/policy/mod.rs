//! Change-policy evaluation

pub mod direction;
pub mod evaluator;

pub use direction::{directionless, expected_pairs, forms_expected_pair, Directionless};
pub use evaluator::{InconclusiveReason, Outcome, PolicyEvaluator, Verdict, Violation};
