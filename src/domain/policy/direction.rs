//! Which tag pairs in a group carry a change expectation

use crate::domain::tags::{LinkGroup, PolicyKind};
use serde::Serialize;

/// Whether a change to a `talker`-kind tag obliges a `listener`-kind tag to change.
///
/// Only the policy kinds matter here; the caller excludes pairing a tag with
/// itself.
pub fn forms_expected_pair(talker: PolicyKind, listener: PolicyKind) -> bool {
    talker.is_talker() && listener.is_listener()
}

/// Why a group has no direction to evaluate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Directionless {
    /// Fewer than two tags
    UnderLinked,
    /// Only listener tags
    NoTalker,
    /// Only talker tags
    NoListener,
}

/// Ordered (talker index, listener index) pairs of a group.
pub fn expected_pairs(group: &LinkGroup) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for (t, talker) in group.tags.iter().enumerate() {
        for (l, listener) in group.tags.iter().enumerate() {
            if t != l && forms_expected_pair(talker.policy, listener.policy) {
                pairs.push((t, l));
            }
        }
    }
    pairs
}

/// Classify a group that cannot be evaluated, or `None` if it has pairs.
pub fn directionless(group: &LinkGroup) -> Option<Directionless> {
    if group.tags.len() < 2 {
        return Some(Directionless::UnderLinked);
    }
    if !group.tags.iter().any(|t| t.policy.is_talker()) {
        return Some(Directionless::NoTalker);
    }
    if !group.tags.iter().any(|t| t.policy.is_listener()) {
        return Some(Directionless::NoListener);
    }
    None
}
