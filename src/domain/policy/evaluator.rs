//! Policy evaluation: checks each link group against a change set

use super::direction::{directionless, expected_pairs, Directionless};
use crate::domain::change_set::{Baseline, ChangeSet, TagChange};
use crate::domain::tags::{LinkGroup, Tag};
use serde::Serialize;

/// Evaluation outcome for a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Satisfied,
    Violated,
    Inconclusive,
}

/// Why a group could not be decided
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum InconclusiveReason {
    /// The comparison has no "before" side
    MissingBaseline { detail: String },
    /// The group has no talker→listener pair
    Directionless { kind: Directionless },
    /// Some pairs involve tags whose file is gone from the "after" side
    UnresolvableTags,
}

/// A talker that changed while its listener did not
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub group_id: String,
    pub talker: Tag,
    pub listener: Tag,
}

/// The verdict for one link group, with evidence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub group_id: String,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<InconclusiveReason>,
    /// Tags whose extent intersects the change set
    pub changed: Vec<Tag>,
    /// Listeners that were expected to change but did not
    pub expected_unchanged: Vec<Tag>,
    pub violations: Vec<Violation>,
}

impl Verdict {
    fn inconclusive(group: &LinkGroup, reason: InconclusiveReason) -> Self {
        Verdict {
            group_id: group.id.clone(),
            outcome: Outcome::Inconclusive,
            reason: Some(reason),
            changed: Vec::new(),
            expected_unchanged: Vec::new(),
            violations: Vec::new(),
        }
    }
}

pub struct PolicyEvaluator;

impl PolicyEvaluator {
    /// Evaluate every group. Pure: same inputs, same verdicts.
    pub fn evaluate(groups: &[LinkGroup], changes: &ChangeSet) -> Vec<Verdict> {
        groups
            .iter()
            .map(|group| Self::evaluate_group(group, changes))
            .collect()
    }

    /// Evaluate a single group.
    pub fn evaluate_group(group: &LinkGroup, changes: &ChangeSet) -> Verdict {
        if let Some(kind) = directionless(group) {
            return Verdict::inconclusive(group, InconclusiveReason::Directionless { kind });
        }

        if let Baseline::Missing { reason } = &changes.baseline {
            return Verdict::inconclusive(
                group,
                InconclusiveReason::MissingBaseline {
                    detail: reason.clone(),
                },
            );
        }

        let states: Vec<TagChange> = group.tags.iter().map(|t| changes.tag_change(t)).collect();

        let mut violations = Vec::new();
        let mut expected_unchanged: Vec<Tag> = Vec::new();
        let mut unresolved_pairs = 0;

        for (t, l) in expected_pairs(group) {
            match (states[t], states[l]) {
                (TagChange::Unresolvable, _) | (_, TagChange::Unresolvable) => {
                    unresolved_pairs += 1;
                }
                (TagChange::Changed, TagChange::Unchanged) => {
                    let listener = &group.tags[l];
                    if !expected_unchanged.contains(listener) {
                        expected_unchanged.push(listener.clone());
                    }
                    violations.push(Violation {
                        group_id: group.id.clone(),
                        talker: group.tags[t].clone(),
                        listener: listener.clone(),
                    });
                }
                _ => {}
            }
        }

        let changed = group
            .tags
            .iter()
            .zip(&states)
            .filter(|(_, state)| **state == TagChange::Changed)
            .map(|(tag, _)| tag.clone())
            .collect();

        let (outcome, reason) = if !violations.is_empty() {
            (Outcome::Violated, None)
        } else if unresolved_pairs > 0 {
            (Outcome::Inconclusive, Some(InconclusiveReason::UnresolvableTags))
        } else {
            (Outcome::Satisfied, None)
        };

        Verdict {
            group_id: group.id.clone(),
            outcome,
            reason,
            changed,
            expected_unchanged,
            violations,
        }
    }
}
