//! Structural and semantic rules for region trees.
//!
//! Rules, checked depth-first in document order:
//! - ids are non-empty and unique, durations finite and `>= 0`
//! - `bound` only appears on loops
//! - every task carries non-negative impacts of one shared length, fixed by
//!   the first task encountered anywhere in the tree
//! - child counts and distributions fit the region kind

use std::collections::HashSet;

use thiserror::Error;
use tracing::debug;

use crate::core::region::{Distribution, Region, RegionType};

/// Allowed deviation of a branch distribution's sum from 1.
pub const DISTRIBUTION_TOLERANCE: f64 = 1e-9;

/// First rule violation found in a region tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("region id must be non-empty")]
    EmptyId,
    #[error("duplicate region id '{id}'")]
    DuplicateId { id: String },
    #[error("region '{id}': duration must be a finite number >= 0 (got {duration})")]
    InvalidDuration { id: String, duration: f64 },
    #[error("region '{id}': bound is only allowed on Loop regions")]
    UnexpectedBound { id: String },
    #[error("region '{id}': {kind} regions must not have impacts")]
    UnexpectedImpacts { id: String, kind: RegionType },
    #[error("region '{id}': Task regions require impacts")]
    MissingImpacts { id: String },
    #[error("region '{id}': impacts must be finite numbers >= 0")]
    InvalidImpact { id: String },
    #[error("region '{id}': expected {expected} impacts, found {found}")]
    ImpactLengthMismatch {
        id: String,
        expected: usize,
        found: usize,
    },
    #[error("region '{id}': {kind} regions must not have children")]
    UnexpectedChildren { id: String, kind: RegionType },
    #[error("region '{id}': {kind} regions require {expected} children, found {found}")]
    ChildCount {
        id: String,
        kind: RegionType,
        expected: &'static str,
        found: usize,
    },
    #[error("region '{id}': {kind} regions must not have a distribution")]
    UnexpectedDistribution { id: String, kind: RegionType },
    #[error("region '{id}': {kind} regions require a distribution")]
    MissingDistribution { id: String, kind: RegionType },
    #[error("region '{id}': {reason}")]
    InvalidDistribution { id: String, reason: String },
    #[error("region '{id}': Loop regions require a bound")]
    MissingBound { id: String },
    #[error("region '{id}': bound must be a positive integer (got {bound})")]
    InvalidBound { id: String, bound: f64 },
    #[error("region '{id}': fields do not match a {kind} region")]
    Malformed { id: String, kind: RegionType },
}

/// Validate a region tree, returning the first violation.
pub fn validate(region: &Region) -> Result<(), ValidationError> {
    let mut walk = Walk::default();
    walk.region(region)
}

/// Boolean form of [`validate`]; the rejection reason is logged at debug level.
pub fn is_valid(region: &Region) -> bool {
    match validate(region) {
        Ok(()) => true,
        Err(err) => {
            debug!(error = %err, "region rejected");
            false
        }
    }
}

#[derive(Default)]
struct Walk {
    /// Impact dimension fixed by the first task, shared by the whole tree.
    expected_impact_length: Option<usize>,
    seen: HashSet<String>,
}

impl Walk {
    fn region(&mut self, region: &Region) -> Result<(), ValidationError> {
        let id = region.id.as_str();
        if id.trim().is_empty() {
            return Err(ValidationError::EmptyId);
        }
        if !self.seen.insert(id.to_string()) {
            return Err(ValidationError::DuplicateId { id: id.to_string() });
        }
        if !region.duration.is_finite() || region.duration < 0.0 {
            return Err(ValidationError::InvalidDuration {
                id: id.to_string(),
                duration: region.duration,
            });
        }
        if region.bound.is_some() && region.kind != RegionType::Loop {
            return Err(ValidationError::UnexpectedBound { id: id.to_string() });
        }

        let children = region.children();
        match region.kind {
            RegionType::Task => {
                if !children.is_empty() {
                    return Err(ValidationError::UnexpectedChildren {
                        id: id.to_string(),
                        kind: region.kind,
                    });
                }
                no_distribution(region)?;
                self.task_impacts(region)?;
            }
            RegionType::Sequential => {
                no_impacts(region)?;
                no_distribution(region)?;
                child_count(region, "exactly 2", |n| n == 2)?;
            }
            RegionType::Parallel => {
                no_impacts(region)?;
                no_distribution(region)?;
                child_count(region, "at least 2", |n| n >= 2)?;
            }
            RegionType::Choice => {
                no_impacts(region)?;
                child_count(region, "at least 2", |n| n >= 2)?;
                if let Some(distribution) = &region.distribution {
                    debug!(region = %id, "choice region carries a distribution");
                    branch_distribution(region, distribution)?;
                }
            }
            RegionType::Nature => {
                no_impacts(region)?;
                child_count(region, "at least 2", |n| n >= 2)?;
                let distribution =
                    region
                        .distribution
                        .as_ref()
                        .ok_or_else(|| ValidationError::MissingDistribution {
                            id: id.to_string(),
                            kind: region.kind,
                        })?;
                branch_distribution(region, distribution)?;
            }
            RegionType::Loop => {
                no_impacts(region)?;
                child_count(region, "exactly 1", |n| n == 1)?;
                loop_probability(region)?;
                match region.bound {
                    None => return Err(ValidationError::MissingBound { id: id.to_string() }),
                    Some(_) if region.loop_bound().is_some() => {}
                    Some(bound) => {
                        return Err(ValidationError::InvalidBound {
                            id: id.to_string(),
                            bound,
                        });
                    }
                }
            }
        }

        for child in children {
            self.region(child)?;
        }
        Ok(())
    }

    fn task_impacts(&mut self, region: &Region) -> Result<(), ValidationError> {
        let impacts = region
            .impacts
            .as_deref()
            .ok_or_else(|| ValidationError::MissingImpacts {
                id: region.id.clone(),
            })?;
        if impacts.iter().any(|value| !value.is_finite() || *value < 0.0) {
            return Err(ValidationError::InvalidImpact {
                id: region.id.clone(),
            });
        }
        match self.expected_impact_length {
            None => self.expected_impact_length = Some(impacts.len()),
            Some(expected) if expected != impacts.len() => {
                return Err(ValidationError::ImpactLengthMismatch {
                    id: region.id.clone(),
                    expected,
                    found: impacts.len(),
                });
            }
            Some(_) => {}
        }
        Ok(())
    }
}

fn no_impacts(region: &Region) -> Result<(), ValidationError> {
    if region.impacts.is_some() {
        return Err(ValidationError::UnexpectedImpacts {
            id: region.id.clone(),
            kind: region.kind,
        });
    }
    Ok(())
}

fn no_distribution(region: &Region) -> Result<(), ValidationError> {
    if region.distribution.is_some() {
        return Err(ValidationError::UnexpectedDistribution {
            id: region.id.clone(),
            kind: region.kind,
        });
    }
    Ok(())
}

fn child_count(
    region: &Region,
    expected: &'static str,
    accept: impl Fn(usize) -> bool,
) -> Result<(), ValidationError> {
    let found = region.children().len();
    if !accept(found) {
        return Err(ValidationError::ChildCount {
            id: region.id.clone(),
            kind: region.kind,
            expected,
            found,
        });
    }
    Ok(())
}

fn branch_distribution(
    region: &Region,
    distribution: &Distribution,
) -> Result<(), ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidDistribution {
        id: region.id.clone(),
        reason,
    };
    let values = match distribution {
        Distribution::Branches(values) => values,
        Distribution::Single(_) => {
            return Err(invalid(format!(
                "{} distribution must be a list of branch probabilities",
                region.kind
            )));
        }
    };
    let branches = region.children().len();
    if values.len() != branches {
        return Err(invalid(format!(
            "distribution has {} entries for {} children",
            values.len(),
            branches
        )));
    }
    if values
        .iter()
        .any(|value| !value.is_finite() || !(0.0..=1.0).contains(value))
    {
        return Err(invalid("distribution entries must lie in [0, 1]".to_string()));
    }
    let sum: f64 = values.iter().sum();
    if (sum - 1.0).abs() > DISTRIBUTION_TOLERANCE {
        return Err(invalid(format!("distribution sums to {sum}, expected 1")));
    }
    Ok(())
}

fn loop_probability(region: &Region) -> Result<(), ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidDistribution {
        id: region.id.clone(),
        reason: reason.to_string(),
    };
    match region.distribution {
        Some(Distribution::Single(probability)) if probability > 0.0 && probability < 1.0 => {
            Ok(())
        }
        Some(Distribution::Single(_)) => Err(invalid("loop probability must lie in (0, 1)")),
        Some(Distribution::Branches(_)) => {
            Err(invalid("loop distribution must be a single probability"))
        }
        None => Err(ValidationError::MissingDistribution {
            id: region.id.clone(),
            kind: region.kind,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{choice, loop_region, nature, parallel, sequential, task};

    #[test]
    fn accepts_well_formed_tree() {
        let region = sequential(
            "root",
            task("a", 2.0, &[1.0, 0.0]),
            choice(
                "c",
                vec![task("b", 1.0, &[0.5, 0.5]), task("d", 0.0, &[0.0, 2.0])],
                None,
            ),
        );
        assert_eq!(validate(&region), Ok(()));
    }

    /// Distributions summing to 0.6 are rejected.
    #[test]
    fn rejects_nature_distribution_not_summing_to_one() {
        let region = nature(
            "n",
            vec![task("a", 1.0, &[1.0]), task("b", 1.0, &[1.0])],
            vec![0.3, 0.3],
        );
        assert!(!is_valid(&region));
        assert!(matches!(
            validate(&region),
            Err(ValidationError::InvalidDistribution { id, .. }) if id == "n"
        ));
    }

    #[test]
    fn accepts_distribution_within_tolerance() {
        let region = nature(
            "n",
            vec![task("a", 1.0, &[1.0]), task("b", 1.0, &[1.0])],
            vec![0.7, 0.3 + 1e-12],
        );
        assert!(is_valid(&region));
    }

    #[test]
    fn nature_requires_distribution() {
        let mut region = nature(
            "n",
            vec![task("a", 1.0, &[1.0]), task("b", 1.0, &[1.0])],
            vec![0.5, 0.5],
        );
        region.distribution = None;
        assert!(matches!(
            validate(&region),
            Err(ValidationError::MissingDistribution { .. })
        ));
    }

    /// Choice may carry a distribution; only a wrong sum rejects it.
    #[test]
    fn choice_distribution_is_optional_but_checked() {
        let good = choice(
            "c",
            vec![task("a", 1.0, &[1.0]), task("b", 1.0, &[1.0])],
            Some(vec![0.4, 0.6]),
        );
        assert!(is_valid(&good));

        let bad = choice(
            "c",
            vec![task("a", 1.0, &[1.0]), task("b", 1.0, &[1.0])],
            Some(vec![0.4, 0.4]),
        );
        assert!(!is_valid(&bad));
    }

    /// The first task anywhere fixes the impact dimension for the whole tree.
    #[test]
    fn impact_length_is_shared_across_branches() {
        let region = parallel(
            "p",
            vec![task("a", 1.0, &[1.0, 2.0]), task("b", 1.0, &[1.0])],
        );
        assert_eq!(
            validate(&region),
            Err(ValidationError::ImpactLengthMismatch {
                id: "b".to_string(),
                expected: 2,
                found: 1,
            })
        );
    }

    #[test]
    fn rejects_negative_impacts_and_duration() {
        assert!(matches!(
            validate(&task("a", 1.0, &[-1.0])),
            Err(ValidationError::InvalidImpact { .. })
        ));
        assert!(matches!(
            validate(&task("a", -1.0, &[1.0])),
            Err(ValidationError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn sequential_requires_exactly_two_children() {
        let mut region = sequential("s", task("a", 1.0, &[1.0]), task("b", 1.0, &[1.0]));
        region
            .children
            .as_mut()
            .expect("children")
            .push(task("c", 1.0, &[1.0]));
        assert!(matches!(
            validate(&region),
            Err(ValidationError::ChildCount { found: 3, .. })
        ));
    }

    #[test]
    fn bound_is_only_legal_on_loops() {
        let mut region = task("a", 1.0, &[1.0]);
        region.bound = Some(2.0);
        assert_eq!(
            validate(&region),
            Err(ValidationError::UnexpectedBound {
                id: "a".to_string()
            })
        );
    }

    #[test]
    fn loop_requires_probability_in_open_interval_and_bound() {
        assert!(is_valid(&loop_region("l", task("a", 1.0, &[1.0]), 0.8, 3)));
        assert!(!is_valid(&loop_region("l", task("a", 1.0, &[1.0]), 1.0, 3)));
        assert!(matches!(
            validate(&loop_region("l", task("a", 1.0, &[1.0]), 0.5, 0)),
            Err(ValidationError::InvalidBound { .. })
        ));
        let mut unbounded = loop_region("l", task("a", 1.0, &[1.0]), 0.5, 2);
        unbounded.bound = None;
        assert!(matches!(
            validate(&unbounded),
            Err(ValidationError::MissingBound { .. })
        ));
    }

    /// Negative and fractional bounds from JSON get the validator's message.
    #[test]
    fn json_bound_must_be_positive_integer() {
        for raw in ["-1", "2.5"] {
            let json = format!(
                r#"{{"id": "l", "type": "loop", "distribution": 0.5, "bound": {raw},
                    "children": [{{"id": "a", "type": "task", "impacts": [1.0]}}]}}"#
            );
            let region: Region = serde_json::from_str(&json).expect("parse region");
            let err = validate(&region).expect_err("invalid bound");
            assert!(matches!(err, ValidationError::InvalidBound { .. }), "{raw}");
            assert!(err.to_string().contains("positive integer"));
        }
    }

    #[test]
    fn task_must_not_have_children_or_distribution() {
        let mut region = task("a", 1.0, &[1.0]);
        region.children = Some(vec![task("b", 1.0, &[1.0])]);
        assert!(matches!(
            validate(&region),
            Err(ValidationError::UnexpectedChildren { .. })
        ));

        let mut region = task("a", 1.0, &[1.0]);
        region.distribution = Some(Distribution::Single(0.5));
        assert!(matches!(
            validate(&region),
            Err(ValidationError::UnexpectedDistribution { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_and_empty_ids() {
        let region = sequential("s", task("a", 1.0, &[1.0]), task("a", 1.0, &[1.0]));
        assert_eq!(
            validate(&region),
            Err(ValidationError::DuplicateId {
                id: "a".to_string()
            })
        );
        assert_eq!(
            validate(&task("", 1.0, &[1.0])),
            Err(ValidationError::EmptyId)
        );
    }

    #[test]
    fn composite_regions_reject_impacts() {
        let mut region = parallel(
            "p",
            vec![task("a", 1.0, &[1.0]), task("b", 1.0, &[1.0])],
        );
        region.impacts = Some(vec![1.0]);
        assert!(matches!(
            validate(&region),
            Err(ValidationError::UnexpectedImpacts { .. })
        ));
    }
}
