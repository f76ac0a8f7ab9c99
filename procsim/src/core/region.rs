//! Region tree describing the structure of a process.
//!
//! A [`Region`] is the wire form: every field is optional so that malformed
//! input can be deserialized and then rejected by the validator with a precise
//! message. Once validated, callers look at a region through [`RegionShape`],
//! which carries exactly the payload each kind needs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The six kinds of region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionType {
    #[serde(alias = "Task")]
    Task,
    #[serde(alias = "Sequential")]
    Sequential,
    #[serde(alias = "Parallel")]
    Parallel,
    #[serde(alias = "Choice")]
    Choice,
    #[serde(alias = "Nature")]
    Nature,
    #[serde(alias = "Loop")]
    Loop,
}

impl RegionType {
    pub fn name(self) -> &'static str {
        match self {
            RegionType::Task => "Task",
            RegionType::Sequential => "Sequential",
            RegionType::Parallel => "Parallel",
            RegionType::Choice => "Choice",
            RegionType::Nature => "Nature",
            RegionType::Loop => "Loop",
        }
    }
}

impl fmt::Display for RegionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Branch probabilities (choice/nature) or a loop-back probability (loop).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Distribution {
    Single(f64),
    Branches(Vec<f64>),
}

/// A node of the process-structure tree as it arrives on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: RegionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impacts: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Region>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution: Option<Distribution>,
    /// Maximum number of loop-backs (loop regions only). Read as a number so
    /// that negative or fractional bounds reach the validator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bound: Option<f64>,
}

/// Typed view of a well-formed region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegionShape<'a> {
    Task {
        impacts: &'a [f64],
    },
    Sequential {
        first: &'a Region,
        second: &'a Region,
    },
    Parallel {
        branches: &'a [Region],
    },
    Choice {
        branches: &'a [Region],
        distribution: Option<&'a [f64]>,
    },
    Nature {
        branches: &'a [Region],
        distribution: &'a [f64],
    },
    Loop {
        body: &'a Region,
        probability: f64,
        bound: u32,
    },
}

impl Region {
    /// Children as a slice; absent children read as empty.
    pub fn children(&self) -> &[Region] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// `bound` as a loop-back count, if it is a positive integer.
    pub fn loop_bound(&self) -> Option<u32> {
        self.bound
            .filter(|bound| {
                bound.is_finite()
                    && bound.fract() == 0.0
                    && *bound >= 1.0
                    && *bound <= f64::from(u32::MAX)
            })
            .map(|bound| bound as u32)
    }

    /// Return the typed view, or `None` when the fields do not fit the kind.
    ///
    /// This only checks what the view needs to be built; the full rule set
    /// lives in [`crate::core::validator`].
    pub fn shape(&self) -> Option<RegionShape<'_>> {
        let children = self.children();
        match self.kind {
            RegionType::Task => self
                .impacts
                .as_deref()
                .map(|impacts| RegionShape::Task { impacts }),
            RegionType::Sequential => match children {
                [first, second] => Some(RegionShape::Sequential { first, second }),
                _ => None,
            },
            RegionType::Parallel => (children.len() >= 2).then_some(RegionShape::Parallel {
                branches: children,
            }),
            RegionType::Choice => {
                let distribution = match &self.distribution {
                    None => None,
                    Some(Distribution::Branches(values)) => Some(values.as_slice()),
                    Some(Distribution::Single(_)) => return None,
                };
                (children.len() >= 2).then_some(RegionShape::Choice {
                    branches: children,
                    distribution,
                })
            }
            RegionType::Nature => match &self.distribution {
                Some(Distribution::Branches(values)) if children.len() >= 2 => {
                    Some(RegionShape::Nature {
                        branches: children,
                        distribution: values,
                    })
                }
                _ => None,
            },
            RegionType::Loop => match (children, &self.distribution, self.loop_bound()) {
                ([body], Some(Distribution::Single(probability)), Some(bound)) => {
                    Some(RegionShape::Loop {
                        body,
                        probability: *probability,
                        bound,
                    })
                }
                _ => None,
            },
        }
    }
}
