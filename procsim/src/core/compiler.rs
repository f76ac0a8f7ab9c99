//! Region tree → timed Petri net.
//!
//! Every region is compiled against an entry place handed down by its parent
//! and returns its exit place. A region adds its own duration to the dwell
//! time of its entry place, so a sequential region and its first child share
//! one place. Place and transition ids come from a single counter owned by
//! the compile call.

use std::collections::HashMap;

use tracing::debug;

use crate::core::marking::TimeMarking;
use crate::core::net::{Net, Place, PlaceId, Transition, TransitionId, TransitionRole};
use crate::core::region::{Region, RegionShape, RegionType};
use crate::core::validator::{ValidationError, validate};

/// Compilation result: the net, its boundary markings and the region index.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledNet {
    pub net: Net,
    pub initial_marking: TimeMarking,
    pub final_marking: TimeMarking,
    pub regions: RegionIndex,
    /// Length of every impact vector in the net.
    pub impact_dimensions: usize,
}

/// Where a region sits in the tree and in the net.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionInfo {
    pub id: String,
    pub kind: RegionType,
    pub label: String,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub entry: PlaceId,
    pub exit: PlaceId,
}

/// Regions in document order; index 0 is the root.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionIndex {
    regions: Vec<RegionInfo>,
    by_id: HashMap<String, usize>,
}

impl RegionIndex {
    pub fn root(&self) -> Option<&RegionInfo> {
        self.regions.first()
    }

    pub fn get(&self, index: usize) -> Option<&RegionInfo> {
        self.regions.get(index)
    }

    pub fn by_id(&self, id: &str) -> Option<&RegionInfo> {
        self.by_id.get(id).and_then(|index| self.regions.get(*index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegionInfo> {
        self.regions.iter()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    fn push(&mut self, info: RegionInfo) -> usize {
        let index = self.regions.len();
        if let Some(parent) = info.parent {
            self.regions[parent].children.push(index);
        }
        self.by_id.insert(info.id.clone(), index);
        self.regions.push(info);
        index
    }
}

/// Monotonic id source shared by places and transitions.
#[derive(Debug, Default)]
pub struct IdCounter {
    next: u32,
}

impl IdCounter {
    pub fn next_id(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Per-kind counters for generated labels (`"Task 1"`, `"Choice 2"`, ...).
#[derive(Debug, Default)]
pub struct LabelCounter {
    counts: HashMap<RegionType, u32>,
}

impl LabelCounter {
    pub fn label_for(&mut self, region: &Region) -> String {
        if let Some(label) = region.label.as_ref().filter(|label| !label.trim().is_empty()) {
            return label.clone();
        }
        let count = self.counts.entry(region.kind).or_insert(0);
        *count += 1;
        format!("{} {}", region.kind, count)
    }
}

/// Validate `region` and compile it. No net is produced for invalid input.
pub fn compile(region: &Region) -> Result<CompiledNet, ValidationError> {
    validate(region)?;

    let mut builder = NetBuilder::default();
    let entry = builder.add_place();
    let exit = builder.region(region, entry, None)?;

    let NetBuilder {
        net,
        regions,
        impact_dimensions,
        ..
    } = builder;
    let initial_marking = TimeMarking::with_tokens(&net, &[(entry, 1)]);
    let final_marking = TimeMarking::with_tokens(&net, &[(exit, 1)]);
    debug!(
        root = %region.id,
        places = net.place_count(),
        transitions = net.transition_count(),
        "compiled region"
    );
    Ok(CompiledNet {
        net,
        initial_marking,
        final_marking,
        regions,
        impact_dimensions: impact_dimensions.unwrap_or(0),
    })
}

#[derive(Default)]
struct NetBuilder {
    net: Net,
    ids: IdCounter,
    labels: LabelCounter,
    regions: RegionIndex,
    impact_dimensions: Option<usize>,
}

struct TransitionSpec<'a> {
    label: String,
    region: &'a Region,
    role: TransitionRole,
    probability: f64,
    stop: bool,
    branch: Option<usize>,
}

impl NetBuilder {
    fn region(
        &mut self,
        region: &Region,
        entry: PlaceId,
        parent: Option<usize>,
    ) -> Result<PlaceId, ValidationError> {
        let shape = region.shape().ok_or_else(|| ValidationError::Malformed {
            id: region.id.clone(),
            kind: region.kind,
        })?;
        let label = self.labels.label_for(region);
        let index = self.regions.push(RegionInfo {
            id: region.id.clone(),
            kind: region.kind,
            label: label.clone(),
            parent,
            children: Vec::new(),
            entry,
            exit: entry,
        });
        if let Some(place) = self.net.place_mut(entry) {
            place.duration += region.duration;
            place.entry_region_id = Some(region.id.clone());
        }

        let exit = match shape {
            RegionShape::Task { impacts } => {
                self.impact_dimensions.get_or_insert(impacts.len());
                if let Some(place) = self.net.place_mut(entry) {
                    place.impacts = Some(impacts.to_vec());
                }
                let exit = self.add_place();
                self.add_transition(
                    TransitionSpec {
                        label,
                        region,
                        role: TransitionRole::Task,
                        probability: 1.0,
                        stop: false,
                        branch: None,
                    },
                    &[entry],
                    &[exit],
                );
                exit
            }
            RegionShape::Sequential { first, second } => {
                let middle = self.region(first, entry, Some(index))?;
                self.region(second, middle, Some(index))?
            }
            RegionShape::Parallel { branches } => {
                let branch_entries: Vec<PlaceId> =
                    branches.iter().map(|_| self.add_place()).collect();
                self.add_transition(
                    TransitionSpec {
                        label: format!("Fork {label}"),
                        region,
                        role: TransitionRole::Fork,
                        probability: 1.0,
                        stop: false,
                        branch: None,
                    },
                    &[entry],
                    &branch_entries,
                );
                let mut branch_exits = Vec::with_capacity(branches.len());
                for (branch, branch_entry) in branches.iter().zip(branch_entries) {
                    branch_exits.push(self.region(branch, branch_entry, Some(index))?);
                }
                let exit = self.add_place();
                self.add_transition(
                    TransitionSpec {
                        label: format!("Join {label}"),
                        region,
                        role: TransitionRole::Join,
                        probability: 1.0,
                        stop: false,
                        branch: None,
                    },
                    &branch_exits,
                    &[exit],
                );
                exit
            }
            RegionShape::Choice {
                branches,
                distribution,
            } => self.branches(region, &label, index, entry, branches, |i| {
                distribution.and_then(|values| values.get(i).copied()).unwrap_or(1.0)
            })?,
            RegionShape::Nature {
                branches,
                distribution,
            } => self.branches(region, &label, index, entry, branches, |i| {
                distribution.get(i).copied().unwrap_or(0.0)
            })?,
            RegionShape::Loop {
                body,
                probability,
                bound,
            } => {
                let body_entry = self.add_place();
                self.add_transition(
                    TransitionSpec {
                        label: format!("Entry {label}"),
                        region,
                        role: TransitionRole::LoopEntry,
                        probability: 1.0,
                        stop: false,
                        branch: None,
                    },
                    &[entry],
                    &[body_entry],
                );
                let body_exit = self.region(body, body_entry, Some(index))?;
                if let Some(place) = self.net.place_mut(body_exit) {
                    place.visit_limit = Some(bound);
                }
                // Every place the body created, minus the exit that counts loop-backs.
                let body_places: Vec<PlaceId> = self
                    .net
                    .places()
                    .map(|place| place.id)
                    .filter(|id| id.0 >= body_entry.0 && *id != body_exit)
                    .collect();
                let exit = self.add_place();
                let back = self.add_transition(
                    TransitionSpec {
                        label: format!("Loop {label}"),
                        region,
                        role: TransitionRole::LoopBack,
                        probability,
                        stop: true,
                        branch: None,
                    },
                    &[body_exit],
                    &[body_entry],
                );
                if let Some(transition) = self.net.transition_mut(back) {
                    transition.reset_visits = body_places;
                }
                self.add_transition(
                    TransitionSpec {
                        label: format!("Exit {label}"),
                        region,
                        role: TransitionRole::LoopExit,
                        probability: 1.0 - probability,
                        stop: true,
                        branch: None,
                    },
                    &[body_exit],
                    &[exit],
                );
                exit
            }
        };

        if let Some(place) = self.net.place_mut(exit) {
            place.exit_region_id = Some(region.id.clone());
        }
        if let Some(info) = self.regions.regions.get_mut(index) {
            info.exit = exit;
        }
        Ok(exit)
    }

    /// Shared wiring of choice and nature: one decision per branch, merged
    /// into a common exit place.
    fn branches(
        &mut self,
        region: &Region,
        label: &str,
        index: usize,
        entry: PlaceId,
        branches: &[Region],
        probability: impl Fn(usize) -> f64,
    ) -> Result<PlaceId, ValidationError> {
        let exit = self.add_place();
        for (i, branch) in branches.iter().enumerate() {
            let branch_entry = self.add_place();
            self.add_transition(
                TransitionSpec {
                    label: branch.label.clone().unwrap_or_else(|| branch.id.clone()),
                    region,
                    role: TransitionRole::BranchEntry,
                    probability: probability(i),
                    stop: true,
                    branch: Some(i),
                },
                &[entry],
                &[branch_entry],
            );
            let branch_exit = self.region(branch, branch_entry, Some(index))?;
            self.add_transition(
                TransitionSpec {
                    label: format!("Merge {label}"),
                    region,
                    role: TransitionRole::BranchExit,
                    probability: 1.0,
                    stop: false,
                    branch: Some(i),
                },
                &[branch_exit],
                &[exit],
            );
        }
        Ok(exit)
    }

    fn add_place(&mut self) -> PlaceId {
        let id = PlaceId(self.ids.next_id());
        self.net.insert_place(Place {
            id,
            entry_region_id: None,
            exit_region_id: None,
            duration: 0.0,
            impacts: None,
            visit_limit: None,
        });
        id
    }

    fn add_transition(
        &mut self,
        spec: TransitionSpec<'_>,
        inputs: &[PlaceId],
        outputs: &[PlaceId],
    ) -> TransitionId {
        let id = TransitionId(self.ids.next_id());
        self.net.insert_transition(Transition {
            id,
            label: spec.label,
            region_id: spec.region.id.clone(),
            region_type: spec.region.kind,
            role: spec.role,
            probability: spec.probability,
            stop: spec.stop,
            branch: spec.branch,
            preset: inputs.iter().map(|place| (*place, 1)).collect(),
            postset: outputs.iter().map(|place| (*place, 1)).collect(),
            reset_visits: Vec::new(),
        });
        id
    }
}
