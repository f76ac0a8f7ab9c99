//! Timed Petri net produced by the compiler.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::region::RegionType;

pub type Weight = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaceId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransitionId(pub u32);

impl fmt::Display for PlaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

impl fmt::Display for TransitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// A resource held for at least `duration` before a consumer may fire.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub id: PlaceId,
    pub entry_region_id: Option<String>,
    pub exit_region_id: Option<String>,
    pub duration: f64,
    pub impacts: Option<Vec<f64>>,
    /// Consumption count after which a loop-back reading this place is disabled.
    pub visit_limit: Option<u32>,
}

/// What a transition does within its region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionRole {
    Task,
    Fork,
    Join,
    BranchEntry,
    BranchExit,
    LoopEntry,
    LoopBack,
    LoopExit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub id: TransitionId,
    pub label: String,
    pub region_id: String,
    pub region_type: RegionType,
    pub role: TransitionRole,
    pub probability: f64,
    /// Decision point: never fired by saturation.
    pub stop: bool,
    /// Child index a branch entry leads into.
    pub branch: Option<usize>,
    pub preset: Vec<(PlaceId, Weight)>,
    pub postset: Vec<(PlaceId, Weight)>,
    /// Places whose visit count restarts when this transition fires: the
    /// body of the loop a loop-back re-enters.
    pub reset_visits: Vec<PlaceId>,
}

impl Transition {
    /// The place a decision transition is resolved at.
    pub fn decision_place(&self) -> Option<PlaceId> {
        self.preset.first().map(|(place, _)| *place)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ArcEnd {
    Place(PlaceId),
    Transition(TransitionId),
}

impl fmt::Display for ArcEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArcEnd::Place(id) => id.fmt(f),
            ArcEnd::Transition(id) => id.fmt(f),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arc {
    pub source: ArcEnd,
    pub target: ArcEnd,
    pub weight: Weight,
}

/// Places and transitions keyed by id. Arcs are derived from transition
/// presets/postsets so there is a single source of truth for topology.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Net {
    places: BTreeMap<PlaceId, Place>,
    transitions: BTreeMap<TransitionId, Transition>,
}

impl Net {
    pub fn place(&self, id: PlaceId) -> Option<&Place> {
        self.places.get(&id)
    }

    pub fn transition(&self, id: TransitionId) -> Option<&Transition> {
        self.transitions.get(&id)
    }

    pub fn places(&self) -> impl Iterator<Item = &Place> {
        self.places.values()
    }

    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.values()
    }

    pub fn place_count(&self) -> usize {
        self.places.len()
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    /// Transitions consuming from `place`.
    pub fn outgoing(&self, place: PlaceId) -> impl Iterator<Item = &Transition> {
        self.transitions
            .values()
            .filter(move |transition| transition.preset.iter().any(|(id, _)| *id == place))
    }

    /// Every arc, inputs of a transition before its outputs, in transition order.
    pub fn arcs(&self) -> Vec<Arc> {
        let mut arcs = Vec::new();
        for transition in self.transitions.values() {
            for (place, weight) in &transition.preset {
                arcs.push(Arc {
                    source: ArcEnd::Place(*place),
                    target: ArcEnd::Transition(transition.id),
                    weight: *weight,
                });
            }
            for (place, weight) in &transition.postset {
                arcs.push(Arc {
                    source: ArcEnd::Transition(transition.id),
                    target: ArcEnd::Place(*place),
                    weight: *weight,
                });
            }
        }
        arcs
    }

    pub(crate) fn insert_place(&mut self, place: Place) {
        self.places.insert(place.id, place);
    }

    pub(crate) fn insert_transition(&mut self, transition: Transition) {
        self.transitions.insert(transition.id, transition);
    }

    pub(crate) fn place_mut(&mut self, id: PlaceId) -> Option<&mut Place> {
        self.places.get_mut(&id)
    }

    pub(crate) fn transition_mut(&mut self, id: TransitionId) -> Option<&mut Transition> {
        self.transitions.get_mut(&id)
    }
}
