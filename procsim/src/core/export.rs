//! Serializable views of the net and the execution tree.
//!
//! Views are plain data for JSON output; nothing in the simulator reads
//! them back.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::context::Context;
use crate::core::execution_tree::{ExecutionTree, NodeId, TreeNode};
use crate::core::marking::{PlaceState, TimeMarking};
use crate::core::net::{Place, Transition, TransitionRole};
use crate::core::region::RegionType;
use crate::core::status::ActivityState;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetView {
    pub name: String,
    pub places: Vec<PlaceView>,
    pub transitions: Vec<TransitionView>,
    pub arcs: Vec<ArcView>,
    pub initial_marking: Vec<PlaceMarkingView>,
    pub final_marking: Vec<PlaceMarkingView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceView {
    pub id: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_region_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_region_id: Option<String>,
    pub duration: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impacts: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visit_limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionView {
    pub id: String,
    pub label: String,
    pub region_id: String,
    pub region_type: RegionType,
    pub role: TransitionRole,
    pub probability: f64,
    pub stop: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArcView {
    pub source: String,
    pub target: String,
    pub weight: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceMarkingView {
    pub place: String,
    #[serde(flatten)]
    pub state: PlaceState,
}

impl NetView {
    pub fn from_context(context: &Context, name: &str) -> Self {
        let net = context.net();
        Self {
            name: name.to_string(),
            places: net.places().map(place_view).collect(),
            transitions: net.transitions().map(transition_view).collect(),
            arcs: net
                .arcs()
                .into_iter()
                .map(|arc| ArcView {
                    source: arc.source.to_string(),
                    target: arc.target.to_string(),
                    weight: arc.weight,
                })
                .collect(),
            initial_marking: marking_view(context.initial_marking()),
            final_marking: marking_view(context.final_marking()),
        }
    }
}

fn place_view(place: &Place) -> PlaceView {
    let label = match (&place.entry_region_id, &place.exit_region_id) {
        (Some(entry), Some(exit)) => format!("{exit} / {entry}"),
        (Some(entry), None) => format!("before {entry}"),
        (None, Some(exit)) => format!("after {exit}"),
        (None, None) => place.id.to_string(),
    };
    PlaceView {
        id: place.id.to_string(),
        label,
        entry_region_id: place.entry_region_id.clone(),
        exit_region_id: place.exit_region_id.clone(),
        duration: place.duration,
        impacts: place.impacts.clone(),
        visit_limit: place.visit_limit,
    }
}

fn transition_view(transition: &Transition) -> TransitionView {
    TransitionView {
        id: transition.id.to_string(),
        label: transition.label.clone(),
        region_id: transition.region_id.clone(),
        region_type: transition.region_type,
        role: transition.role,
        probability: transition.probability,
        stop: transition.stop,
    }
}

/// Marked places only; an empty place carries no information for readers.
fn marking_view(marking: &TimeMarking) -> Vec<PlaceMarkingView> {
    marking
        .iter()
        .filter(|(_, state)| state.tokens > 0 || state.visit_count > 0)
        .map(|(place, state)| PlaceMarkingView {
            place: place.to_string(),
            state: *state,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeView {
    pub root: NodeView,
    pub current_node: NodeId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeView {
    pub name: String,
    pub id: NodeId,
    pub snapshot: SnapshotView,
    pub children: Vec<NodeView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotView {
    pub marking: Vec<PlaceMarkingView>,
    pub probability: f64,
    pub impacts: Vec<f64>,
    pub execution_time: f64,
    pub region_status: BTreeMap<String, ActivityState>,
}

impl TreeView {
    pub fn from_tree(tree: &ExecutionTree) -> Self {
        Self {
            root: node_view(tree, tree.root()),
            current_node: tree.current_id(),
        }
    }
}

fn node_view(tree: &ExecutionTree, node: &TreeNode) -> NodeView {
    let snapshot = &node.snapshot;
    NodeView {
        name: if node.parent.is_none() {
            "Root".to_string()
        } else {
            format!("Step {}", node.id)
        },
        id: node.id,
        snapshot: SnapshotView {
            marking: marking_view(&snapshot.marking),
            probability: snapshot.probability,
            impacts: snapshot.impacts.clone(),
            execution_time: snapshot.time,
            region_status: snapshot.region_status.clone(),
        },
        children: node
            .children
            .iter()
            .filter_map(|child| tree.get(*child))
            .map(|child| node_view(tree, child))
            .collect(),
    }
}
