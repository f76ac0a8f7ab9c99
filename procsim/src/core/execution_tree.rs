//! Append-only record of explored states.
//!
//! Nodes live in a flat arena and refer to each other by index, so exploring
//! a what-if branch only moves the cursor. A node's snapshot is cumulative:
//! probability, impacts and time are composed with every ancestor's.

use std::collections::BTreeMap;

use tracing::debug;

use crate::core::context::Context;
use crate::core::marking::{PartialMarking, TimeMarking};
use crate::core::status::{ActivityState, region_status};
use crate::core::strategy::Step;

pub type NodeId = usize;

/// Cumulative state of the process at one tree node.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub marking: TimeMarking,
    pub probability: f64,
    pub impacts: Vec<f64>,
    pub time: f64,
    pub region_status: BTreeMap<String, ActivityState>,
}

impl Snapshot {
    /// Snapshot of the context's initial marking: probability 1, nothing spent.
    pub fn initial(context: &Context) -> Self {
        let marking = context.initial_marking().clone();
        Self {
            region_status: region_status(context, &marking),
            marking,
            probability: 1.0,
            impacts: vec![0.0; context.impact_dimensions()],
            time: 0.0,
        }
    }

    /// Compose a local step onto this (parent) snapshot.
    fn child(&self, context: &Context, step: &Step) -> Self {
        let len = self.impacts.len().max(step.impacts.len());
        let impacts = (0..len)
            .map(|i| {
                self.impacts.get(i).copied().unwrap_or(0.0)
                    + step.impacts.get(i).copied().unwrap_or(0.0)
            })
            .collect();
        Self {
            marking: step.marking.clone(),
            probability: self.probability * step.probability,
            impacts,
            time: self.time + step.elapsed,
            region_status: region_status(context, &step.marking),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub snapshot: Snapshot,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionTree {
    nodes: Vec<TreeNode>,
    current: NodeId,
}

impl ExecutionTree {
    /// Tree with a single root node (id 0) as the current node.
    pub fn new(root: Snapshot) -> Self {
        Self {
            nodes: vec![TreeNode {
                id: 0,
                parent: None,
                children: Vec::new(),
                snapshot: root,
            }],
            current: 0,
        }
    }

    pub fn from_context(context: &Context) -> Self {
        Self::new(Snapshot::initial(context))
    }

    /// Record `step` as a child of the current node.
    ///
    /// - A current node at the final marking absorbs the step unchanged.
    /// - A child of the current node with the same marking is reused.
    /// - Otherwise a new node is created with cumulative values.
    pub fn add_snapshot(&mut self, context: &Context, step: &Step, set_as_current: bool) -> NodeId {
        let current = &self.nodes[self.current];
        if context.is_final(&current.snapshot.marking) {
            return current.id;
        }

        if let Some(existing) = current
            .children
            .iter()
            .copied()
            .find(|child| self.nodes[*child].snapshot.marking == step.marking)
        {
            debug!(node = existing, "snapshot coalesced with existing node");
            if set_as_current {
                self.current = existing;
            }
            return existing;
        }

        let id = self.nodes.len();
        let parent = self.current;
        let snapshot = self.nodes[parent].snapshot.child(context, step);
        self.nodes.push(TreeNode {
            id,
            parent: Some(parent),
            children: Vec::new(),
            snapshot,
        });
        self.nodes[parent].children.push(id);
        debug!(node = id, parent, "snapshot added");
        if set_as_current {
            self.current = id;
        }
        id
    }

    /// Move the cursor; `false` (cursor unchanged) for unknown ids.
    pub fn set_current(&mut self, id: NodeId) -> bool {
        if id >= self.nodes.len() {
            return false;
        }
        self.current = id;
        true
    }

    pub fn current_id(&self) -> NodeId {
        self.current
    }

    pub fn current(&self) -> &TreeNode {
        &self.nodes[self.current]
    }

    pub fn root(&self) -> &TreeNode {
        &self.nodes[0]
    }

    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    /// Child ids of `id`; empty for unknown ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ids of every node whose marking agrees with `partial`.
    pub fn search_nodes_by_marking(&self, partial: &PartialMarking) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|node| node.snapshot.marking.matches(partial))
            .map(|node| node.id)
            .collect()
    }

    /// Root-to-node ids, for backtracking.
    pub fn path_to(&self, id: NodeId) -> Option<Vec<NodeId>> {
        let mut path = vec![self.nodes.get(id)?.id];
        let mut cursor = self.nodes[id].parent;
        while let Some(parent) = cursor {
            path.push(parent);
            cursor = self.nodes[parent].parent;
        }
        path.reverse();
        Some(path)
    }
}
