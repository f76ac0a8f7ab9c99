//! Compiled simulation context shared by strategies and the execution tree.

use crate::core::compiler::{CompiledNet, RegionIndex, compile};
use crate::core::marking::TimeMarking;
use crate::core::net::Net;
use crate::core::region::Region;
use crate::core::validator::ValidationError;

/// One compiled region: net, boundary markings and region index.
///
/// Created once per simulation session and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    compiled: CompiledNet,
}

impl Context {
    pub fn new(region: &Region) -> Result<Self, ValidationError> {
        compile(region).map(Self::from_compiled)
    }

    pub fn from_compiled(compiled: CompiledNet) -> Self {
        Self { compiled }
    }

    pub fn net(&self) -> &Net {
        &self.compiled.net
    }

    pub fn initial_marking(&self) -> &TimeMarking {
        &self.compiled.initial_marking
    }

    pub fn final_marking(&self) -> &TimeMarking {
        &self.compiled.final_marking
    }

    pub fn regions(&self) -> &RegionIndex {
        &self.compiled.regions
    }

    pub fn impact_dimensions(&self) -> usize {
        self.compiled.impact_dimensions
    }

    /// The final marking is compared on tokens: ages and visit counts depend
    /// on the path taken.
    pub fn is_final(&self, marking: &TimeMarking) -> bool {
        marking.same_tokens(&self.compiled.final_marking)
    }
}
