//! Default resolution of decision points the caller left open.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::core::context::Context;
use crate::core::marking::TimeMarking;
use crate::core::net::{PlaceId, Transition, TransitionId, TransitionRole};
use crate::core::region::RegionType;
use crate::core::semantics::is_token_enabled;

/// Picks a transition for an open decision place.
pub trait ChoiceResolver {
    fn default_transition(
        &mut self,
        context: &Context,
        place: PlaceId,
        marking: &TimeMarking,
    ) -> Option<TransitionId>;
}

/// Choice → first child; nature → sampled by distribution; loop → exit once
/// the bound is reached, otherwise loop-back vs. exit sampled.
#[derive(Debug, Clone)]
pub struct DefaultChoiceResolver<R = StdRng> {
    rng: R,
}

impl DefaultChoiceResolver<StdRng> {
    /// Reproducible resolver.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> DefaultChoiceResolver<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> ChoiceResolver for DefaultChoiceResolver<R> {
    fn default_transition(
        &mut self,
        context: &Context,
        place: PlaceId,
        marking: &TimeMarking,
    ) -> Option<TransitionId> {
        let net = context.net();
        let candidates: Vec<&Transition> = net
            .outgoing(place)
            .filter(|transition| transition.stop && is_token_enabled(net, transition, marking))
            .collect();
        let first = candidates.first()?;

        match first.region_type {
            RegionType::Choice => candidates
                .iter()
                .min_by_key(|transition| transition.branch.unwrap_or(usize::MAX))
                .map(|transition| transition.id),
            RegionType::Nature => sample(&mut self.rng, &candidates),
            RegionType::Loop => {
                let exit = candidates
                    .iter()
                    .find(|transition| transition.role == TransitionRole::LoopExit);
                let back = candidates
                    .iter()
                    .find(|transition| transition.role == TransitionRole::LoopBack);
                let bound_reached = net
                    .place(place)
                    .and_then(|info| info.visit_limit)
                    .is_some_and(|limit| marking.state(place).visit_count >= limit);
                match (back, exit) {
                    (_, Some(exit)) if bound_reached => Some(exit.id),
                    (Some(back), Some(exit)) => {
                        if self.rng.gen_bool(back.probability.clamp(0.0, 1.0)) {
                            Some(back.id)
                        } else {
                            Some(exit.id)
                        }
                    }
                    (Some(only), None) | (None, Some(only)) => Some(only.id),
                    (None, None) => None,
                }
            }
            RegionType::Task | RegionType::Sequential | RegionType::Parallel => Some(first.id),
        }
    }
}

/// Pick one candidate with probability proportional to its transition probability.
fn sample<R: Rng>(rng: &mut R, candidates: &[&Transition]) -> Option<TransitionId> {
    let total: f64 = candidates
        .iter()
        .map(|transition| transition.probability.max(0.0))
        .sum();
    if total <= 0.0 {
        return candidates.first().map(|transition| transition.id);
    }
    let mut draw = rng.gen_range(0.0..total);
    for transition in candidates {
        let weight = transition.probability.max(0.0);
        if draw < weight {
            return Some(transition.id);
        }
        draw -= weight;
    }
    candidates.last().map(|transition| transition.id)
}
