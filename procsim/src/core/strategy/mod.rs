//! Saturate/consume over timed markings.
//!
//! Both strategies share one algorithm and differ in how time enters it:
//! - [`CounterExecution`] ignores dwell time when enabling and charges the
//!   dwell of every place it consumed, so concurrent branches add up.
//! - [`DurationExecution`] requires places to have dwelt, advancing simulated
//!   time to the next enabling instant (optionally within a per-call budget).

mod counter;
mod duration;

pub use counter::CounterExecution;
pub use duration::DurationExecution;

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, warn};

use crate::core::context::Context;
use crate::core::marking::TimeMarking;
use crate::core::net::{Net, Place, PlaceId, Transition, TransitionId};
use crate::core::resolver::ChoiceResolver;
use crate::core::semantics::{self, add_time, fire};

/// Saturation rounds allowed before giving up.
pub const DEFAULT_MAX_ROUNDS: usize = 10_000;

/// Errors raised by [`ExecutionStrategy::consume`] and
/// [`ExecutionStrategy::saturate`]. Nothing fires when one is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutionError {
    #[error("transition {0} does not exist")]
    UnknownTransition(TransitionId),
    #[error("transition {transition} is not an enabled decision in the current marking")]
    InvalidChoice { transition: TransitionId },
    #[error("transitions {first} and {second} both resolve decision place {place}")]
    ConflictingChoices {
        place: PlaceId,
        first: TransitionId,
        second: TransitionId,
    },
    #[error("saturation did not settle within {limit} rounds")]
    MaxIterations { limit: usize },
}

/// Outcome of one saturate/consume call.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub marking: TimeMarking,
    /// Product of the probabilities of every fired transition.
    pub probability: f64,
    /// Elementwise sum of the impacts of every consumed place.
    pub impacts: Vec<f64>,
    pub elapsed: f64,
    /// Unused part of the time budget (duration strategy with a time step).
    pub remaining_budget: Option<f64>,
}

impl Step {
    /// No firing, no time: the neutral element of [`Step::then`].
    pub fn identity(marking: TimeMarking, impact_dimensions: usize) -> Self {
        Self {
            marking,
            probability: 1.0,
            impacts: vec![0.0; impact_dimensions],
            elapsed: 0.0,
            remaining_budget: None,
        }
    }

    /// Compose with a step taken from this step's marking.
    pub fn then(self, next: Step) -> Step {
        let impacts = add_impacts(&self.impacts, &next.impacts);
        Step {
            marking: next.marking,
            probability: self.probability * next.probability,
            impacts,
            elapsed: self.elapsed + next.elapsed,
            remaining_budget: next.remaining_budget,
        }
    }
}

/// An open decision place and the stop transitions enabled there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionPoint {
    pub place: PlaceId,
    pub transitions: Vec<TransitionId>,
}

pub trait ExecutionStrategy {
    /// Fire every automatic transition until a decision point or a deadlock.
    fn saturate(&self, context: &Context, marking: &TimeMarking) -> Result<Step, ExecutionError>;

    /// Fire the caller's choices plus defaults for every other open decision,
    /// then saturate.
    fn consume(
        &mut self,
        context: &Context,
        marking: &TimeMarking,
        choices: &[TransitionId],
    ) -> Result<Step, ExecutionError>;

    /// Open decision places in `marking`.
    fn get_choices(&self, context: &Context, marking: &TimeMarking) -> Vec<DecisionPoint>;
}

/// How a strategy lets time into the shared algorithm.
pub(crate) trait Timing {
    fn is_enabled(&self, net: &Net, transition: &Transition, marking: &TimeMarking) -> bool;

    /// Time charged for consuming from `place` when firing.
    fn dwell(&self, place: &Place) -> f64;

    /// Whether saturation may advance the clock to reach the next enabling.
    fn advances_clock(&self) -> bool;
}

pub(crate) fn decision_points<T: Timing>(
    timing: &T,
    context: &Context,
    marking: &TimeMarking,
) -> Vec<DecisionPoint> {
    let net = context.net();
    let mut open: BTreeMap<PlaceId, Vec<TransitionId>> = BTreeMap::new();
    for transition in net.transitions() {
        if !transition.stop || !timing.is_enabled(net, transition, marking) {
            continue;
        }
        if let Some(place) = transition.decision_place() {
            open.entry(place).or_default().push(transition.id);
        }
    }
    open.into_iter()
        .map(|(place, transitions)| DecisionPoint { place, transitions })
        .collect()
}

pub(crate) fn saturate_with<T: Timing>(
    timing: &T,
    context: &Context,
    marking: &TimeMarking,
    mut budget: Option<f64>,
    max_rounds: usize,
) -> Result<Step, ExecutionError> {
    let net = context.net();
    let mut step = Step::identity(marking.clone(), context.impact_dimensions());

    for _ in 0..max_rounds {
        let enabled: Vec<&Transition> = net
            .transitions()
            .filter(|transition| timing.is_enabled(net, transition, &step.marking))
            .collect();

        if enabled.iter().any(|transition| transition.stop) {
            step.remaining_budget = budget;
            return Ok(step);
        }

        if enabled.is_empty() {
            let Some(wait) = next_wait(timing, net, &step.marking) else {
                step.remaining_budget = budget;
                return Ok(step);
            };
            let dt = budget.map_or(wait, |left| wait.min(left));
            if dt <= 0.0 {
                step.remaining_budget = budget;
                return Ok(step);
            }
            step.marking = add_time(&step.marking, dt);
            step.elapsed += dt;
            budget = budget.map(|left| left - dt);
            continue;
        }

        step = fire_round(timing, net, step, &enabled);
    }

    warn!(limit = max_rounds, "saturation round limit reached");
    Err(ExecutionError::MaxIterations { limit: max_rounds })
}

pub(crate) fn consume_with<T: Timing, R: ChoiceResolver + ?Sized>(
    timing: &T,
    resolver: &mut R,
    context: &Context,
    marking: &TimeMarking,
    choices: &[TransitionId],
    budget: Option<f64>,
    max_rounds: usize,
) -> Result<Step, ExecutionError> {
    let net = context.net();
    let open = decision_points(timing, context, marking);

    let mut selected: BTreeMap<PlaceId, TransitionId> = BTreeMap::new();
    for &choice in choices {
        if net.transition(choice).is_none() {
            return Err(ExecutionError::UnknownTransition(choice));
        }
        let point = open
            .iter()
            .find(|point| point.transitions.contains(&choice))
            .ok_or(ExecutionError::InvalidChoice { transition: choice })?;
        match selected.get(&point.place) {
            Some(&first) if first != choice => {
                return Err(ExecutionError::ConflictingChoices {
                    place: point.place,
                    first,
                    second: choice,
                });
            }
            _ => {
                selected.insert(point.place, choice);
            }
        }
    }

    for point in &open {
        if selected.contains_key(&point.place) {
            continue;
        }
        match resolver.default_transition(context, point.place, marking) {
            Some(transition) if point.transitions.contains(&transition) => {
                debug!(place = %point.place, %transition, "resolved default choice");
                selected.insert(point.place, transition);
            }
            other => {
                warn!(place = %point.place, resolved = ?other, "no usable default for decision place");
            }
        }
    }

    let fired: Vec<&Transition> = selected
        .values()
        .filter_map(|id| net.transition(*id))
        .collect();
    let decided = fire_round(
        timing,
        net,
        Step::identity(marking.clone(), context.impact_dimensions()),
        &fired,
    );
    let rest = saturate_with(timing, context, &decided.marking, budget, max_rounds)?;
    Ok(decided.then(rest))
}

/// Fire a set of non-conflicting transitions as one round.
fn fire_round<T: Timing>(timing: &T, net: &Net, mut step: Step, fired: &[&Transition]) -> Step {
    for transition in fired {
        for (place_id, _) in &transition.preset {
            if let Some(place) = net.place(*place_id) {
                if let Some(impacts) = &place.impacts {
                    step.impacts = add_impacts(&step.impacts, impacts);
                }
                step.elapsed += timing.dwell(place);
            }
        }
        step.probability *= transition.probability;
        step.marking = fire(transition, &step.marking);
    }
    step
}

/// Smallest wait after which some token-enabled transition becomes enabled.
fn next_wait<T: Timing>(timing: &T, net: &Net, marking: &TimeMarking) -> Option<f64> {
    if !timing.advances_clock() {
        return None;
    }
    net.transitions()
        .filter(|transition| semantics::is_token_enabled(net, transition, marking))
        .map(|transition| semantics::remaining_wait(net, transition, marking))
        .filter(|wait| *wait > 0.0)
        .min_by(f64::total_cmp)
}

fn add_impacts(left: &[f64], right: &[f64]) -> Vec<f64> {
    let len = left.len().max(right.len());
    (0..len)
        .map(|i| left.get(i).copied().unwrap_or(0.0) + right.get(i).copied().unwrap_or(0.0))
        .collect()
}
