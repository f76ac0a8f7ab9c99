//! Ordinal execution: dwell times are charged, never waited for.

use crate::core::context::Context;
use crate::core::marking::TimeMarking;
use crate::core::net::{Net, Place, Transition, TransitionId};
use crate::core::resolver::{ChoiceResolver, DefaultChoiceResolver};
use crate::core::semantics::is_token_enabled;
use crate::core::strategy::{
    DEFAULT_MAX_ROUNDS, DecisionPoint, ExecutionError, ExecutionStrategy, Step, Timing,
    consume_with, decision_points, saturate_with,
};

/// Saturation is instantaneous: every fired transition adds the dwell time
/// of the places it consumed, including transitions fired side by side in
/// one round. Suited to enumerating the discrete state space.
#[derive(Debug, Clone)]
pub struct CounterExecution<R = DefaultChoiceResolver> {
    resolver: R,
    max_rounds: usize,
}

impl<R: ChoiceResolver> CounterExecution<R> {
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }
}

struct Ordinal;

impl Timing for Ordinal {
    fn is_enabled(&self, net: &Net, transition: &Transition, marking: &TimeMarking) -> bool {
        is_token_enabled(net, transition, marking)
    }

    fn dwell(&self, place: &Place) -> f64 {
        place.duration
    }

    fn advances_clock(&self) -> bool {
        false
    }
}

impl<R: ChoiceResolver> ExecutionStrategy for CounterExecution<R> {
    fn saturate(&self, context: &Context, marking: &TimeMarking) -> Result<Step, ExecutionError> {
        saturate_with(&Ordinal, context, marking, None, self.max_rounds)
    }

    fn consume(
        &mut self,
        context: &Context,
        marking: &TimeMarking,
        choices: &[TransitionId],
    ) -> Result<Step, ExecutionError> {
        consume_with(
            &Ordinal,
            &mut self.resolver,
            context,
            marking,
            choices,
            None,
            self.max_rounds,
        )
    }

    fn get_choices(&self, context: &Context, marking: &TimeMarking) -> Vec<DecisionPoint> {
        decision_points(&Ordinal, context, marking)
    }
}
