//! Time-stepped execution: places must dwell before their tokens move on.

use crate::core::context::Context;
use crate::core::marking::TimeMarking;
use crate::core::net::{Net, Place, Transition, TransitionId};
use crate::core::resolver::{ChoiceResolver, DefaultChoiceResolver};
use crate::core::semantics::is_enabled;
use crate::core::strategy::{
    DEFAULT_MAX_ROUNDS, DecisionPoint, ExecutionError, ExecutionStrategy, Step, Timing,
    consume_with, decision_points, saturate_with,
};

/// Advances simulated time by the smallest delta that enables something.
///
/// With a `time_step`, every saturate/consume call advances at most that much
/// time and reports the unused part in [`Step::remaining_budget`], which
/// drives fixed-increment playback.
#[derive(Debug, Clone)]
pub struct DurationExecution<R = DefaultChoiceResolver> {
    resolver: R,
    time_step: Option<f64>,
    max_rounds: usize,
}

impl<R: ChoiceResolver> DurationExecution<R> {
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            time_step: None,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    pub fn with_time_step(mut self, time_step: f64) -> Self {
        self.time_step = Some(time_step);
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn time_step(&self) -> Option<f64> {
        self.time_step
    }
}

struct Timed;

impl Timing for Timed {
    fn is_enabled(&self, net: &Net, transition: &Transition, marking: &TimeMarking) -> bool {
        is_enabled(net, transition, marking)
    }

    /// Dwell time is spent by advancing the clock, not charged on firing.
    fn dwell(&self, _place: &Place) -> f64 {
        0.0
    }

    fn advances_clock(&self) -> bool {
        true
    }
}

impl<R: ChoiceResolver> ExecutionStrategy for DurationExecution<R> {
    fn saturate(&self, context: &Context, marking: &TimeMarking) -> Result<Step, ExecutionError> {
        saturate_with(&Timed, context, marking, self.time_step, self.max_rounds)
    }

    fn consume(
        &mut self,
        context: &Context,
        marking: &TimeMarking,
        choices: &[TransitionId],
    ) -> Result<Step, ExecutionError> {
        consume_with(
            &Timed,
            &mut self.resolver,
            context,
            marking,
            choices,
            self.time_step,
            self.max_rounds,
        )
    }

    fn get_choices(&self, context: &Context, marking: &TimeMarking) -> Vec<DecisionPoint> {
        decision_points(&Timed, context, marking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{choice, parallel, sequential, task};

    fn strategy() -> DurationExecution {
        DurationExecution::new(DefaultChoiceResolver::seeded(5))
    }

    #[test]
    fn sequential_runs_to_completion_in_real_time() {
        let context = Context::new(&sequential(
            "s",
            task("a", 2.0, &[1.0]),
            task("b", 3.0, &[2.0]),
        ))
        .expect("context");
        let step = strategy()
            .consume(&context, context.initial_marking(), &[])
            .expect("consume");
        assert_eq!(step.impacts, vec![3.0]);
        assert_eq!(step.elapsed, 5.0);
        assert!(context.is_final(&step.marking));
    }

    /// Parallel branches wait concurrently: elapsed is the longer branch.
    #[test]
    fn parallel_branches_overlap() {
        let context = Context::new(&parallel(
            "p",
            vec![
                sequential("s", task("a", 1.0, &[1.0]), task("b", 1.0, &[1.0])),
                task("c", 3.0, &[1.0]),
            ],
        ))
        .expect("context");
        let step = strategy()
            .saturate(&context, context.initial_marking())
            .expect("saturate");
        assert_eq!(step.elapsed, 3.0);
        assert_eq!(step.impacts, vec![3.0]);
        assert!(context.is_final(&step.marking));
    }

    #[test]
    fn time_step_bounds_each_call() {
        let context = Context::new(&task("a", 5.0, &[1.0])).expect("context");
        let mut stepped = strategy().with_time_step(2.0);

        let first = stepped
            .consume(&context, context.initial_marking(), &[])
            .expect("first increment");
        assert_eq!(first.elapsed, 2.0);
        assert_eq!(first.remaining_budget, Some(0.0));
        assert!(!context.is_final(&first.marking));
        let entry = context.regions().root().expect("root").entry;
        assert_eq!(first.marking.state(entry).age, 2.0);

        let second = stepped
            .consume(&context, &first.marking, &[])
            .expect("second increment");
        let third = stepped
            .consume(&context, &second.marking, &[])
            .expect("third increment");
        assert_eq!(third.elapsed, 1.0);
        assert_eq!(third.remaining_budget, Some(1.0));
        assert!(context.is_final(&third.marking));
    }

    /// A decision waits for its place's dwell time before it opens.
    #[test]
    fn decision_opens_after_dwell() {
        let mut region = choice(
            "c",
            vec![task("a", 0.0, &[1.0]), task("b", 0.0, &[1.0])],
            None,
        );
        region.duration = 4.0;
        let context = Context::new(&region).expect("context");
        let timed = strategy();
        assert!(timed.get_choices(&context, context.initial_marking()).is_empty());

        let step = timed
            .saturate(&context, context.initial_marking())
            .expect("saturate");
        assert_eq!(step.elapsed, 4.0);
        assert_eq!(timed.get_choices(&context, &step.marking).len(), 1);
    }
}
