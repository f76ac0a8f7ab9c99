//! Region activity derived from a marking.
//!
//! Tasks read their state from tokens and visit counts on their entry place;
//! composite regions derive theirs bottom-up from their children. Once a
//! choice or nature shows which branch ran, every other branch and its
//! subtree is `WillNotBeExecuted`. Visit counts restart on each loop-back, so
//! inside a loop only the current iteration is reflected.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::compiler::{RegionIndex, RegionInfo};
use crate::core::context::Context;
use crate::core::marking::TimeMarking;
use crate::core::region::RegionType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityState {
    Waiting,
    Active,
    Completed,
    /// Work is done but the token still waits on the exit place for a decision.
    CompletedWithoutPassingOver,
    WillNotBeExecuted,
}

impl ActivityState {
    pub fn is_done(self) -> bool {
        matches!(
            self,
            ActivityState::Completed | ActivityState::CompletedWithoutPassingOver
        )
    }

    pub fn has_started(self) -> bool {
        matches!(
            self,
            ActivityState::Active
                | ActivityState::Completed
                | ActivityState::CompletedWithoutPassingOver
        )
    }
}

/// State of every region in `context` for `marking`, keyed by region id.
pub fn region_status(context: &Context, marking: &TimeMarking) -> BTreeMap<String, ActivityState> {
    let mut status = BTreeMap::new();
    if !context.regions().is_empty() {
        Derivation {
            context,
            marking,
            status: &mut status,
        }
        .region(0);
    }
    status
}

struct Derivation<'a> {
    context: &'a Context,
    marking: &'a TimeMarking,
    status: &'a mut BTreeMap<String, ActivityState>,
}

impl Derivation<'_> {
    fn regions(&self) -> &RegionIndex {
        self.context.regions()
    }

    fn region(&mut self, index: usize) -> ActivityState {
        let Some(info) = self.regions().get(index).cloned() else {
            return ActivityState::Waiting;
        };
        let children: Vec<ActivityState> =
            info.children.iter().map(|child| self.region(*child)).collect();
        let entry_marked = self.marking.tokens(info.entry) > 0;

        let mut state = match info.kind {
            RegionType::Task => {
                if entry_marked {
                    ActivityState::Active
                } else if self.marking.state(info.entry).visit_count > 0 {
                    ActivityState::Completed
                } else {
                    ActivityState::Waiting
                }
            }
            RegionType::Sequential => match children.as_slice() {
                [_, second] if second.is_done() => *second,
                [first, second] if first.has_started() || second.has_started() => {
                    ActivityState::Active
                }
                _ => ActivityState::Waiting,
            },
            RegionType::Parallel => {
                if !children.is_empty() && children.iter().all(|child| child.is_done()) {
                    ActivityState::Completed
                } else if entry_marked || children.iter().any(|child| child.has_started()) {
                    ActivityState::Active
                } else {
                    ActivityState::Waiting
                }
            }
            RegionType::Choice | RegionType::Nature => {
                let taken = children
                    .iter()
                    .position(|child| *child == ActivityState::Active)
                    .or_else(|| children.iter().position(|child| child.has_started()));
                match taken {
                    Some(chosen) => {
                        self.skip_other_branches(&info, chosen);
                        if children[chosen].is_done() {
                            ActivityState::Completed
                        } else {
                            ActivityState::Active
                        }
                    }
                    None if entry_marked => ActivityState::Active,
                    None => ActivityState::Waiting,
                }
            }
            RegionType::Loop => {
                let body = children.first().copied().unwrap_or(ActivityState::Waiting);
                let decision_pending = info
                    .children
                    .first()
                    .and_then(|child| self.regions().get(*child))
                    .is_some_and(|body_info| self.marking.tokens(body_info.exit) > 0);
                if body.is_done() && !decision_pending {
                    ActivityState::Completed
                } else if body.has_started() || entry_marked || decision_pending {
                    ActivityState::Active
                } else {
                    ActivityState::Waiting
                }
            }
        };

        if state == ActivityState::Completed && self.awaits_decision(&info) {
            state = ActivityState::CompletedWithoutPassingOver;
        }
        self.status.insert(info.id.clone(), state);
        state
    }

    /// Token resting on the region's exit place in front of a decision.
    fn awaits_decision(&self, info: &RegionInfo) -> bool {
        self.marking.tokens(info.exit) > 0
            && self
                .context
                .net()
                .outgoing(info.exit)
                .any(|transition| transition.stop)
    }

    fn skip_other_branches(&mut self, info: &RegionInfo, chosen: usize) {
        for (position, child) in info.children.iter().enumerate() {
            if position != chosen {
                self.skip_subtree(*child);
            }
        }
    }

    fn skip_subtree(&mut self, index: usize) {
        let Some(info) = self.regions().get(index).cloned() else {
            return;
        };
        self.status
            .insert(info.id.clone(), ActivityState::WillNotBeExecuted);
        for child in &info.children {
            self.skip_subtree(*child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::resolver::DefaultChoiceResolver;
    use crate::core::strategy::{CounterExecution, ExecutionStrategy};
    use crate::core::net::{TransitionId, TransitionRole};
    use crate::test_support::{choice, loop_region, nature, parallel, sequential, task};

    fn counter() -> CounterExecution {
        CounterExecution::new(DefaultChoiceResolver::seeded(0))
    }

    fn transition(context: &Context, role: TransitionRole, branch: Option<usize>) -> TransitionId {
        context
            .net()
            .transitions()
            .find(|t| t.role == role && t.branch == branch)
            .map(|t| t.id)
            .expect("transition")
    }

    #[test]
    fn initial_marking_activates_root_task() {
        let context = Context::new(&sequential(
            "s",
            task("a", 1.0, &[1.0]),
            task("b", 1.0, &[1.0]),
        ))
        .expect("context");
        let status = region_status(&context, context.initial_marking());
        assert_eq!(status["a"], ActivityState::Active);
        assert_eq!(status["b"], ActivityState::Waiting);
        assert_eq!(status["s"], ActivityState::Active);
    }

    #[test]
    fn final_marking_completes_everything_on_path() {
        let context = Context::new(&parallel(
            "p",
            vec![task("a", 1.0, &[1.0]), task("b", 2.0, &[1.0])],
        ))
        .expect("context");
        let step = counter()
            .saturate(&context, context.initial_marking())
            .expect("saturate");
        let status = region_status(&context, &step.marking);
        assert!(status.values().all(|state| *state == ActivityState::Completed));
    }

    /// After the gateway resolves, the other branch and its subtree are skipped.
    #[test]
    fn unchosen_branches_will_not_be_executed() {
        let context = Context::new(&sequential(
            "s",
            choice(
                "c",
                vec![
                    task("a", 1.0, &[1.0]),
                    sequential("other", task("b", 1.0, &[1.0]), task("d", 1.0, &[1.0])),
                ],
                None,
            ),
            task("e", 1.0, &[1.0]),
        ))
        .expect("context");
        let before = region_status(&context, context.initial_marking());
        assert_eq!(before["c"], ActivityState::Active);
        assert_eq!(before["other"], ActivityState::Waiting);

        let step = counter()
            .consume(&context, context.initial_marking(), &[])
            .expect("consume");
        let after = region_status(&context, &step.marking);
        assert_eq!(after["a"], ActivityState::Completed);
        assert_eq!(after["c"], ActivityState::Completed);
        for skipped in ["other", "b", "d"] {
            assert_eq!(after[skipped], ActivityState::WillNotBeExecuted, "{skipped}");
        }
        assert_eq!(after["e"], ActivityState::Completed);
        assert_eq!(after["s"], ActivityState::Completed);
    }

    /// A finished loop body waiting on the loop decision has not passed over.
    #[test]
    fn loop_body_waits_before_decision() {
        let context =
            Context::new(&loop_region("l", task("a", 1.0, &[1.0]), 0.5, 2)).expect("context");
        let step = counter()
            .saturate(&context, context.initial_marking())
            .expect("saturate");
        let status = region_status(&context, &step.marking);
        assert_eq!(status["a"], ActivityState::CompletedWithoutPassingOver);
        assert_eq!(status["l"], ActivityState::Active);
    }

    /// A second iteration shows only the branch taken in that iteration.
    #[test]
    fn choice_inside_loop_tracks_current_iteration() {
        let context = Context::new(&loop_region(
            "l",
            choice(
                "c",
                vec![task("a", 1.0, &[1.0]), task("b", 1.0, &[1.0])],
                None,
            ),
            0.5,
            2,
        ))
        .expect("context");
        let mut strategy = counter();
        let back = transition(&context, TransitionRole::LoopBack, None);
        let second_branch = transition(&context, TransitionRole::BranchEntry, Some(1));

        let entered = strategy
            .consume(&context, context.initial_marking(), &[])
            .expect("enter loop");
        let first = strategy
            .consume(&context, &entered.marking, &[])
            .expect("first iteration");
        let status = region_status(&context, &first.marking);
        assert_eq!(status["a"], ActivityState::Completed);
        assert_eq!(status["b"], ActivityState::WillNotBeExecuted);
        assert_eq!(status["l"], ActivityState::Active);

        let looped = strategy
            .consume(&context, &first.marking, &[back])
            .expect("loop back");
        let status = region_status(&context, &looped.marking);
        assert_eq!(status["l"], ActivityState::Active);
        assert_eq!(status["c"], ActivityState::Active);
        assert_eq!(status["a"], ActivityState::Waiting);
        assert_eq!(status["b"], ActivityState::Waiting);

        let second = strategy
            .consume(&context, &looped.marking, &[second_branch])
            .expect("second iteration");
        let status = region_status(&context, &second.marking);
        assert_eq!(status["b"], ActivityState::Completed);
        assert_eq!(status["a"], ActivityState::WillNotBeExecuted);
        assert_eq!(status["c"], ActivityState::CompletedWithoutPassingOver);
        assert_eq!(status["l"], ActivityState::Active);
    }

    #[test]
    fn nature_outcome_skips_other_branches() {
        let context = Context::new(&sequential(
            "s",
            nature(
                "n",
                vec![task("a", 1.0, &[1.0]), task("b", 2.0, &[2.0])],
                vec![0.4, 0.6],
            ),
            task("e", 1.0, &[1.0]),
        ))
        .expect("context");
        let before = region_status(&context, context.initial_marking());
        assert_eq!(before["n"], ActivityState::Active);
        assert_eq!(before["a"], ActivityState::Waiting);
        assert_eq!(before["b"], ActivityState::Waiting);

        let outcome = transition(&context, TransitionRole::BranchEntry, Some(1));
        let step = counter()
            .consume(&context, context.initial_marking(), &[outcome])
            .expect("consume");
        let after = region_status(&context, &step.marking);
        assert_eq!(after["b"], ActivityState::Completed);
        assert_eq!(after["a"], ActivityState::WillNotBeExecuted);
        assert_eq!(after["n"], ActivityState::Completed);
        assert_eq!(after["s"], ActivityState::Completed);
    }
}
