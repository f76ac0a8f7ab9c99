//! Token-game rules extended with dwell time and loop bounds.
//!
//! All functions are pure: they read a marking and return a new one.

use crate::core::marking::TimeMarking;
use crate::core::net::{Net, Transition, TransitionId, TransitionRole};

/// Slack for comparing accumulated float ages against place durations.
pub const TIME_EPSILON: f64 = 1e-9;

/// Enabled by tokens alone: every input place holds `weight` tokens and the
/// loop bound, if any, has not been reached.
pub fn is_token_enabled(net: &Net, transition: &Transition, marking: &TimeMarking) -> bool {
    transition
        .preset
        .iter()
        .all(|(place, weight)| marking.tokens(*place) >= *weight)
        && !loop_bound_reached(net, transition, marking)
}

/// Enabled by tokens and every input place has dwelt for its duration.
pub fn is_enabled(net: &Net, transition: &Transition, marking: &TimeMarking) -> bool {
    is_token_enabled(net, transition, marking)
        && transition.preset.iter().all(|(place, _)| {
            net.place(*place).is_none_or(|info| {
                marking.state(*place).age + TIME_EPSILON >= info.duration
            })
        })
}

/// A loop-back is disabled once its guarded place was consumed `visit_limit` times.
pub fn loop_bound_reached(net: &Net, transition: &Transition, marking: &TimeMarking) -> bool {
    if transition.role != TransitionRole::LoopBack {
        return false;
    }
    transition.preset.iter().any(|(place, _)| {
        net.place(*place)
            .and_then(|info| info.visit_limit)
            .is_some_and(|limit| marking.state(*place).visit_count >= limit)
    })
}

/// Fire `transition`: consume from inputs (age reset, visit counted) and
/// produce on outputs. A loop-back also clears the visit counts of the body
/// it re-enters, so the next iteration starts fresh.
pub fn fire(transition: &Transition, marking: &TimeMarking) -> TimeMarking {
    let mut next = marking.clone();
    for (place, weight) in &transition.preset {
        let state = next.state_mut(*place);
        state.tokens = state.tokens.saturating_sub(*weight);
        state.age = 0.0;
        state.visit_count += 1;
    }
    for (place, weight) in &transition.postset {
        next.state_mut(*place).tokens += *weight;
    }
    for place in &transition.reset_visits {
        next.state_mut(*place).visit_count = 0;
    }
    next
}

/// Age every marked place by `dt`; empty places keep their age.
pub fn add_time(marking: &TimeMarking, dt: f64) -> TimeMarking {
    let mut next = marking.clone();
    let marked: Vec<_> = marking.marked_places().collect();
    for place in marked {
        next.state_mut(place).age += dt;
    }
    next
}

/// Ids of every transition satisfying [`is_enabled`], in id order.
pub fn enabled_transitions(net: &Net, marking: &TimeMarking) -> Vec<TransitionId> {
    net.transitions()
        .filter(|transition| is_enabled(net, transition, marking))
        .map(|transition| transition.id)
        .collect()
}

/// Time until a token-enabled transition becomes enabled.
pub fn remaining_wait(net: &Net, transition: &Transition, marking: &TimeMarking) -> f64 {
    transition
        .preset
        .iter()
        .filter_map(|(place, _)| {
            net.place(*place)
                .map(|info| info.duration - marking.state(*place).age)
        })
        .fold(0.0, f64::max)
}
