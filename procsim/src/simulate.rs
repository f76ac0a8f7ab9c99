//! Simulation driver: step a compiled region until it completes or stalls.
//!
//! Each step consumes from the current tree node, using the next scripted
//! choice list when one is left and the strategy's defaults otherwise, and
//! appends the result to the execution tree.

use anyhow::{Context as _, Result, bail};
use serde::Serialize;
use tracing::{debug, info};

use crate::core::context::Context;
use crate::core::execution_tree::ExecutionTree;
use crate::core::net::TransitionId;
use crate::core::resolver::DefaultChoiceResolver;
use crate::core::strategy::{CounterExecution, DurationExecution, ExecutionStrategy};
use crate::io::config::{SimulatorConfig, StrategyKind};

/// Why a simulation run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The current node holds the final marking.
    Completed,
    /// A step left the marking unchanged.
    Deadlock,
    /// `max_steps` steps were taken without completing.
    StepLimit,
}

#[derive(Debug, Clone)]
pub struct Simulation {
    pub tree: ExecutionTree,
    pub steps: usize,
    pub stop: StopReason,
}

impl Simulation {
    pub fn completed(&self) -> bool {
        self.stop == StopReason::Completed
    }
}

/// Strategy described by `config`, with a seeded resolver when a seed is set.
pub fn build_strategy(config: &SimulatorConfig) -> Box<dyn ExecutionStrategy> {
    let resolver = match config.seed {
        Some(seed) => DefaultChoiceResolver::seeded(seed),
        None => DefaultChoiceResolver::from_entropy(),
    };
    match config.strategy {
        StrategyKind::Counter => {
            Box::new(CounterExecution::new(resolver).with_max_rounds(config.max_rounds))
        }
        StrategyKind::Duration => {
            let strategy = DurationExecution::new(resolver).with_max_rounds(config.max_rounds);
            match config.time_step {
                Some(step) => Box::new(strategy.with_time_step(step)),
                None => Box::new(strategy),
            }
        }
    }
}

/// Run `strategy` from the initial marking for at most `max_steps` steps.
///
/// `scripted[i]` holds the explicit choices for step `i`; later steps resolve
/// every decision by default.
pub fn simulate<S: ExecutionStrategy + ?Sized>(
    context: &Context,
    strategy: &mut S,
    max_steps: usize,
    scripted: &[Vec<TransitionId>],
) -> Result<Simulation> {
    let mut tree = ExecutionTree::from_context(context);
    let mut steps = 0;

    let stop = loop {
        let marking = tree.current().snapshot.marking.clone();
        if context.is_final(&marking) {
            break StopReason::Completed;
        }
        if steps >= max_steps {
            break StopReason::StepLimit;
        }

        let choices = scripted.get(steps).map(Vec::as_slice).unwrap_or(&[]);
        let step = strategy
            .consume(context, &marking, choices)
            .with_context(|| format!("simulation step {steps}"))?;
        steps += 1;
        if step.marking == marking {
            debug!(step = steps, "marking unchanged");
            break StopReason::Deadlock;
        }
        let node = tree.add_snapshot(context, &step, true);
        debug!(step = steps, node, elapsed = step.elapsed, "step recorded");
    };

    let current = &tree.current().snapshot;
    info!(
        ?stop,
        steps,
        nodes = tree.len(),
        time = current.time,
        probability = current.probability,
        "simulation finished"
    );
    Ok(Simulation { tree, steps, stop })
}

/// Parse a transition id written as `t12` or `12`.
pub fn parse_transition_id(raw: &str) -> Result<TransitionId> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix('t').unwrap_or(trimmed);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        bail!("invalid transition id '{raw}' (expected t<N> or <N>)");
    }
    let id = digits
        .parse::<u32>()
        .with_context(|| format!("transition id '{raw}' out of range"))?;
    Ok(TransitionId(id))
}

/// Parse a comma-separated choice list; an empty string means no choices.
pub fn parse_choices(raw: &str) -> Result<Vec<TransitionId>> {
    raw.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(parse_transition_id)
        .collect()
}
