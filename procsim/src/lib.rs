//! Stochastic simulator for timed business processes.
//!
//! A process is described as a tree of regions (tasks, sequences, parallel
//! blocks, choices, nature events and bounded loops). The tree is validated,
//! compiled to a timed Petri net and stepped with an execution strategy; every
//! explored state is recorded in an execution tree. The architecture enforces a
//! strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (validation, compilation, timed
//!   semantics, strategies, the execution tree). No I/O, fully testable in
//!   isolation.
//! - **[`io`]**: Side-effecting operations (reading regions and config files,
//!   writing JSON output).
//!
//! [`simulate`] coordinates core logic with a configured strategy to implement
//! the CLI's `simulate` command.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod simulate;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
