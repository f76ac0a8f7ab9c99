//! Deterministic, pure simulation logic.
//!
//! Core modules must be free of I/O side effects. Randomness enters only
//! through a [`resolver::ChoiceResolver`] handed in by the caller, so every
//! module is testable in isolation with a seeded resolver.

pub mod compiler;
pub mod context;
pub mod execution_tree;
pub mod export;
pub mod marking;
pub mod net;
pub mod region;
pub mod resolver;
pub mod semantics;
pub mod status;
pub mod strategy;
pub mod validator;
