//! I/O helpers for simulator commands.

pub mod config;
pub mod json;
pub mod region_store;
