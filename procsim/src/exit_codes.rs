//! Stable exit codes for procsim CLI commands.

/// Command succeeded; for `simulate`, the final marking was reached.
pub const OK: i32 = 0;
/// Invalid region, config or arguments, or a failed execution step.
pub const INVALID: i32 = 1;
/// `procsim simulate` stopped before the final marking (deadlock or step limit).
pub const INCOMPLETE: i32 = 2;
