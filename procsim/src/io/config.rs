//! Simulator configuration read from a TOML file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::strategy::DEFAULT_MAX_ROUNDS;

/// Which execution strategy drives the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Untimed rounds; every consumed place adds its dwell time.
    #[default]
    Counter,
    /// Places must dwell before their transitions fire.
    Duration,
}

/// Simulator configuration (TOML).
///
/// Intended to be edited by humans. Missing fields take the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulatorConfig {
    pub strategy: StrategyKind,

    /// Per-step time budget for the duration strategy; unbounded when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_step: Option<f64>,

    /// Seed for default-choice sampling; fresh entropy when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Simulation steps (tree nodes appended) before the run stops.
    pub max_steps: usize,

    /// Saturation rounds per step before it fails.
    pub max_rounds: usize,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Counter,
            time_step: None,
            seed: None,
            max_steps: 1_000,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}

impl SimulatorConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(step) = self.time_step {
            if !step.is_finite() || step <= 0.0 {
                return Err(anyhow!("time_step must be a positive number"));
            }
            if self.strategy != StrategyKind::Duration {
                return Err(anyhow!("time_step requires strategy = \"duration\""));
            }
        }
        if self.max_steps == 0 {
            return Err(anyhow!("max_steps must be > 0"));
        }
        if self.max_rounds == 0 {
            return Err(anyhow!("max_rounds must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `SimulatorConfig::default()`.
pub fn load_config(path: &Path) -> Result<SimulatorConfig> {
    if !path.exists() {
        let cfg = SimulatorConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: SimulatorConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &SimulatorConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
