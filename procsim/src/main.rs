//! Stochastic simulator for timed business processes.
//!
//! Reads a region tree from JSON, validates it, compiles it to a timed Petri
//! net and runs it step by step, printing JSON views of the results.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use procsim::core::export::{NetView, TreeView};
use procsim::core::net::TransitionId;
use procsim::exit_codes;
use procsim::io::config::{SimulatorConfig, StrategyKind, load_config, write_config};
use procsim::io::json::write_json;
use procsim::io::region_store::{load_context, load_region};
use procsim::logging;
use procsim::simulate::{build_strategy, parse_choices, simulate};

#[derive(Parser)]
#[command(
    name = "procsim",
    version,
    about = "Stochastic simulator for timed business processes"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check a region file against the structural rules.
    Validate {
        /// Region tree (JSON).
        region: PathBuf,
    },
    /// Compile a region file and print the Petri net as JSON.
    Compile {
        region: PathBuf,
        /// Name recorded in the exported net.
        #[arg(long)]
        name: Option<String>,
        /// Write to this file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Run a simulation and print the execution tree as JSON.
    Simulate {
        region: PathBuf,
        /// Simulator config (TOML); defaults apply when missing.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Override the config seed.
        #[arg(long)]
        seed: Option<u64>,
        /// Override the config strategy.
        #[arg(long, value_enum)]
        strategy: Option<StrategyKind>,
        /// Explicit choices for one step, e.g. `t4,t9`; repeat for later steps.
        #[arg(long)]
        choices: Vec<String>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Write a simulator config holding the default settings.
    InitConfig {
        #[arg(default_value = "procsim.toml")]
        path: PathBuf,
        /// Replace an existing file.
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Validate { region } => cmd_validate(&region),
        Command::Compile { region, name, out } => cmd_compile(&region, name, out.as_deref()),
        Command::Simulate {
            region,
            config,
            seed,
            strategy,
            choices,
            out,
        } => {
            let mut cfg = match config {
                Some(path) => load_config(&path)?,
                None => SimulatorConfig::default(),
            };
            if let Some(seed) = seed {
                cfg.seed = Some(seed);
            }
            if let Some(strategy) = strategy {
                cfg.strategy = strategy;
            }
            cfg.validate()?;
            let scripted = choices
                .iter()
                .map(String::as_str)
                .map(parse_choices)
                .collect::<Result<Vec<Vec<TransitionId>>>>()?;
            cmd_simulate(&region, &cfg, &scripted, out.as_deref())
        }
        Command::InitConfig { path, force } => cmd_init_config(&path, force),
    }
}

fn cmd_validate(region: &Path) -> Result<i32> {
    load_region(region)?;
    println!("ok");
    Ok(exit_codes::OK)
}

fn cmd_compile(region: &Path, name: Option<String>, out: Option<&Path>) -> Result<i32> {
    let context = load_context(region)?;
    let name = name.unwrap_or_else(|| default_name(region));
    write_json(out, &NetView::from_context(&context, &name))?;
    Ok(exit_codes::OK)
}

fn cmd_simulate(
    region: &Path,
    cfg: &SimulatorConfig,
    scripted: &[Vec<TransitionId>],
    out: Option<&Path>,
) -> Result<i32> {
    let context = load_context(region)?;
    let mut strategy = build_strategy(cfg);
    let run = simulate(&context, strategy.as_mut(), cfg.max_steps, scripted)?;
    write_json(out, &TreeView::from_tree(&run.tree))?;
    if run.completed() {
        Ok(exit_codes::OK)
    } else {
        eprintln!("simulation stopped before completion ({:?})", run.stop);
        Ok(exit_codes::INCOMPLETE)
    }
}

fn cmd_init_config(path: &Path, force: bool) -> Result<i32> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to replace it)", path.display());
    }
    write_config(path, &SimulatorConfig::default())?;
    println!("wrote {}", path.display());
    Ok(exit_codes::OK)
}

/// File stem of the region path, used when `--name` is absent.
fn default_name(region: &Path) -> String {
    region
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "net".to_string())
}
