//! Pick-and-place command-line runner.
//!
//! Provides four modes of operation:
//! - `run`: drive the task to completion without logging
//! - `record`: same run, logging every tick plus camera frames to disk
//! - `init-config`: write the default configuration as TOML
//! - `info`: print workspace crate versions

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use pickplace_core::config::PickPlaceConfig;
use pickplace_ik::DlsMotionGenerator;
use pickplace_sim::{KinematicWorld, PickPlaceRunner, RunMode, RunSummary};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// Scripted pick-and-place with a simulated arm.
#[derive(Parser, Debug)]
#[command(name = "pickplace", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Options shared by both run modes.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
struct RunArgs {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Exit after the first tick.
    #[arg(long)]
    test: bool,

    /// Stop after this many simulation steps.
    #[arg(long)]
    max_ticks: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the task without logging.
    Run(RunArgs),

    /// Run the task and write the per-tick log and camera frames.
    Record {
        #[command(flatten)]
        run: RunArgs,

        /// Directory for the log files and images.
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Capture camera frames every this many ticks.
        #[arg(long)]
        capture_interval: Option<u64>,
    },

    /// Write the default configuration to a TOML file.
    InitConfig {
        path: PathBuf,

        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },

    /// Print crate information.
    Info,
}

// ---------------------------------------------------------------------------
// Mode implementations
// ---------------------------------------------------------------------------

fn load_config(args: &RunArgs) -> Result<PickPlaceConfig> {
    let mut config = match &args.config {
        Some(path) => PickPlaceConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => PickPlaceConfig::default(),
    };
    if args.test {
        config.run.test_mode = true;
    }
    if args.max_ticks.is_some() {
        config.run.max_ticks = args.max_ticks;
    }
    Ok(config)
}

fn run_task(config: &PickPlaceConfig, mode: RunMode) -> Result<RunSummary> {
    let mut runner = PickPlaceRunner::new(
        config,
        Box::new(KinematicWorld::new(config)),
        Box::new(DlsMotionGenerator::from_config(&config.robot, &config.motion)),
        mode,
    )
    .context("failed to set up run")?;

    let summary = runner.run().context("run failed")?;
    info!(
        reason = ?summary.stop_reason,
        ticks = summary.ticks,
        phase = %summary.phase,
        resets = summary.resets,
        "run finished"
    );
    Ok(summary)
}

fn print_summary(summary: &RunSummary) {
    println!("stopped: {:?}", summary.stop_reason);
    println!("ticks: {} (host steps: {})", summary.ticks, summary.host_ticks);
    println!("final phase: {}", summary.phase);
    for transition in &summary.transitions {
        println!("  {:<13} at tick {}", transition.phase, transition.tick);
    }
    if summary.records > 0 {
        println!("records: {}", summary.records);
    }
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let text = PickPlaceConfig::default().to_toml_string()?;
    std::fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))?;
    println!("wrote default configuration to {}", path.display());
    Ok(())
}

fn run_info() {
    println!("pickplace v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("crates:");
    println!("  pickplace-core   {}", env!("CARGO_PKG_VERSION"));
    println!("  pickplace-ik     {}", env!("CARGO_PKG_VERSION"));
    println!("  pickplace-task   {}", env!("CARGO_PKG_VERSION"));
    println!("  pickplace-record {}", env!("CARGO_PKG_VERSION"));
    println!("  pickplace-sim    {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("edition: 2024");
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

const DEFAULT_LOG_FILTER: &str = "info";

/// Directives from the `var` environment variable, or `info` when it is unset
/// or unparsable.
fn log_filter(var: &str) -> EnvFilter {
    EnvFilter::try_from_env(var).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(log_filter(EnvFilter::DEFAULT_ENV))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Run(args)) => {
            let summary = run_task(&load_config(&args)?, RunMode::Plain)?;
            print_summary(&summary);
        }
        Some(Commands::Record {
            run,
            output_dir,
            capture_interval,
        }) => {
            let mut config = load_config(&run)?;
            if let Some(dir) = output_dir {
                config.logging.output_dir = dir;
            }
            if let Some(interval) = capture_interval {
                config.logging.capture_interval = interval;
            }
            let summary = run_task(&config, RunMode::Logging)?;
            print_summary(&summary);
            println!("logs: {}", config.logging.primary_path().display());
        }
        Some(Commands::InitConfig { path, force }) => init_config(&path, force)?,
        Some(Commands::Info) => run_info(),
        None => {
            let summary = run_task(&PickPlaceConfig::default(), RunMode::Plain)?;
            print_summary(&summary);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
