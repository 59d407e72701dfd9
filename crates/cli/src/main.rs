//! tickwork CLI - drive a chunked workload across scheduler ticks.

mod work;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tickwork_scheduler::{SchedulerConfig, TokioTickScheduler};
use tickwork_task::{DriverConfig, Outcome, SubmitRequest, Task, TaskService};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::work::ChunkedWork;

#[derive(Parser)]
#[command(name = "tickwork")]
#[command(about = "Run budgeted work one tick at a time", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a synthetic chunked workload to completion
    Run {
        /// Number of steps in the workload
        #[arg(long, default_value = "200")]
        steps: u64,
        /// Cost of a single step in milliseconds
        #[arg(long, default_value = "1")]
        step_cost_ms: u64,
        /// Fail when this step is reached
        #[arg(long)]
        fail_at: Option<u64>,
        /// Per-activation budget in milliseconds
        #[arg(long)]
        budget_ms: Option<u64>,
        /// Scheduler tick period in milliseconds
        #[arg(long)]
        tick_ms: Option<u64>,
        /// Cancel the task after this many milliseconds
        #[arg(long)]
        cancel_after_ms: Option<u64>,
        /// JSON config file with `driver` and `scheduler` sections
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Progress report interval in milliseconds
        #[arg(long, default_value = "250")]
        report_ms: u64,
    },
    /// Print the default configuration as JSON
    Defaults,
}

/// On-disk configuration for the CLI.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct CliConfig {
    driver: DriverConfig,
    scheduler: SchedulerConfig,
}

impl CliConfig {
    fn load(path: &PathBuf) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("Invalid config {}", path.display()))
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            steps,
            step_cost_ms,
            fail_at,
            budget_ms,
            tick_ms,
            cancel_after_ms,
            config,
            report_ms,
        } => {
            let mut settings = match config {
                Some(path) => CliConfig::load(&path)?,
                None => CliConfig::default(),
            };
            if let Some(ms) = budget_ms {
                settings.driver.budget_ms = ms;
            }
            if let Some(ms) = tick_ms {
                settings.scheduler.tick_period_ms = ms;
            }

            let mut work = ChunkedWork::new(steps, Duration::from_millis(step_cost_ms));
            if let Some(step) = fail_at {
                work = work.failing_at(step);
            }

            run(settings, work, cancel_after_ms, Duration::from_millis(report_ms.max(1))).await?;
        }
        Commands::Defaults => {
            println!("{}", serde_json::to_string_pretty(&CliConfig::default())?);
        }
    }

    Ok(())
}

async fn run(
    settings: CliConfig,
    work: ChunkedWork,
    cancel_after_ms: Option<u64>,
    report: Duration,
) -> Result<()> {
    let scheduler = TokioTickScheduler::start(settings.scheduler)?;
    let service = TaskService::new(scheduler.clone()).with_config(settings.driver)?;

    info!(
        "Budget {}ms per activation, tick every {}ms",
        settings.driver.budget_ms, settings.scheduler.tick_period_ms
    );
    let task = service.submit(Arc::new(work), SubmitRequest::named("chunked").owned_by("cli"))?;

    if let Some(ms) = cancel_after_ms {
        let task = Arc::clone(&task);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            if task.cancel() {
                info!("Cancelled task {} after {}ms", task.id(), ms);
            }
        });
    }

    let mut ticker = tokio::time::interval(report);
    ticker.tick().await;
    let wait = task.wait();
    tokio::pin!(wait);

    let outcome = loop {
        tokio::select! {
            outcome = &mut wait => break outcome,
            _ = ticker.tick() => {
                println!("  [{}] {} {}", task.state(), task.progress(), task.operation());
                debug!("{} activations so far", task.activations());
            }
        }
    };

    println!("Task {}", task.id());
    println!("  State:       {}", task.state());
    println!("  Elapsed:     {}ms", task.elapsed().as_millis());
    println!("  Activations: {}", task.activations());

    scheduler.shutdown().await;

    match outcome {
        Outcome::Succeeded(_) => {
            println!("  Result:      done");
            Ok(())
        }
        Outcome::Cancelled => {
            println!("  Result:      cancelled");
            Ok(())
        }
        Outcome::Failed(e) => bail!("Task failed: {}", e),
    }
}
