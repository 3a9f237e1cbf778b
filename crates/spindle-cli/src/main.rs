// spindle: run a batch of sample tasks on a fixed worker pool.
//
// Flow: lock -> pool -> submit all -> await all -> shutdown -> unlock.
// Exit status 0 when the batch ran and the pool shut down cleanly; 1 when the
// lock is held, arguments or config are bad, or anything fails outside a task.
// Individual task failures are reported, they do not change the exit status.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use spindle_core::impls::PidFileLock;
use spindle_core::ports::{InstanceLock, SystemClock};
use spindle_core::sample::FailurePlan;
use spindle_core::{BatchSummary, PoolConfig, WorkerPool, run_batch};
use tracing::Instrument;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ulid::Ulid;

const DEFAULT_PIDFILE: &str = "/tmp/spindle.pid";

#[derive(Debug, Parser)]
#[command(name = "spindle")]
#[command(about = "Run a batch of sample tasks on a fixed-size worker pool")]
#[command(version)]
struct Cli {
    /// Number of workers (overrides config file and SPINDLE_WORKERS) [default: 1]
    #[arg(long, short = 'n')]
    workers: Option<usize>,

    /// Path of the single-instance lock file
    #[arg(long, default_value = DEFAULT_PIDFILE)]
    pidfile: PathBuf,

    /// JSON config file ({"worker_count": .., "shutdown_timeout_ms": ..})
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of tasks to submit
    #[arg(long, default_value_t = 1000)]
    tasks: usize,

    /// Probability that a task is flagged to fail (0.0 ..= 1.0)
    #[arg(long, default_value_t = 0.5, value_parser = parse_rate)]
    failure_rate: f64,

    /// Seed for the failure plan; random when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Fail tasks whose run-time millisecond timestamp is even, instead of a seeded plan
    #[arg(long, conflicts_with_all = ["failure_rate", "seed"])]
    clock_parity: bool,

    /// Shutdown deadline in milliseconds (overrides config file and env)
    #[arg(long)]
    shutdown_timeout_ms: Option<u64>,

    /// Print the summary as JSON on stdout
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Successful = 0,
    Failed = 1,
}

impl From<Status> for ExitCode {
    fn from(status: Status) -> Self {
        ExitCode::from(status as u8)
    }
}

fn parse_rate(raw: &str) -> Result<f64, String> {
    let rate: f64 = raw.parse().map_err(|e| format!("not a number: {e}"))?;
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(format!("{rate} is not within 0.0..=1.0"))
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spindle=info,spindle_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // --help / --version are not failures
            let status = if err.use_stderr() {
                Status::Failed
            } else {
                Status::Successful
            };
            if let Err(print_err) = err.print() {
                tracing::warn!(error = %print_err, "failed to print usage");
            }
            return status.into();
        }
    };

    let run_id = Ulid::new();
    let span = tracing::info_span!("run", %run_id);
    match run(cli).instrument(span).await {
        Ok(()) => Status::Successful.into(),
        Err(err) => {
            tracing::error!(%run_id, error = ?err, "run failed");
            Status::Failed.into()
        }
    }
}

fn load_config(cli: &Cli) -> Result<PoolConfig> {
    let base = match &cli.config {
        Some(path) => PoolConfig::from_file(path)?,
        None => PoolConfig::default(),
    };
    let mut config = base.apply_env()?;

    if let Some(workers) = cli.workers {
        config.worker_count = workers;
    }
    if let Some(ms) = cli.shutdown_timeout_ms {
        config.shutdown_timeout_ms = ms;
    }
    config.validate()?;
    Ok(config)
}

fn failure_plan(cli: &Cli) -> FailurePlan {
    if cli.clock_parity {
        return FailurePlan::ClockParity(Arc::new(SystemClock));
    }
    let seed = cli.seed.unwrap_or_else(rand::random);
    tracing::info!(seed, rate = cli.failure_rate, "seeded failure plan");
    FailurePlan::Seeded {
        rate: cli.failure_rate,
        seed,
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    tracing::info!(
        workers = config.worker_count,
        shutdown_timeout_ms = config.shutdown_timeout_ms,
        pidfile = %cli.pidfile.display(),
        "starting"
    );

    let lock = PidFileLock::new();
    let acquired = lock
        .acquire(&cli.pidfile)
        .context("failed to acquire lock file")?;
    if !acquired {
        bail!(
            "another instance holds the lock file {}",
            cli.pidfile.display()
        );
    }

    let result = run_locked(&cli, &config).await;
    release(&lock, &cli.pidfile);
    let summary = result?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "submitted={} succeeded={} failed={} cancelled={} drained_naturally={}",
            summary.submitted,
            summary.succeeded,
            summary.failed,
            summary.cancelled,
            summary.report.drained_naturally
        );
    }

    if !summary.report.drained_naturally {
        bail!(
            "pool did not drain within {} ms; {} task(s) cancelled",
            config.shutdown_timeout_ms,
            summary.report.cancelled_count
        );
    }
    Ok(())
}

async fn run_locked(cli: &Cli, config: &PoolConfig) -> Result<BatchSummary> {
    let pool = WorkerPool::from_config(config)?;
    let plan = failure_plan(cli);
    let timeout = Duration::from_millis(config.shutdown_timeout_ms);

    let (summary, _outcomes) = run_batch(&pool, &plan, cli.tasks, timeout).await?;
    if let Some(expected) = summary.expected_failures
        && expected != summary.failed
    {
        tracing::warn!(expected, failed = summary.failed, "failure count differs from plan");
    }
    Ok(summary)
}

fn release(lock: &PidFileLock, path: &Path) {
    match lock.release(path) {
        Ok(true) => tracing::debug!(path = %path.display(), "lock released"),
        Ok(false) => tracing::warn!(path = %path.display(), "lock file was already gone"),
        Err(err) => tracing::warn!(error = %err, "failed to release lock file"),
    }
}
