use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rand::Rng;
use std::collections::VecDeque;
use std::fs::File;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use multibar::{MultiBar, RESET_COMPLETE_TOKEN, RESET_TOKEN, load_config};
use progress_bar::ProgressBar;
use worker_pool::{Reporter, WorkerLogLayer, WorkerPool};

const NAMES: &[&str] = &[
    "Hopper", "Lovelace", "Turing", "Noether", "Curie", "Ramanujan", "Hamilton", "Liskov",
];

/// Delays between simulated items, in milliseconds
const ITEM_DELAYS_MS: [u64; 3] = [100, 200, 400];

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Every worker processes its own random number of items
    Items,
    /// Workers drain a shared job queue, resetting their line per job
    Queue,
}

#[derive(Parser)]
#[command(name = "multibar-demo")]
#[command(about = "Draws one progress line per concurrently running worker")]
struct Args {
    /// Number of workers (one progress line each)
    #[arg(short, long, default_value = "6")]
    workers: usize,

    /// Smallest number of items a job can have
    #[arg(long, default_value = "8")]
    min_total: u64,

    /// Largest number of items a job can have
    #[arg(long, default_value = "16")]
    max_total: u64,

    /// Maximum number of workers running at once (overrides config)
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// What the workers do
    #[arg(long, value_enum, default_value = "items")]
    mode: Mode,

    /// Jobs in the shared queue (queue mode)
    #[arg(long, default_value = "30")]
    jobs: usize,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    let config: multibar::FileConfig = load_config(args.config.as_deref())
        .extract()
        .context("Failed to load configuration")?;
    let mut pool_config = config.pool_config();
    if args.concurrency.is_some() {
        pool_config.processes_to_start = args.concurrency;
    }
    let rules = Arc::new(config.rule_set().context("Invalid progress rule")?);

    let (min_total, max_total) = (args.min_total, args.max_total.max(args.min_total));
    println!(">> Processing items using {} workers ...", args.workers);

    let results = match args.mode {
        Mode::Items => {
            let process_data = (0..args.workers)
                .map(|_| rand::rng().random_range(min_total..=max_total))
                .collect();
            let mut pool = WorkerPool::new(process_data, do_work, pool_config);
            let mut bars = MultiBar::new(pool.len(), |_| {
                ProgressBar::new(rules.clone(), config.bar.clone())
            });
            bars.execute(&mut pool).await?
        }
        Mode::Queue => {
            let jobs: VecDeque<u64> = (0..args.jobs)
                .map(|_| rand::rng().random_range(min_total..=max_total))
                .collect();
            let queue = Arc::new(Mutex::new(jobs));
            let process_data = vec![queue; args.workers];
            let mut pool = WorkerPool::new(process_data, drain_queue, pool_config);
            let mut bars = MultiBar::new(pool.len(), |_| {
                ProgressBar::new(rules.clone(), config.bar.clone())
            });
            bars.execute(&mut pool).await?
        }
    };

    println!(
        ">> {} workers processed a total of {} items",
        results.len(),
        results.iter().sum::<u64>()
    );
    Ok(())
}

fn init_logging(args: &Args) -> Result<()> {
    let default_filter = if args.debug {
        "multibar=debug,worker_pool=debug,progress_bar=debug"
    } else {
        "multibar=warn,worker_pool=warn,progress_bar=warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let console = match &args.log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .boxed()
        }
        None => fmt::layer().with_writer(std::io::stderr).boxed(),
    };

    tracing_subscriber::registry()
        .with(console.with_filter(filter))
        .with(WorkerLogLayer)
        .init();
    Ok(())
}

/// Simulated job: announce a name and total, then process items one by one.
fn process_items(total: u64, reporter: &Reporter) -> u64 {
    let mut rng = rand::rng();
    debug!("processor is {}", NAMES[rng.random_range(0..NAMES.len())]);
    debug!("processing total of {}", total);
    for index in 0..total {
        if reporter.is_cancelled() {
            return index;
        }
        let delay = ITEM_DELAYS_MS[rng.random_range(0..ITEM_DELAYS_MS.len())];
        std::thread::sleep(Duration::from_millis(delay));
        debug!("processed item {}", index);
    }
    total
}

fn do_work(total: u64, reporter: Reporter) -> Result<u64> {
    Ok(process_items(total, &reporter))
}

fn drain_queue(queue: Arc<Mutex<VecDeque<u64>>>, reporter: Reporter) -> Result<u64> {
    let mut processed = 0;
    loop {
        let job = queue
            .lock()
            .map_err(|_| anyhow::anyhow!("job queue poisoned"))?
            .pop_front();
        let Some(total) = job else {
            debug!("{}", RESET_COMPLETE_TOKEN);
            return Ok(processed);
        };
        processed += process_items(total, &reporter);
        if reporter.is_cancelled() {
            return Ok(processed);
        }
        debug!("{}", RESET_TOKEN);
    }
}
