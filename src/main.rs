//! Promissory - demo CLI

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use promissory::prelude::*;
use promissory::util::config::{load_config_or_default, RuntimeConfig};
use promissory::util::logger::{self, LogLevel};
use promissory::{NAME, VERSION};
use tracing::info;

/// Futures, continuations and a priority worker pool
#[derive(Parser, Debug)]
#[command(name = "promissory")]
#[command(version = VERSION)]
#[command(about = NAME, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level: debug, info, warn or error
    #[arg(long, value_name = "LEVEL", global = true)]
    log_level: Option<LogLevel>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fan out continuation chains over the worker pool
    Run {
        /// Worker threads (overrides configuration)
        #[arg(short, long)]
        threads: Option<usize>,

        /// Number of chains to start
        #[arg(short = 'n', long, default_value_t = 64)]
        tasks: usize,

        /// Distinct keys requested by the chains; duplicates share one load
        #[arg(short, long, default_value_t = 8)]
        keys: usize,
    },

    /// Print the effective configuration
    Config,

    /// Print version information
    Version,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config =
        load_config_or_default(args.config.as_deref()).context("Failed to load configuration")?;
    let level = match args.log_level {
        Some(level) => level,
        None => config.log.level()?,
    };
    logger::init_with_level(level);

    match args.command {
        Commands::Run {
            threads,
            tasks,
            keys,
        } => {
            if threads.is_some() {
                config.pool.num_threads = threads;
                config.validate()?;
            }
            run_demo(&config, tasks, keys.max(1))?;
        },
        Commands::Config => {
            print!("{}", config.to_toml_string()?);
        },
        Commands::Version => {
            println!("{} {}", NAME, VERSION);
        },
    }

    Ok(())
}

/// Start `tasks` chains; chains asking for the same key share one in-flight load.
fn run_demo(
    config: &RuntimeConfig,
    tasks: usize,
    keys: usize,
) -> Result<()> {
    let runtime = Runtime::new(config).context("Failed to start runtime")?;
    info!(threads = runtime.pool().num_threads(), tasks, keys, "demo started");

    let started = Instant::now();
    let loads = Arc::new(AtomicUsize::new(0));
    let mut in_flight: HashMap<usize, SharedFuture<u64>> = HashMap::new();
    let mut chains = Vec::with_capacity(tasks);

    for index in 0..tasks {
        let key = index % keys;
        let load = in_flight
            .entry(key)
            .or_insert_with(|| {
                let loads = Arc::clone(&loads);
                runtime
                    .spawn(move || {
                        loads.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(5));
                        (key as u64 + 1) * 1000
                    })
                    .share()
            })
            .clone();

        let chain = load
            .via(runtime.executor())
            .then(move |resource: &u64| resource + index as u64)
            .then(|value| value * 2);
        chains.push(chain);
    }

    let mut total = 0u64;
    for chain in chains {
        total += chain.get().map_err(|e| anyhow::anyhow!("chain failed: {}", e))?;
    }

    let elapsed = started.elapsed();
    let stats = runtime.pool().stats();
    println!("chains:    {}", tasks);
    println!("loads:     {}", loads.load(Ordering::SeqCst));
    println!("checksum:  {}", total);
    println!("queued:    {}", stats.tasks_queued.load(Ordering::SeqCst));
    println!("completed: {}", stats.tasks_completed.load(Ordering::SeqCst));
    println!("elapsed:   {:?}", elapsed);

    runtime.shutdown();
    Ok(())
}
