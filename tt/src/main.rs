//! tt - throttler demo CLI
//!
//! Runs the Fibonacci demo or pushes a synthetic workload through the throttler.

use std::time::{Duration, Instant};

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tokio::runtime::Handle;
use tracing::{Dispatch, info};
use tracing_subscriber::EnvFilter;

use taskthrottle::Throttler;
use taskthrottle::cli::{Cli, Command, OutputFormat};
use taskthrottle::config::Config;
use taskthrottle::demo::{self, DemoSummary};

fn setup_logging(verbose: bool) -> Result<Dispatch> {
    // Logs go to stderr so stdout stays clean for results
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .finish();

    let dispatch = Dispatch::new(subscriber);
    tracing::dispatcher::set_global_default(dispatch.clone()).context("Failed to install log subscriber")?;

    info!("Logging initialized (verbose: {})", verbose);
    Ok(dispatch)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let dispatch = setup_logging(cli.verbose).context("Failed to setup logging")?;

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    match cli.command {
        Command::Fib { n } => cmd_fib(n),
        Command::Demo {
            tasks,
            throttled,
            throttle_count,
            failing,
            max_task_ms,
            time_window,
            per_window,
            concurrency,
            timeout,
            format,
        } => {
            if let Some(tasks) = tasks {
                config.demo.tasks = tasks;
            }
            if let Some(throttled) = throttled {
                config.demo.throttled = throttled;
            }
            if let Some(throttle_count) = throttle_count {
                config.demo.throttle_count = throttle_count;
            }
            if let Some(failing) = failing {
                config.demo.failing = failing;
            }
            if let Some(max_task_ms) = max_task_ms {
                config.demo.max_task_ms = max_task_ms;
            }
            if let Some(time_window) = time_window {
                config.throttler.time_window_secs = time_window;
            }
            if let Some(per_window) = per_window {
                config.throttler.per_time_window = per_window;
            }
            if let Some(concurrency) = concurrency {
                config.throttler.concurrency = concurrency;
            }
            if timeout.is_some() {
                config.throttler.operation_timeout_secs = timeout;
            }
            cmd_demo(config, format, dispatch).await
        }
    }
}

/// Print the n-th Fibonacci number
fn cmd_fib(n: u32) -> Result<()> {
    let value = demo::fib(n)?;
    println!("The {}-th Fibonacci number is {}", n, value);
    Ok(())
}

/// Run the synthetic workload and print a summary
async fn cmd_demo(config: Config, format: OutputFormat, dispatch: Dispatch) -> Result<()> {
    let jobs = demo::workload(&config.demo);
    let total = jobs.len();
    info!(jobs = total, throttler = ?config.throttler, "Starting demo");

    let print_items = format == OutputFormat::Text;
    let delay = Duration::from_millis(config.demo.consumer_delay_ms);
    let consumer = move |item: u64| async move {
        if print_items {
            println!("{} {}", "Item received:".green(), item);
        }
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        eyre::Ok(())
    };

    let started = Instant::now();
    let throttler = Throttler::new(jobs, consumer, config.throttler.clone(), Handle::current())
        .context("Invalid throttler configuration")?
        .with_dispatch(dispatch);
    let report = throttler.run().await.context("Throttler run failed")?;

    let summary = DemoSummary {
        jobs: total,
        elapsed_ms: started.elapsed().as_millis(),
        stats: report.stats.clone(),
        failures: report.failures().iter().map(|f| f.to_string()).collect(),
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Text => print_summary(&summary),
    }
    Ok(())
}

fn print_summary(summary: &DemoSummary) {
    let stats = &summary.stats;
    println!();
    println!("{} Ran {} jobs in {}ms", "✓".green(), summary.jobs, summary.elapsed_ms);
    println!("  Batches: {}", stats.batches);
    println!("  Admitted: {}", stats.total_admitted);
    println!("  Delivered: {}", stats.total_delivered.to_string().cyan());
    println!("  Retried: {}", stats.total_retried.to_string().yellow());
    if stats.total_failed > 0 {
        println!("  Failed: {}", stats.total_failed.to_string().red());
    } else {
        println!("  Failed: 0");
    }
    println!("  Peak concurrent: {}", stats.peak_concurrent);
    for failure in &summary.failures {
        println!("  {} {}", "✗".red(), failure);
    }
}
