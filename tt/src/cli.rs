//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// tt - batch-and-gate throttler demo
#[derive(Parser, Debug)]
#[command(
    name = "tt",
    author,
    version,
    about = "Run async operations in paced, concurrency-limited batches",
    long_about = None
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the n-th Fibonacci number
    Fib {
        /// Position in the sequence, starting at 1
        #[arg(required = true, value_name = "INT")]
        n: u32,
    },

    /// Push a synthetic workload through the throttler
    Demo {
        /// Number of quick jobs
        #[arg(short = 'n', long)]
        tasks: Option<usize>,

        /// Jobs that ask to be retried before succeeding
        #[arg(long)]
        throttled: Option<usize>,

        /// How many times each throttled job asks to be retried
        #[arg(long)]
        throttle_count: Option<u32>,

        /// Jobs that fail for good
        #[arg(long)]
        failing: Option<usize>,

        /// Upper bound on a job's simulated latency in milliseconds
        #[arg(long)]
        max_task_ms: Option<u64>,

        /// Seconds between batches and after a retry, e.g. 0.5
        #[arg(short = 'w', long)]
        time_window: Option<f64>,

        /// Jobs admitted per batch
        #[arg(short, long)]
        per_window: Option<usize>,

        /// Jobs executing at once
        #[arg(long)]
        concurrency: Option<usize>,

        /// Per-job timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Output format for the run summary
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Output format for the run summary
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_fib() {
        let cli = Cli::parse_from(["tt", "fib", "7"]);
        assert!(matches!(cli.command, Command::Fib { n: 7 }));
        assert!(!cli.verbose);
    }

    #[test]
    fn test_cli_parse_demo_defaults() {
        let cli = Cli::parse_from(["tt", "demo"]);
        if let Command::Demo {
            tasks,
            per_window,
            concurrency,
            format,
            ..
        } = cli.command
        {
            assert!(tasks.is_none());
            assert!(per_window.is_none());
            assert!(concurrency.is_none());
            assert_eq!(format, OutputFormat::Text);
        } else {
            panic!("Expected Demo command");
        }
    }

    #[test]
    fn test_cli_parse_demo_overrides() {
        let cli = Cli::parse_from([
            "tt",
            "demo",
            "-n",
            "40",
            "--throttled",
            "2",
            "-w",
            "0",
            "-p",
            "10",
            "--concurrency",
            "3",
            "-f",
            "json",
        ]);
        if let Command::Demo {
            tasks,
            throttled,
            time_window,
            per_window,
            concurrency,
            format,
            ..
        } = cli.command
        {
            assert_eq!(tasks, Some(40));
            assert_eq!(throttled, Some(2));
            assert_eq!(time_window, Some(0.0));
            assert_eq!(per_window, Some(10));
            assert_eq!(concurrency, Some(3));
            assert_eq!(format, OutputFormat::Json);
        } else {
            panic!("Expected Demo command");
        }
    }

    #[test]
    fn test_output_format_from_str() {
        assert!(matches!("text".parse::<OutputFormat>(), Ok(OutputFormat::Text)));
        assert!(matches!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json)));
        assert!("table".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_cli_with_config_and_verbose() {
        let cli = Cli::parse_from(["tt", "-c", "/path/to/config.yml", "-v", "fib", "3"]);
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/config.yml")));
        assert!(cli.verbose);
    }
}
