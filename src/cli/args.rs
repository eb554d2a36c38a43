use crate::error::{ProcessingError, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "station-anomaly-processor")]
#[command(about = "Per-station anomaly detection and regional moving averages for weather readings")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub process: ProcessArgs,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,
}

/// Default invocation: `<input> <output> <threads>`
#[derive(Args, Debug, Clone, Default)]
pub struct ProcessArgs {
    #[arg(help = "Input CSV file of station readings")]
    pub input: Option<PathBuf>,

    #[arg(help = "Output JSON report path")]
    pub output: Option<PathBuf>,

    #[arg(help = "Number of worker threads (>= 1)", value_parser = parse_worker_count)]
    pub threads: Option<usize>,

    #[arg(long, help = "Pipeline configuration file (TOML)")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Moving-average JSON Lines output [default: media_movel_regiao.jsonl]")]
    pub moving_average_output: Option<PathBuf>,

    #[arg(long, default_value = "false", help = "Compute regional moving averages in parallel")]
    pub parallel_regions: bool,

    #[arg(long, help = "CSV of injected anomalies to score detections against")]
    pub ground_truth: Option<PathBuf>,

    #[arg(long, default_value = "false", help = "Memory-map the input file")]
    pub mmap: bool,

    #[arg(short, long, default_value = "false", help = "Hide the progress bar")]
    pub quiet: bool,
}

impl ProcessArgs {
    /// The three positional parameters, all of which are required
    pub fn positionals(&self) -> Result<(PathBuf, PathBuf, usize)> {
        match (&self.input, &self.output, self.threads) {
            (Some(input), Some(output), Some(threads)) => Ok((input.clone(), output.clone(), threads)),
            _ => Err(ProcessingError::Config(
                "expected three arguments: <input.csv> <output.json> <threads>".to_string(),
            )),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compare two result documents, ignoring execution time
    Compare {
        #[arg(help = "Reference result document")]
        reference: PathBuf,

        #[arg(help = "Result document to check")]
        candidate: PathBuf,
    },
}

pub fn parse_worker_count(value: &str) -> std::result::Result<usize, String> {
    let workers: usize = value
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a whole number", value))?;
    if workers == 0 {
        return Err("thread count must be at least 1".to_string());
    }
    Ok(workers)
}
