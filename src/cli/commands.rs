use crate::analyzers::{score_detections, ResultComparator};
use crate::cli::args::{Cli, Commands, ProcessArgs};
use crate::config::PipelineConfig;
use crate::error::{ProcessingError, Result};
use crate::models::AnomalyReport;
use crate::processors::AnomalyPipeline;
use crate::readers::{GroundTruthReader, ObservationReader};
use crate::utils::progress::ProgressReporter;
use crate::writers::{MovingAverageWriter, ReportWriter};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;
use tracing::{debug, info};
use validator::Validate;

pub async fn run(cli: Cli) -> Result<()> {
    setup_logging(cli.verbose, cli.log_file.as_deref())?;

    match cli.command {
        Some(Commands::Compare {
            reference,
            candidate,
        }) => compare(&reference, &candidate),
        None => process(cli.process).await,
    }
}

/// Set up structured logging on stderr, or into a file when one is given
pub fn setup_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let log_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("station_anomaly_processor={}", log_level)));

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match log_file {
        Some(path) => {
            let file = File::create(path)?;
            registry
                .with(
                    fmt::layer()
                        .with_ansi(false)
                        .with_target(false)
                        .with_writer(Mutex::new(file)),
                )
                .try_init()
        }
        None => registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    // A subscriber may already be installed when running inside tests
    if installed.is_err() {
        debug!("global subscriber already set");
    }
    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

/// Assemble the configuration from file, environment and command-line values
pub fn resolve_config(args: &ProcessArgs, threads: usize) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::load(args.config.as_deref())?.with_workers(threads);

    if let Some(path) = &args.moving_average_output {
        config = config.with_moving_average_output(path.clone());
    }
    if args.parallel_regions {
        config = config.with_parallel_regions(true);
    }

    config.validate()?;
    Ok(config)
}

async fn process(args: ProcessArgs) -> Result<()> {
    let (input, output, threads) = args.positionals()?;
    let config = resolve_config(&args, threads)?;

    println!("Processing station readings...");
    println!("Input file: {}", input.display());
    println!("Output file: {}", output.display());
    println!(
        "Workers: {}, Window: {}, Moving averages: {}",
        config.workers,
        config.window_size,
        config.moving_average_output.display()
    );

    let job = ProcessJob {
        input,
        ground_truth: args.ground_truth.clone(),
        config,
        quiet: args.quiet,
        use_mmap: args.mmap,
    };
    let moving_average_path = job.config.moving_average_output.clone();

    let outcome = tokio::task::spawn_blocking(move || job.execute()).await??;
    let report = &outcome.report;

    let writer = ReportWriter::new();
    writer.write_report(report, &output)?;
    info!(path = %output.display(), "report written");

    println!("\n{}", report.summary());
    println!("Observations flagged: {}", outcome.flagged_observations);
    println!("Moving-average records: {}", outcome.moving_average_records);
    println!("\n{}", writer.get_file_info(&output)?.summary());
    println!("Moving averages saved to {}", moving_average_path.display());
    println!("Processing complete!");
    Ok(())
}

/// What a finished run produced besides the files on disk
#[derive(Debug)]
pub struct ProcessOutcome {
    pub report: AnomalyReport,
    pub flagged_observations: usize,
    pub moving_average_records: usize,
}

/// Everything one batch run needs, moved onto a blocking thread
pub struct ProcessJob {
    pub input: PathBuf,
    pub ground_truth: Option<PathBuf>,
    pub config: PipelineConfig,
    pub quiet: bool,
    pub use_mmap: bool,
}

impl ProcessJob {
    /// Ingest, run both stages, and stream the moving averages to disk.
    /// Every input is read before anything is written.
    pub fn execute(self) -> Result<ProcessOutcome> {
        let spinner = ProgressReporter::new_spinner("Reading observations...", self.quiet);
        let reader = ObservationReader::with_mmap(self.use_mmap);
        let mut observations = reader.read_observations(&self.input)?;
        spinner.finish_with_message(&format!("Read {} observations", observations.len()));
        info!(observations = observations.len(), "ingestion complete");

        let truth = match &self.ground_truth {
            Some(path) => Some(GroundTruthReader::new().read_anomalies(path)?),
            None => None,
        };

        let pipeline = AnomalyPipeline::new(self.config)?;
        let started = Instant::now();

        let station_count = observations
            .iter()
            .map(|o| o.station_id.as_str())
            .collect::<std::collections::HashSet<_>>()
            .len();
        let progress =
            ProgressReporter::new(station_count as u64, "Analysing stations...", self.quiet);

        let station_results = pipeline.analyze_stations(&mut observations, Some(&progress))?;
        progress.finish_with_message(&format!("Analysed {} stations", station_results.len()));

        let mut writer = MovingAverageWriter::create(&pipeline.config().moving_average_output)?;
        let emitted = writer.write_all(pipeline.moving_averages(&observations)?)?;
        writer.finish()?;
        info!(records = emitted, "moving averages written");

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        let mut report = AnomalyReport::new(elapsed_ms, station_results);

        if let Some(truth) = truth {
            let accuracy = score_detections(&observations, &truth);
            info!(
                true_positives = accuracy.true_positives,
                false_positives = accuracy.false_positives,
                false_negatives = accuracy.false_negatives,
                "scored against ground truth"
            );
            report = report.with_accuracy(accuracy);
        }

        Ok(ProcessOutcome {
            report,
            flagged_observations: observations.iter().filter(|o| o.is_anomalous()).count(),
            moving_average_records: emitted,
        })
    }
}

fn compare(reference: &Path, candidate: &Path) -> Result<()> {
    println!(
        "Comparing:\n  1: {}\n  2: {}\n",
        reference.display(),
        candidate.display()
    );

    let differences = ResultComparator::new().compare_files(reference, candidate)?;
    if differences.is_empty() {
        println!("✅ Results are consistent");
        return Ok(());
    }

    for difference in &differences {
        println!("  - {}", difference);
    }
    println!("\n❌ Found {} difference(s)", differences.len());
    Err(ProcessingError::ResultsDiffer(differences.len()))
}
