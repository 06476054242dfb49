//! rnaseq-launcher: run the RNA-seq download and workflow stages for SRA studies
//!
//! For each study:
//! 1. the download tool fetches and preprocesses the runs
//! 2. the workflow engine runs the single-end or paired-end RNA-seq script
//! 3. the MultiQC report written by the workflow is shown
//!
//! Studies come from the command line (`run`), from an SRA run table
//! (`batch`), or from the web form (`serve`).

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

mod config;
mod driver;
mod form;
mod report;
mod runner;
#[cfg(feature = "serve")]
mod serve;
mod table;

use crate::config::LauncherConfig;
use crate::driver::{PipelineDriver, RunSummary, StudyStatus};
use crate::form::{LaunchError, LibraryLayout, ManualInput};
use crate::runner::ProcessRunner;
use crate::table::BatchTable;

/// Launch the RNA-seq pipeline for one or more SRA studies
#[derive(Parser, Debug)]
#[command(name = "rnaseq-launcher")]
#[command(version)]
#[command(about = "Download SRA runs, run the RNA-seq workflow and show the MultiQC report")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one study from a study id and its run ids
    Run(RunArgs),

    /// Run every study of an SRA run table (CSV with SRA_study, Run, LibraryLayout)
    Batch(BatchArgs),

    /// Start the web form
    #[cfg(feature = "serve")]
    Serve(ServeArgs),
}

/// Options shared by every subcommand
#[derive(Args, Debug)]
struct CommonArgs {
    /// YAML configuration file (tool commands, directories, report name)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Parent directory of the per-study outputs (overrides the config file)
    #[arg(long, global = true)]
    output_root: Option<PathBuf>,

    /// Directory for per-study run table slices (overrides the config file)
    #[arg(long, global = true)]
    upload_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Arguments for the run subcommand
#[derive(Args, Debug)]
struct RunArgs {
    /// Study number (e.g. SRP123456)
    #[arg(short, long)]
    study: String,

    /// Run numbers belonging to the study
    #[arg(short, long, num_args = 1.., required = true)]
    runs: Vec<String>,

    /// Library layout of the runs: single-end or paired-end
    #[arg(short, long)]
    layout: LibraryLayout,

    #[command(flatten)]
    output: OutputArgs,
}

/// Arguments for the batch subcommand
#[derive(Args, Debug)]
struct BatchArgs {
    /// CSV run table
    #[arg(short, long)]
    table: PathBuf,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// k-mer size for indexing (must be odd; default from config, 15)
    #[arg(short, long)]
    kmer_size: Option<u32>,

    /// Write a JSON summary of the run to this file
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Open each MultiQC report in the browser when it is available
    #[arg(long)]
    open: bool,
}

/// Arguments for the serve subcommand
#[cfg(feature = "serve")]
#[derive(Args, Debug)]
struct ServeArgs {
    /// Port for the web server
    #[arg(long, default_value_t = 8501)]
    port: u16,

    /// Do not open a browser window
    #[arg(long)]
    no_browser: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.common.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every study completed
fn run(cli: Cli) -> Result<bool> {
    info!("rnaseq-launcher v{}", env!("CARGO_PKG_VERSION"));
    let config = load_config(&cli.common)?;

    match cli.command {
        Commands::Run(args) => run_manual(&config, args),
        Commands::Batch(args) => run_batch(&config, args),
        #[cfg(feature = "serve")]
        Commands::Serve(args) => {
            serve::start_server(&config, args.port, !args.no_browser)?;
            Ok(true)
        }
    }
}

fn load_config(args: &CommonArgs) -> Result<LauncherConfig> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration: {}", path.display());
            LauncherConfig::from_yaml(path)?
        }
        None => LauncherConfig::default(),
    };
    if let Some(dir) = &args.output_root {
        config.output_root = dir.clone();
    }
    if let Some(dir) = &args.upload_dir {
        config.upload_dir = dir.clone();
    }
    Ok(config)
}

/// Spinner that follows the driver's status changes
fn stage_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

fn follow_status(pb: &ProgressBar, study: &str, status: &StudyStatus) {
    match status {
        StudyStatus::Running { stage } => pb.set_message(format!("Study {}: running {}", study, stage)),
        StudyStatus::Succeeded => pb.println(format!("Study {}: done", study)),
        StudyStatus::Failed { stage, .. } => pb.println(format!("Study {}: {} failed", study, stage)),
        StudyStatus::Rejected { reason } => pb.println(format!("Study {}: skipped ({})", study, reason)),
        StudyStatus::Idle => {}
    }
}

fn run_manual(config: &LauncherConfig, args: RunArgs) -> Result<bool> {
    let input = ManualInput {
        study_id: args.study,
        run_ids: args.runs.join(" "),
        layout: Some(args.layout),
    };
    let kmer_size = args.output.kmer_size.unwrap_or(config.default_kmer_size);

    let pb = stage_spinner();
    let mut driver = PipelineDriver::new(config, ProcessRunner)
        .with_observer(|study, status| follow_status(&pb, study, status));
    let result = driver.run_manual(input, kmer_size);
    drop(driver);
    pb.finish_and_clear();

    let summary = result?;
    finish(&summary, &args.output)
}

fn run_batch(config: &LauncherConfig, args: BatchArgs) -> Result<bool> {
    info!("Reading run table: {}", args.table.display());
    let table = BatchTable::from_path(&args.table)??;
    if table.is_empty() {
        warn!("Run table {} has no rows", args.table.display());
    } else {
        info!("File uploaded successfully: {} rows", table.len());
    }
    let kmer_size = args.output.kmer_size.unwrap_or(config.default_kmer_size);

    let pb = stage_spinner();
    let mut driver = PipelineDriver::new(config, ProcessRunner)
        .with_observer(|study, status| follow_status(&pb, study, status));
    let result = driver.run_batch(&table, kmer_size);
    drop(driver);
    pb.finish_and_clear();

    let summary = result?;
    finish(&summary, &args.output)
}

/// Report every outcome, write the summary and open reports if asked
fn finish(summary: &RunSummary, args: &OutputArgs) -> Result<bool> {
    for outcome in &summary.outcomes {
        for command in &outcome.commands {
            info!("[{}] {}", outcome.study_id, command);
        }
        match &outcome.status {
            StudyStatus::Failed { .. } => {
                if let Some(e) = outcome.error() {
                    error!("{}", e);
                    if let LaunchError::ExternalCommandFailure { stderr, .. } = &e {
                        if !stderr.trim().is_empty() {
                            eprintln!("{}", stderr.trim_end());
                        }
                    }
                }
            }
            StudyStatus::Succeeded => match &outcome.report {
                Some(report) if report.is_rendered() => {
                    let path = report.path();
                    info!("Study {}: MultiQC report at {}", outcome.study_id, path.display());
                    if args.open {
                        if let Err(e) = webbrowser::open(&path.display().to_string()) {
                            warn!("Could not open {}: {}", path.display(), e);
                        }
                    }
                }
                Some(report) => {
                    if let Some(e) = report.error() {
                        error!("Study {}: {}", outcome.study_id, e);
                    }
                }
                None => {}
            },
            _ => {
                if let Some(e) = outcome.error() {
                    error!("{}", e);
                }
            }
        }
    }

    if let Some(path) = &args.summary {
        summary
            .save(path)
            .with_context(|| format!("Failed to save summary to {}", path.display()))?;
        info!("Run summary saved to: {}", path.display());
    }

    let succeeded = summary.outcomes.iter().filter(|o| o.succeeded()).count();
    info!("Done! {}/{} studies completed", succeeded, summary.outcomes.len());
    Ok(summary.all_succeeded())
}
