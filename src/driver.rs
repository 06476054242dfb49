//! Pipeline driver
//!
//! Runs one study through Download → Analyze → Report:
//! 1. Download - the download tool fetches and preprocesses the study's runs
//! 2. Analyze  - the workflow engine runs the layout's RNA-seq script
//! 3. Report   - the MultiQC report written by the workflow is loaded
//!
//! A stage only starts if the previous one exited with code 0. In batch
//! mode every study group goes through this sequence on its own; a failed
//! study does not stop the ones after it.

use crate::config::LauncherConfig;
use crate::form::{
    check_study_id, KmerSize, LaunchError, ManualInput, RunConfiguration, RunSource, Stage,
};
use crate::report::ReportView;
use crate::runner::{display_command, CommandRunner};
use crate::table::{BatchTable, StudyGroup};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Where a study currently is in the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StudyStatus {
    Idle,
    Running {
        stage: Stage,
    },
    Succeeded,
    Failed {
        stage: Stage,
        /// `None` when the stage failed before its command could run
        exit_code: Option<i32>,
        stderr: String,
    },
    /// The study's parameters were invalid; nothing was run for it
    Rejected {
        reason: String,
    },
}

/// Everything that happened to one study
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyOutcome {
    pub study_id: String,
    pub status: StudyStatus,
    /// Command lines executed for this study, in order
    pub commands: Vec<String>,
    /// Set once the analysis succeeded
    pub report: Option<ReportView>,
}

impl StudyOutcome {
    fn new(study_id: &str) -> Self {
        StudyOutcome {
            study_id: study_id.to_string(),
            status: StudyStatus::Idle,
            commands: Vec::new(),
            report: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.status, StudyStatus::Succeeded)
    }

    /// The user-facing error for this study, if any
    pub fn error(&self) -> Option<LaunchError> {
        match &self.status {
            StudyStatus::Failed { stage, exit_code: None, stderr } => Some(LaunchError::PreparationFailure {
                stage: *stage,
                study_id: self.study_id.clone(),
                reason: stderr.clone(),
            }),
            StudyStatus::Failed { stage, stderr, .. } => Some(LaunchError::ExternalCommandFailure {
                stage: *stage,
                study_id: self.study_id.clone(),
                stderr: stderr.clone(),
            }),
            StudyStatus::Rejected { reason } => Some(LaunchError::MissingInput(reason.clone())),
            _ => self.report.as_ref().and_then(ReportView::error),
        }
    }
}

/// Result of one submission (one study in manual mode, all groups in batch)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: String,
    pub finished_at: String,
    pub kmer_size: KmerSize,
    pub outcomes: Vec<StudyOutcome>,
}

impl RunSummary {
    /// True if every study made it through the analysis
    pub fn all_succeeded(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(StudyOutcome::succeeded)
    }

    /// Save summary to JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write run summary: {}", path.display()))?;
        Ok(())
    }
}

type Observer<'a> = Box<dyn FnMut(&str, &StudyStatus) + 'a>;

/// Drives configurations through the external stages with a [`CommandRunner`]
pub struct PipelineDriver<'a, R: CommandRunner> {
    config: &'a LauncherConfig,
    runner: R,
    observer: Option<Observer<'a>>,
}

impl<'a, R: CommandRunner> PipelineDriver<'a, R> {
    pub fn new(config: &'a LauncherConfig, runner: R) -> Self {
        PipelineDriver {
            config,
            runner,
            observer: None,
        }
    }

    /// Call `observer` on every status change of every study
    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: FnMut(&str, &StudyStatus) + 'a,
    {
        self.observer = Some(Box::new(observer));
        self
    }

    fn set_status(&mut self, outcome: &mut StudyOutcome, status: StudyStatus) {
        if let Some(observer) = self.observer.as_mut() {
            observer(&outcome.study_id, &status);
        }
        outcome.status = status;
    }

    /// Program and arguments of the download stage
    pub fn download_command(&self, run: &RunConfiguration) -> (String, Vec<String>) {
        let (program, mut args) = split_command(&self.config.download_command);
        match &run.source {
            RunSource::Manual => {
                args.push("manual".to_string());
                args.push(run.layout.label().to_string());
                args.push(run.study_id.clone());
                args.extend(run.run_ids.iter().cloned());
            }
            RunSource::Table { slice_path } => {
                args.push("csv".to_string());
                args.push(slice_path.display().to_string());
            }
        }
        (program, args)
    }

    /// Program and arguments of the analysis stage
    pub fn analysis_command(&self, run: &RunConfiguration, output_dir: &Path) -> (String, Vec<String>) {
        let (program, mut args) = split_command(&self.config.workflow_command);
        args.push("run".to_string());
        args.push(self.script_name(run));
        args.extend([
            "--kmer_size".to_string(),
            run.kmer_size.to_string(),
            "--study_id".to_string(),
            run.study_id.clone(),
            "--output_dir".to_string(),
            output_dir.display().to_string(),
        ]);
        (program, args)
    }

    /// Workflow script for the configuration's layout
    pub fn script_name(&self, run: &RunConfiguration) -> String {
        format!("{}{}", run.layout.script_name(), self.config.script_suffix)
    }

    /// Run one well-formed configuration through every stage
    pub fn run_study(&mut self, run: &RunConfiguration) -> StudyOutcome {
        let mut outcome = StudyOutcome::new(&run.study_id);
        self.run_stages(run, &mut outcome);
        outcome
    }

    fn run_stages(&mut self, run: &RunConfiguration, outcome: &mut StudyOutcome) {
        log::info!(
            "Study {}: {} runs, {}, k-mer size {}",
            run.study_id,
            run.run_ids.len(),
            run.layout,
            run.kmer_size
        );

        // Download
        self.set_status(outcome, StudyStatus::Running { stage: Stage::Download });
        let (program, args) = self.download_command(run);
        outcome.commands.push(display_command(&program, &args));
        let result = self.runner.run(&program, &args);
        if !result.success() {
            log::error!(
                "Download failed for study {} (exit code {})",
                run.study_id,
                result.exit_code
            );
            self.set_status(
                outcome,
                StudyStatus::Failed {
                    stage: Stage::Download,
                    exit_code: Some(result.exit_code),
                    stderr: result.stderr,
                },
            );
            return;
        }
        log::info!("Data download and preprocessing complete for study {}", run.study_id);

        // Analyze
        self.set_status(outcome, StudyStatus::Running { stage: Stage::Analyze });
        let output_dir = self.config.study_output_dir(&run.study_id);
        if let Err(e) = std::fs::create_dir_all(&output_dir) {
            log::error!("Failed to create {}: {}", output_dir.display(), e);
            self.set_status(
                outcome,
                StudyStatus::Failed {
                    stage: Stage::Analyze,
                    exit_code: None,
                    stderr: format!("Failed to create {}: {}", output_dir.display(), e),
                },
            );
            return;
        }

        let (program, args) = self.analysis_command(run, &output_dir);
        let command_line = display_command(&program, &args);
        log::info!("Executing: {}", command_line);
        outcome.commands.push(command_line);
        let result = self.runner.run(&program, &args);
        if !result.success() {
            log::error!(
                "Workflow failed for study {} (exit code {})",
                run.study_id,
                result.exit_code
            );
            self.set_status(
                outcome,
                StudyStatus::Failed {
                    stage: Stage::Analyze,
                    exit_code: Some(result.exit_code),
                    stderr: result.stderr,
                },
            );
            return;
        }
        log::info!("Workflow ran successfully for study {}", run.study_id);

        // Report
        outcome.report = Some(ReportView::load(self.config.report_path(&run.study_id)));
        self.set_status(outcome, StudyStatus::Succeeded);
    }

    /// Manual submission: validate the form fields, then run the one study.
    /// Invalid input is returned as an error and nothing is executed.
    pub fn run_manual(&mut self, input: ManualInput, kmer_size: u32) -> Result<RunSummary, LaunchError> {
        let run = input.into_configuration(kmer_size)?;
        let started_at = now();
        let outcome = self.run_study(&run);
        Ok(RunSummary {
            started_at,
            finished_at: now(),
            kmer_size: run.kmer_size,
            outcomes: vec![outcome],
        })
    }

    /// Batch submission: one pipeline run per study group of `table`, in
    /// sorted study order. An even k-mer size rejects the whole submission
    /// before anything is written or executed.
    pub fn run_batch(&mut self, table: &BatchTable, kmer_size: u32) -> Result<RunSummary, LaunchError> {
        let kmer_size = KmerSize::new(kmer_size)?;
        let groups = table.study_groups();
        if groups.is_empty() {
            return Err(LaunchError::MissingInput(
                "The CSV file does not contain any study.".to_string(),
            ));
        }

        log::info!("Processing {} studies from run table", groups.len());
        let started_at = now();
        let mut outcomes = Vec::with_capacity(groups.len());

        for group in &groups {
            let mut outcome = StudyOutcome::new(&group.study_id);

            if let Err(e) = check_group(group) {
                self.reject(&mut outcome, e.to_string());
                outcomes.push(outcome);
                continue;
            }

            let slice_path = self.config.slice_path(&group.study_id);
            let slice_path = match table.write_slice(group, &slice_path) {
                Ok(path) => path,
                Err(e) => {
                    log::error!("Study {}: {:#}", group.study_id, e);
                    self.set_status(
                        &mut outcome,
                        StudyStatus::Failed {
                            stage: Stage::Download,
                            exit_code: None,
                            stderr: format!("{:#}", e),
                        },
                    );
                    outcomes.push(outcome);
                    continue;
                }
            };

            match group.configuration(kmer_size, slice_path) {
                Ok(run) => self.run_stages(&run, &mut outcome),
                Err(e) => self.reject(&mut outcome, e.to_string()),
            }
            outcomes.push(outcome);
        }

        let succeeded = outcomes.iter().filter(|o| o.succeeded()).count();
        log::info!("{}/{} studies completed successfully", succeeded, outcomes.len());

        Ok(RunSummary {
            started_at,
            finished_at: now(),
            kmer_size,
            outcomes,
        })
    }

    fn reject(&mut self, outcome: &mut StudyOutcome, reason: String) {
        log::warn!("Skipping study {}: {}", outcome.study_id, reason);
        self.set_status(outcome, StudyStatus::Rejected { reason });
    }
}

/// Everything about a group that can be checked before its slice is written
fn check_group(group: &StudyGroup) -> Result<(), LaunchError> {
    check_study_id(&group.study_id)?;
    if group.run_ids().is_empty() {
        return Err(LaunchError::MissingInput(format!(
            "Study {} has no run ids.",
            group.study_id
        )));
    }
    group.layout()?;
    Ok(())
}

fn split_command(command: &[String]) -> (String, Vec<String>) {
    match command.split_first() {
        Some((program, rest)) => (program.clone(), rest.to_vec()),
        None => (String::new(), Vec::new()),
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}
