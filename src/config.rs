//! Launcher configuration
//!
//! Parses an optional YAML file naming the external tools and the
//! directories the launcher reads and writes. Every field has a default
//! matching the stock RNA-seq setup, so an empty file is valid.

use crate::form::DEFAULT_KMER_SIZE;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LauncherConfig {
    /// Program and leading arguments of the download/preprocessing tool
    pub download_command: Vec<String>,

    /// Program and leading arguments of the workflow engine; the `run`
    /// verb is added by the driver
    pub workflow_command: Vec<String>,

    /// Appended to the layout's script name (e.g. `paired_end_rnaseq.nf`)
    pub script_suffix: String,

    /// Parent of the per-study analysis output directories
    pub output_root: PathBuf,

    /// Where per-study slices of an uploaded table are written
    pub upload_dir: PathBuf,

    /// Report file name inside a study's output directory
    pub report_filename: String,

    /// k-mer size pre-filled in the form and used when none is given
    pub default_kmer_size: u32,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        LauncherConfig {
            download_command: vec!["python".to_string(), "fastqdl.py".to_string()],
            workflow_command: vec!["nextflow".to_string()],
            script_suffix: ".nf".to_string(),
            output_root: PathBuf::from("Output"),
            upload_dir: PathBuf::from("uploaded_files"),
            report_filename: "multiqc_report.html".to_string(),
            default_kmer_size: DEFAULT_KMER_SIZE,
        }
    }
}

impl LauncherConfig {
    /// Load configuration from YAML file
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to a defaulted struct
        let config: LauncherConfig = if content.trim().is_empty() {
            LauncherConfig::default()
        } else {
            serde_yaml::from_str(content).context("Failed to parse YAML config")?
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.download_command.first().map_or(true, |p| p.trim().is_empty()) {
            anyhow::bail!("download_command must name a program");
        }
        if self.workflow_command.first().map_or(true, |p| p.trim().is_empty()) {
            anyhow::bail!("workflow_command must name a program");
        }
        if self.report_filename.trim().is_empty() {
            anyhow::bail!("report_filename must not be empty");
        }
        if self.default_kmer_size == 0 || self.default_kmer_size % 2 == 0 {
            anyhow::bail!(
                "default_kmer_size must be an odd number (got {})",
                self.default_kmer_size
            );
        }
        Ok(())
    }

    /// Output directory of one study
    pub fn study_output_dir(&self, study_id: &str) -> PathBuf {
        self.output_root.join(study_id)
    }

    /// Where the batch slice of one study is written
    pub fn slice_path(&self, study_id: &str) -> PathBuf {
        self.upload_dir.join(format!("{}.csv", study_id))
    }

    /// Expected report location of one study
    pub fn report_path(&self, study_id: &str) -> PathBuf {
        self.study_output_dir(study_id).join(&self.report_filename)
    }
}
