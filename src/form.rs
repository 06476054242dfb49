//! Submission parameters and their validation
//!
//! Everything the user enters is turned into an immutable
//! [`RunConfiguration`] at submission time. Validation failures are
//! [`LaunchError`]s and always happen before any external command runs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Default k-mer size offered by the form
pub const DEFAULT_KMER_SIZE: u32 = 15;

/// User-facing error kinds. None of them is fatal to the process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LaunchError {
    #[error("{0}")]
    MissingInput(String),

    #[error("Study id '{0}' cannot be used as a directory name.")]
    InvalidStudyId(String),

    #[error("The k-mer size must be an odd number (got {0}).")]
    InvalidKmerSize(String),

    #[error("The CSV file must contain 'SRA_study', 'Run', and 'LibraryLayout' columns (missing: {}).", .missing.join(", "))]
    MalformedTable { missing: Vec<String> },

    #[error("Error running {stage} for study {study_id}.")]
    ExternalCommandFailure {
        stage: Stage,
        study_id: String,
        stderr: String,
    },

    /// A file operation needed before a stage failed; no command was run
    #[error("Could not prepare {stage} for study {study_id}: {reason}")]
    PreparationFailure {
        stage: Stage,
        study_id: String,
        reason: String,
    },

    #[error("MultiQC report not found: {}", .path.display())]
    MissingReportArtifact { path: PathBuf },
}

/// The two external stages of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Download,
    Analyze,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Download => write!(f, "download script"),
            Stage::Analyze => write!(f, "workflow"),
        }
    }
}

/// Whether a study's reads are single-end or paired-end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LibraryLayout {
    SingleEnd,
    PairedEnd,
}

impl LibraryLayout {
    /// Analysis script name (without suffix) for this layout.
    /// Manual and batch submissions share this one mapping.
    pub fn script_name(&self) -> &'static str {
        match self {
            LibraryLayout::SingleEnd => "single_end_rnaseq",
            LibraryLayout::PairedEnd => "paired_end_rnaseq",
        }
    }

    /// Form label, also what the download tool receives in manual mode
    pub fn label(&self) -> &'static str {
        match self {
            LibraryLayout::SingleEnd => "Single-end",
            LibraryLayout::PairedEnd => "Paired-end",
        }
    }
}

impl fmt::Display for LibraryLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LibraryLayout {
    type Err = String;

    /// Accepts the form labels as well as SRA run-table values
    /// (`SINGLE`, `PAIRED`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "single" | "single-end" | "se" => Ok(LibraryLayout::SingleEnd),
            "paired" | "paired-end" | "pe" => Ok(LibraryLayout::PairedEnd),
            _ => Err(format!(
                "unknown library layout '{}' (expected single-end or paired-end)",
                s.trim()
            )),
        }
    }
}

/// Study ids name directories under the output and upload roots, so they
/// must be a single path component.
pub fn check_study_id(study_id: &str) -> Result<(), LaunchError> {
    if study_id.is_empty()
        || study_id == "."
        || study_id == ".."
        || study_id.contains(['/', '\\'])
    {
        return Err(LaunchError::InvalidStudyId(study_id.to_string()));
    }
    Ok(())
}

/// Odd, positive k-mer size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct KmerSize(u32);

impl KmerSize {
    pub fn new(value: u32) -> Result<Self, LaunchError> {
        if value == 0 || value % 2 == 0 {
            return Err(LaunchError::InvalidKmerSize(value.to_string()));
        }
        Ok(KmerSize(value))
    }

    /// Parse free-form text from a form field
    pub fn parse(text: &str) -> Result<Self, LaunchError> {
        let text = text.trim();
        let value: u32 = text
            .parse()
            .map_err(|_| LaunchError::InvalidKmerSize(text.to_string()))?;
        Self::new(value)
    }
}

impl Default for KmerSize {
    fn default() -> Self {
        KmerSize(DEFAULT_KMER_SIZE)
    }
}

impl TryFrom<u32> for KmerSize {
    type Error = LaunchError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        KmerSize::new(value)
    }
}

impl From<KmerSize> for u32 {
    fn from(k: KmerSize) -> u32 {
        k.0
    }
}

impl fmt::Display for KmerSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the download stage gets its run list from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RunSource {
    /// Run ids typed in by the user
    Manual,
    /// Per-study slice of an uploaded run table
    Table { slice_path: PathBuf },
}

/// Everything needed to run one study through the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfiguration {
    pub study_id: String,
    pub run_ids: Vec<String>,
    pub layout: LibraryLayout,
    pub kmer_size: KmerSize,
    pub source: RunSource,
}

/// Raw manual-mode fields as entered
#[derive(Debug, Clone, Default)]
pub struct ManualInput {
    pub study_id: String,
    /// Whitespace-separated run ids
    pub run_ids: String,
    pub layout: Option<LibraryLayout>,
}

impl ManualInput {
    /// Validate the fields and build the configuration.
    ///
    /// Missing fields are reported before the k-mer size, so an empty form
    /// with an even k-mer asks for the missing fields first.
    pub fn into_configuration(self, kmer_size: u32) -> Result<RunConfiguration, LaunchError> {
        let layout = self.check_fields()?;
        let kmer_size = KmerSize::new(kmer_size)?;

        Ok(RunConfiguration {
            study_id: self.study_id.trim().to_string(),
            run_ids: self.run_ids.split_whitespace().map(str::to_string).collect(),
            layout,
            kmer_size,
            source: RunSource::Manual,
        })
    }

    /// Check everything except the k-mer size
    pub fn check_fields(&self) -> Result<LibraryLayout, LaunchError> {
        let study_id = self.study_id.trim();
        if study_id.is_empty() || self.run_ids.split_whitespace().next().is_none() {
            return Err(LaunchError::MissingInput(
                "Please enter both the study number and run numbers.".to_string(),
            ));
        }
        check_study_id(study_id)?;
        self.layout.ok_or_else(|| {
            LaunchError::MissingInput("Please select a library layout.".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manual(study: &str, runs: &str) -> ManualInput {
        ManualInput {
            study_id: study.to_string(),
            run_ids: runs.to_string(),
            layout: Some(LibraryLayout::PairedEnd),
        }
    }

    #[test]
    fn test_even_kmer_rejected() {
        for k in [0u32, 2, 14, 16, 32] {
            assert!(matches!(KmerSize::new(k), Err(LaunchError::InvalidKmerSize(_))));
        }
        assert_eq!(u32::from(KmerSize::new(31).unwrap()), 31);
        assert_eq!(u32::from(KmerSize::default()), 15);
    }

    #[test]
    fn test_kmer_parse_rejects_garbage() {
        assert!(matches!(KmerSize::parse("abc"), Err(LaunchError::InvalidKmerSize(_))));
        assert!(matches!(KmerSize::parse("-3"), Err(LaunchError::InvalidKmerSize(_))));
        assert_eq!(u32::from(KmerSize::parse(" 21 ").unwrap()), 21);
    }

    #[test]
    fn test_manual_requires_study_and_runs() {
        let err = manual("", "SRR1").into_configuration(15).unwrap_err();
        assert!(matches!(err, LaunchError::MissingInput(_)));

        let err = manual("SRP123", "   \n ").into_configuration(15).unwrap_err();
        assert!(matches!(err, LaunchError::MissingInput(_)));
    }

    #[test]
    fn test_manual_even_kmer_rejected() {
        let err = manual("SRP123", "SRR1").into_configuration(16).unwrap_err();
        assert_eq!(err, LaunchError::InvalidKmerSize("16".to_string()));
    }

    #[test]
    fn test_manual_configuration() {
        let config = manual(" SRP123 ", "SRR1  SRR2\nSRR3").into_configuration(15).unwrap();
        assert_eq!(config.study_id, "SRP123");
        assert_eq!(config.run_ids, vec!["SRR1", "SRR2", "SRR3"]);
        assert_eq!(config.layout, LibraryLayout::PairedEnd);
        assert_eq!(config.source, RunSource::Manual);
    }

    #[test]
    fn test_study_id_must_be_one_path_component() {
        let err = manual("../etc", "SRR1").into_configuration(15).unwrap_err();
        assert_eq!(err, LaunchError::InvalidStudyId("../etc".to_string()));
        assert!(check_study_id("..").is_err());
        assert!(check_study_id("SRP123").is_ok());
    }

    #[test]
    fn test_layout_parsing() {
        for s in ["Single-end", "single_end", "SINGLE", "single"] {
            assert_eq!(s.parse::<LibraryLayout>().unwrap(), LibraryLayout::SingleEnd);
        }
        for s in ["Paired-end", "PAIRED", "paired_end", " paired "] {
            assert_eq!(s.parse::<LibraryLayout>().unwrap(), LibraryLayout::PairedEnd);
        }
        assert!("mate-pair".parse::<LibraryLayout>().is_err());
    }

    #[test]
    fn test_script_names() {
        assert_eq!(LibraryLayout::SingleEnd.script_name(), "single_end_rnaseq");
        assert_eq!(LibraryLayout::PairedEnd.script_name(), "paired_end_rnaseq");
        assert_eq!(LibraryLayout::PairedEnd.to_string(), "Paired-end");
    }
}
