//! Batch run table
//!
//! An uploaded comma-separated table with at least the `SRA_study`, `Run`
//! and `LibraryLayout` columns (an SRA run selector export works as is).
//! Rows are grouped by study; each group becomes one pipeline run and is
//! written back out as its own CSV slice for the download tool.

use crate::form::{KmerSize, LaunchError, LibraryLayout, RunConfiguration, RunSource};
use anyhow::{Context, Result};
use csv::StringRecord;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

pub const STUDY_COLUMN: &str = "SRA_study";
pub const RUN_COLUMN: &str = "Run";
pub const LAYOUT_COLUMN: &str = "LibraryLayout";

const REQUIRED_COLUMNS: [&str; 3] = [STUDY_COLUMN, RUN_COLUMN, LAYOUT_COLUMN];

/// Parsed run table with its required columns located
#[derive(Debug, Clone)]
pub struct BatchTable {
    headers: StringRecord,
    rows: Vec<StringRecord>,
    study_idx: usize,
    run_idx: usize,
    layout_idx: usize,
}

/// Rows of the table that belong to one study
#[derive(Debug, Clone)]
pub struct StudyGroup {
    pub study_id: String,
    /// Raw layout value of the group's first row
    pub layout_value: String,
    pub rows: Vec<StringRecord>,
    run_idx: usize,
}

/// Outcome of reading an upload.
///
/// `MalformedTable` is a user error and leaves the caller without a table;
/// an unreadable file or broken CSV syntax is an `Err` of the outer result.
pub type TableResult = Result<std::result::Result<BatchTable, LaunchError>>;

impl BatchTable {
    /// Parse a table from any reader
    pub fn from_reader<R: Read>(reader: R) -> TableResult {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b',')
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = rdr.headers().context("Failed to read CSV header")?.clone();

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|col| !headers.iter().any(|h| h == **col))
            .map(|col| col.to_string())
            .collect();
        if !missing.is_empty() {
            log::warn!("Discarding uploaded table, missing columns: {}", missing.join(", "));
            return Ok(Err(LaunchError::MalformedTable { missing }));
        }

        let position = |name: &str| headers.iter().position(|h| h == name).unwrap_or_default();
        let study_idx = position(STUDY_COLUMN);
        let run_idx = position(RUN_COLUMN);
        let layout_idx = position(LAYOUT_COLUMN);

        let mut rows = Vec::new();
        for (i, record) in rdr.records().enumerate() {
            let record = record.with_context(|| format!("Failed to parse CSV row {}", i + 2))?;
            rows.push(record);
        }

        log::info!("Loaded run table: {} rows, {} columns", rows.len(), headers.len());

        Ok(Ok(BatchTable {
            headers,
            rows,
            study_idx,
            run_idx,
            layout_idx,
        }))
    }

    /// Parse a table from a file on disk
    pub fn from_path<P: AsRef<Path>>(path: P) -> TableResult {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open run table: {}", path.display()))?;
        Self::from_reader(file)
    }

    /// Parse a table already held in memory (e.g. a browser upload)
    pub fn from_text(text: &str) -> TableResult {
        Self::from_reader(text.as_bytes())
    }

    pub fn headers(&self) -> &StringRecord {
        &self.headers
    }

    /// First `n` rows, for previews
    pub fn head(&self, n: usize) -> &[StringRecord] {
        &self.rows[..n.min(self.rows.len())]
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Group rows by study id, in sorted study order.
    /// Rows with an empty study id belong to no group.
    pub fn study_groups(&self) -> Vec<StudyGroup> {
        let mut groups: BTreeMap<String, Vec<StringRecord>> = BTreeMap::new();
        let mut skipped = 0usize;

        for row in &self.rows {
            let study = row.get(self.study_idx).unwrap_or("").trim();
            if study.is_empty() {
                skipped += 1;
                continue;
            }
            groups.entry(study.to_string()).or_default().push(row.clone());
        }

        if skipped > 0 {
            log::warn!("Skipped {} rows without an {} value", skipped, STUDY_COLUMN);
        }

        groups
            .into_iter()
            .map(|(study_id, rows)| {
                let layout_value = rows[0].get(self.layout_idx).unwrap_or("").trim().to_string();
                StudyGroup {
                    study_id,
                    layout_value,
                    rows,
                    run_idx: self.run_idx,
                }
            })
            .collect()
    }

    /// Write one group's rows, with every column of the table, to `path`.
    /// Short rows are padded with empty cells to the header width. The
    /// parent directory is created if needed.
    pub fn write_slice(&self, group: &StudyGroup, path: &Path) -> Result<PathBuf> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        let path = path.to_path_buf();

        let width = self.headers.len();
        let mut wtr = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        wtr.write_record(&self.headers)?;
        for row in &group.rows {
            if row.len() < width {
                let mut padded = row.clone();
                for _ in row.len()..width {
                    padded.push_field("");
                }
                wtr.write_record(&padded)?;
            } else {
                wtr.write_record(row)?;
            }
        }
        wtr.flush()
            .with_context(|| format!("Failed to write {}", path.display()))?;

        log::debug!("Wrote {} rows for study {} to {}", group.rows.len(), group.study_id, path.display());
        Ok(path)
    }
}

impl StudyGroup {
    /// Run ids of the group, in table order
    pub fn run_ids(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|r| r.get(self.run_idx))
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Layout of the group, taken from its first row
    pub fn layout(&self) -> std::result::Result<LibraryLayout, LaunchError> {
        self.layout_value.parse().map_err(|e: String| {
            LaunchError::MissingInput(format!("Study {}: {}", self.study_id, e))
        })
    }

    /// Build the run configuration for this group once its slice exists
    pub fn configuration(
        &self,
        kmer_size: KmerSize,
        slice_path: PathBuf,
    ) -> std::result::Result<RunConfiguration, LaunchError> {
        Ok(RunConfiguration {
            study_id: self.study_id.clone(),
            run_ids: self.run_ids(),
            layout: self.layout()?,
            kmer_size,
            source: RunSource::Table { slice_path },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
Run,SRA_study,LibraryLayout,Organism
SRR3,SRP200,SINGLE,Homo sapiens
SRR1,SRP100,PAIRED,Mus musculus
SRR2,SRP100,PAIRED,Mus musculus
";

    #[test]
    fn test_missing_columns_discard_table() {
        let result = BatchTable::from_text("Run,SRA_study\nSRR1,SRP1\n").unwrap();
        match result {
            Err(LaunchError::MalformedTable { missing }) => {
                assert_eq!(missing, vec!["LibraryLayout".to_string()]);
            }
            other => panic!("expected MalformedTable, got {:?}", other),
        }
    }

    #[test]
    fn test_groups_sorted_by_study() {
        let table = BatchTable::from_text(TABLE).unwrap().unwrap();
        assert_eq!(table.len(), 3);

        let groups = table.study_groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].study_id, "SRP100");
        assert_eq!(groups[0].run_ids(), vec!["SRR1", "SRR2"]);
        assert_eq!(groups[0].layout().unwrap(), LibraryLayout::PairedEnd);
        assert_eq!(groups[1].study_id, "SRP200");
        assert_eq!(groups[1].layout().unwrap(), LibraryLayout::SingleEnd);
    }

    #[test]
    fn test_head_is_bounded() {
        let table = BatchTable::from_text(TABLE).unwrap().unwrap();
        assert_eq!(table.head(2).len(), 2);
        assert_eq!(table.head(10).len(), 3);
        assert_eq!(&table.head(1)[0][0], "SRR3");
    }

    #[test]
    fn test_layout_from_first_row() {
        let text = "SRA_study,Run,LibraryLayout\nSRP1,SRR1,paired\nSRP1,SRR2,SINGLE\n";
        let table = BatchTable::from_text(text).unwrap().unwrap();
        let groups = table.study_groups();
        assert_eq!(groups[0].layout().unwrap(), LibraryLayout::PairedEnd);
    }

    #[test]
    fn test_unknown_layout_is_rejected() {
        let text = "SRA_study,Run,LibraryLayout\nSRP1,SRR1,matepair\n";
        let table = BatchTable::from_text(text).unwrap().unwrap();
        let groups = table.study_groups();
        assert!(matches!(groups[0].layout(), Err(LaunchError::MissingInput(_))));
    }

    #[test]
    fn test_rows_without_study_are_skipped() {
        let text = "SRA_study,Run,LibraryLayout\n,SRR9,SINGLE\nSRP1,SRR1,SINGLE\n";
        let table = BatchTable::from_text(text).unwrap().unwrap();
        let groups = table.study_groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].run_ids(), vec!["SRR1"]);
    }

    #[test]
    fn test_write_slice_keeps_all_columns() {
        let dir = tempfile::tempdir().unwrap();
        let upload_dir = dir.path().join("uploaded_files");
        let table = BatchTable::from_text(TABLE).unwrap().unwrap();
        let groups = table.study_groups();

        let path = table.write_slice(&groups[0], &upload_dir.join("SRP100.csv")).unwrap();
        assert!(path.is_file());

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "Run,SRA_study,LibraryLayout,Organism\n\
             SRR1,SRP100,PAIRED,Mus musculus\n\
             SRR2,SRP100,PAIRED,Mus musculus\n"
        );
    }

    #[test]
    fn test_write_slice_pads_short_rows() {
        let dir = tempfile::tempdir().unwrap();
        let text = "SRA_study,Run,LibraryLayout,Organism\nSRP1,SRR1,PAIRED,Mus\nSRP1,SRR2,PAIRED\n";
        let table = BatchTable::from_text(text).unwrap().unwrap();
        let groups = table.study_groups();
        assert_eq!(groups[0].run_ids(), vec!["SRR1", "SRR2"]);

        let path = table.write_slice(&groups[0], &dir.path().join("SRP1.csv")).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "SRA_study,Run,LibraryLayout,Organism\n\
             SRP1,SRR1,PAIRED,Mus\n\
             SRP1,SRR2,PAIRED,\n"
        );
    }

    #[test]
    fn test_group_configuration() {
        let table = BatchTable::from_text(TABLE).unwrap().unwrap();
        let group = &table.study_groups()[1];
        let config = group
            .configuration(KmerSize::default(), PathBuf::from("uploaded_files/SRP200.csv"))
            .unwrap();
        assert_eq!(config.study_id, "SRP200");
        assert_eq!(config.run_ids, vec!["SRR3"]);
        assert_eq!(
            config.source,
            RunSource::Table { slice_path: PathBuf::from("uploaded_files/SRP200.csv") }
        );
    }
}
