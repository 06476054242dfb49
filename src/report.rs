//! MultiQC report viewer
//!
//! The report is produced by the workflow; this module only checks that it
//! exists and embeds it for display.

use crate::form::LaunchError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Height of the embedded report frame, in pixels
pub const REPORT_FRAME_HEIGHT: u32 = 800;

/// What the viewer found at the report path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportView {
    Rendered {
        path: PathBuf,
        #[serde(skip_serializing)]
        #[serde(default)]
        content: String,
    },
    NotFound {
        path: PathBuf,
    },
}

impl ReportView {
    /// Load the report at `path`. Never fails: a missing or unreadable file
    /// yields [`ReportView::NotFound`].
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            log::warn!("MultiQC report not found: {}", path.display());
            return ReportView::NotFound { path };
        }
        match std::fs::read(&path) {
            Ok(bytes) => {
                log::info!("Loaded MultiQC report: {} ({} bytes)", path.display(), bytes.len());
                ReportView::Rendered {
                    content: String::from_utf8_lossy(&bytes).into_owned(),
                    path,
                }
            }
            Err(e) => {
                log::error!("Failed to read {}: {}", path.display(), e);
                ReportView::NotFound { path }
            }
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            ReportView::Rendered { path, .. } | ReportView::NotFound { path } => path,
        }
    }

    pub fn is_rendered(&self) -> bool {
        matches!(self, ReportView::Rendered { .. })
    }

    /// The missing-artifact error, if the report was not found
    pub fn error(&self) -> Option<LaunchError> {
        match self {
            ReportView::Rendered { .. } => None,
            ReportView::NotFound { path } => {
                Some(LaunchError::MissingReportArtifact { path: path.clone() })
            }
        }
    }

    /// HTML fragment: the report in a fixed-height scrollable frame, or an
    /// error block
    pub fn to_html(&self) -> String {
        match self {
            ReportView::Rendered { content, path } => format!(
                r#"<iframe class="report" title="{}" style="width:100%;height:{}px;border:1px solid #ddd" scrolling="yes" sandbox="allow-scripts" srcdoc="{}"></iframe>"#,
                escape_html(&path.display().to_string()),
                REPORT_FRAME_HEIGHT,
                escape_html(content)
            ),
            ReportView::NotFound { path } => format!(
                r#"<div class="error">MultiQC report not found. <code>{}</code></div>"#,
                escape_html(&path.display().to_string())
            ),
        }
    }
}

/// Escape text for use in HTML content and double-quoted attributes
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_existing_report_rendered_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("multiqc_report.html");
        let html = "<html><body>QC \"ok\" & done</body></html>";
        std::fs::write(&path, html).unwrap();

        let view = ReportView::load(&path);
        assert!(view.is_rendered());
        assert!(view.error().is_none());
        match &view {
            ReportView::Rendered { content, .. } => assert_eq!(content, html),
            other => panic!("expected Rendered, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_report_is_not_an_error_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("multiqc_report.html");

        let view = ReportView::load(&path);
        assert_eq!(view, ReportView::NotFound { path: path.clone() });
        assert_eq!(view.error(), Some(LaunchError::MissingReportArtifact { path }));
        assert!(view.to_html().contains("MultiQC report not found."));
    }

    #[test]
    fn test_srcdoc_is_escaped() {
        let view = ReportView::Rendered {
            path: PathBuf::from("r.html"),
            content: "<p class=\"x\">a & b</p>".to_string(),
        };
        let html = view.to_html();
        assert!(html.contains(r#"srcdoc="&lt;p class=&quot;x&quot;&gt;a &amp; b&lt;/p&gt;""#));
        assert!(html.contains("height:800px"));
    }
}
