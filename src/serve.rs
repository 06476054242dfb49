//! Web form for launching pipeline runs
//!
//! Serves a single page with the launch form in a sidebar and the results
//! of the last submission in the main area. Requests are handled one at a
//! time: a submission runs every stage to completion before the server
//! answers anything else.

use crate::config::LauncherConfig;
use crate::driver::{PipelineDriver, RunSummary, StudyOutcome, StudyStatus};
use crate::form::{KmerSize, LaunchError, LibraryLayout, ManualInput, Stage};
use crate::report::{escape_html, ReportView};
use crate::runner::{CommandRunner, ProcessRunner};
use crate::table::BatchTable;
use anyhow::Result;
use std::collections::HashMap;
use std::io::Read;
use tiny_http::{Header, Method, Request, Response, Server};

/// Rows of an uploaded table shown back to the user
const PREVIEW_ROWS: usize = 5;

/// Which half of the form was submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMethod {
    Manual,
    Upload,
}

/// Form fields as posted by the browser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormFields {
    pub method: InputMethod,
    pub layout: Option<LibraryLayout>,
    pub study_id: String,
    pub run_ids: String,
    pub csv_name: String,
    pub csv_text: String,
    pub kmer_size: String,
}

impl FormFields {
    fn initial(config: &LauncherConfig) -> Self {
        FormFields {
            method: InputMethod::Manual,
            layout: Some(LibraryLayout::SingleEnd),
            study_id: String::new(),
            run_ids: String::new(),
            csv_name: String::new(),
            csv_text: String::new(),
            kmer_size: config.default_kmer_size.to_string(),
        }
    }

    /// Decode an `application/x-www-form-urlencoded` body
    pub fn from_urlencoded(body: &[u8]) -> Self {
        let params: HashMap<String, String> = url::form_urlencoded::parse(body).into_owned().collect();
        let get = |key: &str| params.get(key).cloned().unwrap_or_default();

        FormFields {
            method: if get("input_method") == "upload" {
                InputMethod::Upload
            } else {
                InputMethod::Manual
            },
            layout: get("layout").parse().ok(),
            study_id: get("study_id"),
            run_ids: get("run_ids"),
            csv_name: get("csv_name"),
            csv_text: get("csv_text"),
            kmer_size: get("kmer_size"),
        }
    }

    fn manual_input(&self) -> ManualInput {
        ManualInput {
            study_id: self.study_id.clone(),
            run_ids: self.run_ids.clone(),
            layout: self.layout,
        }
    }
}

/// Everything the page shows after a submission
#[derive(Debug, Clone)]
pub struct PageState {
    pub fields: FormFields,
    /// Validation error shown next to the form
    pub form_error: Option<LaunchError>,
    /// Head of the uploaded table, if one was parsed
    pub preview: Option<(Vec<String>, Vec<Vec<String>>)>,
    pub summary: Option<RunSummary>,
}

impl PageState {
    fn initial(config: &LauncherConfig) -> Self {
        PageState {
            fields: FormFields::initial(config),
            form_error: None,
            preview: None,
            summary: None,
        }
    }
}

fn parse_kmer_field(text: &str) -> std::result::Result<u32, LaunchError> {
    KmerSize::parse(text).map(u32::from)
}

/// Validate a submission and, if it is well-formed, run it
pub fn handle_submission<R: CommandRunner>(
    config: &LauncherConfig,
    runner: R,
    fields: FormFields,
) -> PageState {
    let mut state = PageState {
        fields,
        form_error: None,
        preview: None,
        summary: None,
    };
    let mut driver = PipelineDriver::new(config, runner).with_observer(|study, status| {
        if let StudyStatus::Running { stage } = status {
            log::info!("Study {}: running {}", study, stage);
        }
    });

    let result = match state.fields.method {
        InputMethod::Manual => {
            let input = state.fields.manual_input();
            match parse_kmer_field(&state.fields.kmer_size) {
                Ok(k) => driver.run_manual(input, k),
                Err(e) => input.check_fields().and(Err(e)),
            }
        }
        InputMethod::Upload => {
            if state.fields.csv_text.trim().is_empty() {
                Err(LaunchError::MissingInput("Please upload a CSV file.".to_string()))
            } else {
                match BatchTable::from_text(&state.fields.csv_text) {
                    Ok(Ok(table)) => {
                        state.preview = Some((
                            table.headers().iter().map(str::to_string).collect(),
                            table
                                .head(PREVIEW_ROWS)
                                .iter()
                                .map(|r| r.iter().map(str::to_string).collect())
                                .collect(),
                        ));
                        parse_kmer_field(&state.fields.kmer_size)
                            .and_then(|k| driver.run_batch(&table, k))
                    }
                    Ok(Err(e)) => {
                        // discard the upload
                        state.fields.csv_text.clear();
                        state.fields.csv_name.clear();
                        Err(e)
                    }
                    Err(e) => {
                        log::warn!("Unreadable upload: {:#}", e);
                        state.fields.csv_text.clear();
                        state.fields.csv_name.clear();
                        Err(LaunchError::MissingInput(format!("Could not read the CSV file: {:#}", e)))
                    }
                }
            }
        }
    };

    match result {
        Ok(summary) => state.summary = Some(summary),
        Err(e) => {
            log::warn!("Submission rejected: {}", e);
            state.form_error = Some(e);
        }
    }
    state
}

const REPORT_PREFIX: &str = "/report/";

/// URL of the full-page view of a study's report
fn report_link(study_id: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(study_id.as_bytes()).collect();
    format!("{}{}", REPORT_PREFIX, encoded)
}

/// Inverse of the encoding used by [`report_link`]
fn decode_path_segment(segment: &str) -> String {
    url::form_urlencoded::parse(segment.as_bytes())
        .next()
        .map(|(key, _)| key.into_owned())
        .unwrap_or_default()
}

fn header(name: &str, value: &str) -> Header {
    Header::from_bytes(name, value).expect("static header is valid")
}

fn html_response(html: String) -> Response<std::io::Cursor<Vec<u8>>> {
    Response::from_string(html).with_header(header("Content-Type", "text/html; charset=utf-8"))
}

/// Start the web server and handle requests until the process is stopped
pub fn start_server(config: &LauncherConfig, port: u16, open_browser: bool) -> Result<()> {
    let addr = format!("127.0.0.1:{}", port);
    let server = Server::http(&addr).map_err(|e| anyhow::anyhow!("Failed to start server: {}", e))?;

    let url = format!("http://localhost:{}", port);
    log::info!("Server running at {}", url);
    log::info!("Press Ctrl+C to stop");

    if open_browser {
        if let Err(e) = webbrowser::open(&url) {
            log::warn!("Could not open browser: {}. Please open {} manually.", e, url);
        }
    }

    let mut state = PageState::initial(config);

    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, config, &mut state) {
            log::error!("Failed to handle request: {:#}", e);
        }
    }

    Ok(())
}

fn handle_request(mut request: Request, config: &LauncherConfig, state: &mut PageState) -> Result<()> {
    let path = request.url().split('?').next().unwrap_or("/").to_string();
    let method = request.method().clone();
    log::debug!("{} {}", method, path);

    match (&method, path.as_str()) {
        (Method::Get, "/") | (Method::Get, "/index.html") => {
            request.respond(html_response(render_page(config, state)))?;
        }
        (Method::Post, "/run") => {
            let mut body = Vec::new();
            request.as_reader().read_to_end(&mut body)?;
            let fields = FormFields::from_urlencoded(&body);
            *state = handle_submission(config, ProcessRunner, fields);
            request.respond(html_response(render_page(config, state)))?;
        }
        (Method::Get, "/api/status") => {
            let json = serde_json::to_string_pretty(&state.summary)?;
            request.respond(
                Response::from_string(json).with_header(header("Content-Type", "application/json")),
            )?;
        }
        (Method::Get, p) if p.starts_with(REPORT_PREFIX) => {
            let study_id = decode_path_segment(&p[REPORT_PREFIX.len()..]);
            let study_id = study_id.as_str();
            let view = match crate::form::check_study_id(study_id) {
                Ok(()) => ReportView::load(config.report_path(study_id)),
                Err(_) => ReportView::NotFound { path: study_id.into() },
            };
            match view {
                ReportView::Rendered { content, .. } => request.respond(html_response(content))?,
                ReportView::NotFound { .. } => {
                    request.respond(Response::from_string("MultiQC report not found.").with_status_code(404))?
                }
            }
        }
        _ => {
            request.respond(Response::from_string("Not found").with_status_code(404))?;
        }
    }
    Ok(())
}

const PAGE_STYLE: &str = r#"
* { box-sizing: border-box; }
body { margin: 0; font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", sans-serif; color: #262730; display: flex; min-height: 100vh; }
aside { width: 340px; background: #f0f2f6; padding: 24px; flex-shrink: 0; }
main { flex: 1; padding: 32px 48px; overflow-x: auto; }
h1 { margin-top: 0; }
h2 { font-size: 1.2em; margin-top: 1.5em; }
label { display: block; margin: 12px 0 4px; font-size: 0.9em; }
input[type=text], input[type=number], textarea { width: 100%; padding: 6px 8px; border: 1px solid #ccc; border-radius: 4px; font: inherit; }
textarea { min-height: 70px; }
fieldset { border: none; padding: 0; margin: 0; }
.radio label { display: inline; margin-right: 12px; }
button { margin-top: 18px; padding: 8px 16px; border: 1px solid #ff4b4b; background: #fff; color: #ff4b4b; border-radius: 4px; cursor: pointer; font: inherit; }
button:disabled { opacity: 0.6; cursor: progress; }
.error { background: #ffe4e4; color: #7d1a1a; padding: 10px 12px; border-radius: 4px; margin: 10px 0; }
.success { background: #dff5e3; color: #165a25; padding: 10px 12px; border-radius: 4px; margin: 10px 0; }
.info { background: #e4efff; color: #1a3d7d; padding: 10px 12px; border-radius: 4px; margin: 10px 0; font-size: 0.9em; }
pre { background: #f6f8fa; padding: 10px; overflow-x: auto; font-size: 0.85em; white-space: pre-wrap; }
table.preview { border-collapse: collapse; font-size: 0.8em; margin: 8px 0; display: block; overflow-x: auto; }
table.preview td, table.preview th { border: 1px solid #ddd; padding: 2px 6px; }
#busy { display: none; margin-top: 12px; font-style: italic; }
"#;

const PAGE_SCRIPT: &str = r#"
function syncMethod() {
  var upload = document.getElementById('method-upload').checked;
  document.getElementById('manual-fields').style.display = upload ? 'none' : 'block';
  document.getElementById('upload-fields').style.display = upload ? 'block' : 'none';
}
document.querySelectorAll('input[name=input_method]').forEach(function (el) {
  el.addEventListener('change', syncMethod);
});
document.getElementById('csv_file').addEventListener('change', function (ev) {
  var file = ev.target.files[0];
  if (!file) { return; }
  var reader = new FileReader();
  reader.onload = function () {
    document.getElementById('csv_text').value = reader.result;
    document.getElementById('csv_name').value = file.name;
    document.getElementById('csv_loaded').textContent = 'Loaded ' + file.name;
  };
  reader.readAsText(file);
});
document.getElementById('launch-form').addEventListener('submit', function () {
  document.getElementById('run-button').disabled = true;
  document.getElementById('busy').style.display = 'block';
});
syncMethod();
"#;

/// Render the whole page for the current state
pub fn render_page(config: &LauncherConfig, state: &PageState) -> String {
    let fields = &state.fields;
    let checked = |on: bool| if on { " checked" } else { "" };

    let form_error = state
        .form_error
        .as_ref()
        .map(|e| format!(r#"<div class="error">{}</div>"#, escape_html(&e.to_string())))
        .unwrap_or_default();

    let csv_loaded = if fields.csv_name.is_empty() {
        String::new()
    } else {
        format!("Loaded {}", escape_html(&fields.csv_name))
    };

    let preview = state
        .preview
        .as_ref()
        .map(|(headers, rows)| render_preview(headers, rows))
        .unwrap_or_default();

    let results = state
        .summary
        .as_ref()
        .map(render_summary)
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>RNA-seq Pipeline Interface</title>
<style>{style}</style>
</head>
<body>
<aside>
  <h2>Pipeline Configuration</h2>
  <form id="launch-form" method="post" action="/run">
    <label>Select input method:</label>
    <div class="radio">
      <input type="radio" id="method-manual" name="input_method" value="manual"{manual_checked}><label for="method-manual">Manual Input</label>
      <input type="radio" id="method-upload" name="input_method" value="upload"{upload_checked}><label for="method-upload">Upload CSV</label>
    </div>
    <fieldset id="manual-fields">
      <label>Select your file type:</label>
      <div class="radio">
        <input type="radio" id="layout-single" name="layout" value="single-end"{single_checked}><label for="layout-single">Single-end</label>
        <input type="radio" id="layout-paired" name="layout" value="paired-end"{paired_checked}><label for="layout-paired">Paired-end</label>
      </div>
      <label for="study_id">Enter the Study number:</label>
      <input type="text" id="study_id" name="study_id" value="{study_id}">
      <label for="run_ids">Enter the run numbers (separated by spaces):</label>
      <textarea id="run_ids" name="run_ids">{run_ids}</textarea>
    </fieldset>
    <fieldset id="upload-fields">
      <label for="csv_file">Upload CSV file</label>
      <input type="file" id="csv_file" accept=".csv,text/csv">
      <div id="csv_loaded">{csv_loaded}</div>
      <input type="hidden" id="csv_name" name="csv_name" value="{csv_name}">
      <textarea id="csv_text" name="csv_text" hidden>{csv_text}</textarea>
      {preview}
    </fieldset>
    <label for="kmer_size">Enter the k-mer size:</label>
    <input type="number" id="kmer_size" name="kmer_size" min="1" step="1" value="{kmer_size}">
    {form_error}
    <button type="submit" id="run-button">Run Pipeline</button>
    <div id="busy">Running pipeline, this can take a long time...</div>
  </form>
  <h2>Instructions</h2>
  <div class="info">
    1. Select the input method: manual input or upload CSV.<br>
    2. If manual input, select the file type and enter the study number and run numbers.<br>
    3. If uploading a CSV, ensure it contains the columns SRA_study, Run and LibraryLayout.<br>
    4. Enter the k-mer size for indexing (must be odd).<br>
    5. Click on "Run Pipeline" to start the process.
  </div>
  <h2>About</h2>
  <div class="info">This interface runs the RNA-seq pipeline and shows the MultiQC report of each study. Outputs are written under <code>{output_root}</code>.</div>
</aside>
<main>
  <h1>RNA-seq Pipeline Interface</h1>
  {results}
</main>
<script>{script}</script>
</body>
</html>"#,
        style = PAGE_STYLE,
        script = PAGE_SCRIPT,
        manual_checked = checked(fields.method == InputMethod::Manual),
        upload_checked = checked(fields.method == InputMethod::Upload),
        single_checked = checked(fields.layout != Some(LibraryLayout::PairedEnd)),
        paired_checked = checked(fields.layout == Some(LibraryLayout::PairedEnd)),
        study_id = escape_html(&fields.study_id),
        run_ids = escape_html(&fields.run_ids),
        csv_loaded = csv_loaded,
        csv_name = escape_html(&fields.csv_name),
        csv_text = escape_html(&fields.csv_text),
        preview = preview,
        kmer_size = escape_html(&fields.kmer_size),
        form_error = form_error,
        output_root = escape_html(&config.output_root.display().to_string()),
        results = results,
    )
}

fn render_preview(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut html = String::from(r#"<div class="success">File uploaded successfully:</div><table class="preview"><tr>"#);
    for h in headers {
        html.push_str(&format!("<th>{}</th>", escape_html(h)));
    }
    html.push_str("</tr>");
    for row in rows {
        html.push_str("<tr>");
        for cell in row {
            html.push_str(&format!("<td>{}</td>", escape_html(cell)));
        }
        html.push_str("</tr>");
    }
    html.push_str("</table>");
    html
}

fn render_summary(summary: &RunSummary) -> String {
    let mut html = String::from("<h2>Pipeline Execution</h2>");
    for outcome in &summary.outcomes {
        html.push_str(&render_outcome(outcome));
    }
    html
}

fn render_outcome(outcome: &StudyOutcome) -> String {
    let study = escape_html(&outcome.study_id);
    let mut html = format!("<section><h3>Study {}</h3>", study);

    for command in &outcome.commands {
        html.push_str(&format!("<pre>Executing: {}</pre>", escape_html(command)));
    }

    match &outcome.status {
        StudyStatus::Failed { exit_code: None, .. } => {
            if let Some(e) = outcome.error() {
                html.push_str(&format!(r#"<div class="error">{}</div>"#, escape_html(&e.to_string())));
            }
        }
        StudyStatus::Failed { stage, exit_code, stderr } => {
            let code = exit_code.map(|c| format!(" (exit code {})", c)).unwrap_or_default();
            let title = match stage {
                Stage::Download => "Download Script Error Details",
                Stage::Analyze => "Workflow Error Details",
            };
            html.push_str(&format!(
                r#"<div class="error">Error running {} for study {}{}.</div><h4>{}</h4><pre>{}</pre>"#,
                stage,
                study,
                code,
                title,
                escape_html(stderr)
            ));
        }
        StudyStatus::Rejected { reason } => {
            html.push_str(&format!(r#"<div class="error">{}</div>"#, escape_html(reason)));
        }
        StudyStatus::Succeeded => {
            html.push_str(&format!(
                r#"<div class="success">Pipeline ran successfully for study {}!</div><h2>MultiQC Report</h2>"#,
                study
            ));
            if let Some(report) = &outcome.report {
                html.push_str(&report.to_html());
                if report.is_rendered() {
                    html.push_str(&format!(
                        r#"<p><a href="{}" target="_blank">Open report in a new tab</a></p>"#,
                        escape_html(&report_link(&outcome.study_id))
                    ));
                }
            }
        }
        StudyStatus::Idle | StudyStatus::Running { .. } => {}
    }

    html.push_str("</section>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ExecutionResult;
    use std::cell::RefCell;
    use std::path::Path;

    #[derive(Default)]
    struct RecordingRunner {
        calls: RefCell<Vec<Vec<String>>>,
        exit_code: i32,
    }

    impl CommandRunner for &RecordingRunner {
        fn run(&self, program: &str, args: &[String]) -> ExecutionResult {
            let mut call = vec![program.to_string()];
            call.extend(args.iter().cloned());
            self.calls.borrow_mut().push(call);
            ExecutionResult {
                stdout: String::new(),
                stderr: "<boom>".to_string(),
                exit_code: self.exit_code,
            }
        }
    }

    fn test_config(root: &Path) -> LauncherConfig {
        LauncherConfig {
            output_root: root.join("Output"),
            upload_dir: root.join("uploaded_files"),
            ..LauncherConfig::default()
        }
    }

    #[test]
    fn test_decode_form_body() {
        let body = b"input_method=manual&layout=paired-end&study_id=SRP123&run_ids=SRR1+SRR2%0D%0ASRR3&kmer_size=21";
        let fields = FormFields::from_urlencoded(body);
        assert_eq!(fields.method, InputMethod::Manual);
        assert_eq!(fields.layout, Some(LibraryLayout::PairedEnd));
        assert_eq!(fields.study_id, "SRP123");
        assert_eq!(fields.run_ids, "SRR1 SRR2\r\nSRR3");
        assert_eq!(fields.kmer_size, "21");
    }

    #[test]
    fn test_missing_fields_reported_before_kmer() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let runner = RecordingRunner::default();

        let fields = FormFields::from_urlencoded(b"input_method=manual&layout=single-end&kmer_size=abc");
        let state = handle_submission(&config, &runner, fields);
        assert!(matches!(state.form_error, Some(LaunchError::MissingInput(_))));

        let fields = FormFields::from_urlencoded(
            b"input_method=manual&layout=single-end&study_id=SRP1&run_ids=SRR1&kmer_size=abc",
        );
        let state = handle_submission(&config, &runner, fields);
        assert!(matches!(state.form_error, Some(LaunchError::InvalidKmerSize(_))));
        assert!(runner.calls.borrow().is_empty());
    }

    #[test]
    fn test_upload_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let runner = RecordingRunner::default();

        let fields = FormFields::from_urlencoded(b"input_method=upload&kmer_size=15");
        let state = handle_submission(&config, &runner, fields);
        assert_eq!(
            state.form_error,
            Some(LaunchError::MissingInput("Please upload a CSV file.".to_string()))
        );
    }

    #[test]
    fn test_malformed_upload_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let runner = RecordingRunner::default();

        let body = b"input_method=upload&csv_name=runs.csv&csv_text=Run%2CStudy%0ASRR1%2CSRP1%0A&kmer_size=15";
        let state = handle_submission(&config, &runner, FormFields::from_urlencoded(body));
        assert!(matches!(state.form_error, Some(LaunchError::MalformedTable { .. })));
        assert!(state.fields.csv_text.is_empty());
        assert!(state.preview.is_none());
        assert!(runner.calls.borrow().is_empty());
    }

    #[test]
    fn test_batch_submission_renders_failures() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let runner = RecordingRunner { exit_code: 1, ..Default::default() };

        let body = b"input_method=upload&csv_name=runs.csv&csv_text=SRA_study%2CRun%2CLibraryLayout%0ASRP1%2CSRR1%2CPAIRED%0ASRP2%2CSRR2%2CSINGLE%0A&kmer_size=15";
        let state = handle_submission(&config, &runner, FormFields::from_urlencoded(body));
        assert!(state.form_error.is_none());

        let summary = state.summary.as_ref().unwrap();
        assert_eq!(summary.outcomes.len(), 2);
        // download fails for both, so no analysis is attempted
        assert_eq!(runner.calls.borrow().len(), 2);

        let (headers, rows) = state.preview.as_ref().unwrap();
        assert_eq!(headers, &vec!["SRA_study", "Run", "LibraryLayout"]);
        assert_eq!(rows.len(), 2);

        let html = render_page(&config, &state);
        assert!(html.contains("Error running download script for study SRP1 (exit code 1)."));
        assert!(html.contains("<pre>&lt;boom&gt;</pre>"));
        assert!(html.contains("File uploaded successfully:"));
    }

    #[test]
    fn test_successful_run_without_report() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let runner = RecordingRunner::default();

        let body = b"input_method=manual&layout=paired-end&study_id=SRP123&run_ids=SRR1+SRR2&kmer_size=15";
        let state = handle_submission(&config, &runner, FormFields::from_urlencoded(body));

        let calls = runner.calls.borrow();
        assert_eq!(calls[0], vec!["python", "fastqdl.py", "manual", "Paired-end", "SRP123", "SRR1", "SRR2"]);
        assert_eq!(calls[1][2], "paired_end_rnaseq.nf");

        let html = render_page(&config, &state);
        assert!(html.contains("Pipeline ran successfully for study SRP123!"));
        assert!(html.contains("MultiQC report not found."));
    }

    #[test]
    fn test_report_link_round_trips_study_id() {
        for study in ["SRP123", "my study", "a#b?c", "x+y&z=1"] {
            let link = report_link(study);
            assert!(link.starts_with("/report/"));
            let segment = &link["/report/".len()..];
            assert!(!segment.contains(|c: char| "#? &".contains(c)));
            assert_eq!(decode_path_segment(segment), study);
        }
    }

    #[test]
    fn test_preparation_failure_names_file_operation() {
        let outcome = StudyOutcome {
            study_id: "SRP9".to_string(),
            status: StudyStatus::Failed {
                stage: Stage::Analyze,
                exit_code: None,
                stderr: "Failed to create Output/SRP9: Permission denied".to_string(),
            },
            commands: vec![],
            report: None,
        };
        let html = render_outcome(&outcome);
        assert!(html.contains(
            "Could not prepare workflow for study SRP9: Failed to create Output/SRP9: Permission denied"
        ));
        assert!(!html.contains("Error running"));
    }

    #[test]
    fn test_initial_page_has_defaults() {
        let config = LauncherConfig::default();
        let html = render_page(&config, &PageState::initial(&config));
        assert!(html.contains(r#"name="kmer_size" min="1" step="1" value="15""#));
        assert!(html.contains("Run Pipeline"));
        assert!(!html.contains("Pipeline Execution"));
    }
}
