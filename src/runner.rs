//! External command execution
//!
//! Runs the download tool and the workflow engine as child processes with
//! structured argument lists (no shell), blocking until they exit and
//! buffering everything they print.

use shell_escape::escape;
use std::borrow::Cow;
use std::process::{Command, Stdio};
use std::time::Instant;

/// Exit code reported when the program could not be started at all,
/// the same code a shell uses for "command not found".
pub const SPAWN_FAILURE_EXIT_CODE: i32 = 127;

/// Exit code reported when the child was terminated by a signal.
pub const SIGNALLED_EXIT_CODE: i32 = -1;

/// Captured result of one external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ExecutionResult {
    /// Zero exit code means success, anything else is a failure
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Something that can run a program to completion.
///
/// Command failure is reported only through [`ExecutionResult::exit_code`];
/// implementations never return an error for a non-zero exit.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[String]) -> ExecutionResult;
}

/// Runs commands as real child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, program: &str, args: &[String]) -> ExecutionResult {
        let command_line = display_command(program, args);
        log::debug!("Running: {}", command_line);
        let start = Instant::now();

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output();

        let result = match output {
            Ok(output) => ExecutionResult {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                exit_code: output.status.code().unwrap_or(SIGNALLED_EXIT_CODE),
            },
            Err(e) => {
                log::warn!("Failed to start {}: {}", program, e);
                ExecutionResult {
                    stdout: String::new(),
                    stderr: format!("{}: {}", program, e),
                    exit_code: SPAWN_FAILURE_EXIT_CODE,
                }
            }
        };

        log::debug!(
            "{} exited with code {} after {:.1}s",
            program,
            result.exit_code,
            start.elapsed().as_secs_f64()
        );
        result
    }
}

/// Render a program and its arguments as a copy-pasteable shell line.
/// Only used for display; commands are never run through a shell.
pub fn display_command(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .map(|part| escape(Cow::Borrowed(part)).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_command_quotes_spaces() {
        let args = vec!["run".to_string(), "my script.nf".to_string()];
        assert_eq!(display_command("nextflow", &args), "nextflow run 'my script.nf'");
    }

    #[test]
    fn test_missing_program_reports_127() {
        let result = ProcessRunner.run("definitely-not-a-real-program-xyz", &[]);
        assert_eq!(result.exit_code, SPAWN_FAILURE_EXIT_CODE);
        assert!(!result.success());
        assert!(result.stderr.contains("definitely-not-a-real-program-xyz"));
    }

    #[cfg(unix)]
    #[test]
    fn test_captures_output_and_exit_code() {
        let args = vec![
            "-c".to_string(),
            "echo out; echo err 1>&2; exit 3".to_string(),
        ];
        let result = ProcessRunner.run("sh", &args);
        assert_eq!(result.stdout, "out\n");
        assert_eq!(result.stderr, "err\n");
        assert_eq!(result.exit_code, 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_arguments_are_not_shell_interpreted() {
        let args = vec!["$HOME; echo injected".to_string()];
        let result = ProcessRunner.run("echo", &args);
        assert!(result.success());
        assert_eq!(result.stdout, "$HOME; echo injected\n");
    }
}
