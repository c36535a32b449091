mod parse;

pub use parse::{parse_json_output, parse_text_output};

use std::io::Write;
use std::process::Command;

use thiserror::Error;

use crate::diagnostics::{DiagnosticLine, Severity};

/// How to invoke the external checker binary.
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    pub program: String,
    pub base_args: Vec<String>,
    /// Ask for mypy's line-delimited JSON report instead of the text format.
    pub json_output: bool,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            program: "mypy".to_string(),
            base_args: vec![
                "--ignore-missing-imports".to_string(),
                "--allow-redefinition".to_string(),
            ],
            json_output: false,
        }
    }
}

/// Outcome of one checker run. Invocation failures never surface as an Err;
/// they degrade to a single synthetic diagnostic at line 0.
#[derive(Debug, Default)]
pub struct CheckReport {
    pub diagnostics: Vec<DiagnosticLine>,
    /// Stderr of a run the checker rejected outright (mypy exit code 2),
    /// which usually means the extra option list is bad.
    pub usage_error: Option<String>,
}

#[derive(Debug, Error)]
enum CheckError {
    #[error("{0}")]
    Invoke(#[from] std::io::Error),
    #[error("checker produced non-UTF-8 output")]
    Decode,
}

/// Run the checker against the synthetic document, blocking until it
/// returns. There is no timeout: a hung checker hangs the cell.
pub fn run_check(document: &str, config: &CheckerConfig, extra_args: &[String]) -> CheckReport {
    match try_check(document, config, extra_args) {
        Ok(report) => report,
        Err(err) => CheckReport {
            diagnostics: vec![DiagnosticLine {
                absolute_line: 0,
                severity: Severity::Error,
                message: format!("type checker '{}' could not be run: {}", config.program, err),
                code: None,
            }],
            usage_error: None,
        },
    }
}

fn try_check(
    document: &str,
    config: &CheckerConfig,
    extra_args: &[String],
) -> Result<CheckReport, CheckError> {
    // The checker reads from an ephemeral file; nothing persists after the
    // run.
    let mut input = tempfile::Builder::new()
        .prefix("nb-typecheck-")
        .suffix(".py")
        .tempfile()?;
    input.write_all(document.as_bytes())?;
    input.flush()?;

    let mut cmd = Command::new(&config.program);
    cmd.args(&config.base_args);
    cmd.args(extra_args);
    if config.json_output {
        cmd.arg("--output").arg("json");
    }
    cmd.arg(input.path());

    log::debug!("checker argv: {:?}", cmd);

    let output = cmd.output()?;
    let stdout = std::str::from_utf8(&output.stdout).map_err(|_| CheckError::Decode)?;
    let stderr = String::from_utf8_lossy(&output.stderr);

    log::debug!(
        "checker exit {:?}, stdout:\n{}",
        output.status.code(),
        stdout
    );

    let diagnostics = if config.json_output {
        parse_json_output(stdout)
    } else {
        parse_text_output(stdout)
    };

    let mut report = CheckReport {
        diagnostics,
        usage_error: None,
    };
    if output.status.code() == Some(2) && !stderr.trim().is_empty() {
        report.usage_error = Some(stderr.trim().to_string());
    } else if !output.status.success() && report.diagnostics.is_empty() {
        // The checker spawned but crashed, or produced output we could not
        // parse. That must not pass silently.
        let detail = if !stderr.trim().is_empty() {
            stderr.trim().to_string()
        } else if !stdout.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            "no output".to_string()
        };
        report.diagnostics.push(DiagnosticLine {
            absolute_line: 0,
            severity: Severity::Error,
            message: format!(
                "type checker '{}' failed ({}): {}",
                config.program, output.status, detail
            ),
            code: None,
        });
    }
    Ok(report)
}
