use serde::Deserialize;

use crate::diagnostics::{DiagnosticLine, Severity};

/// One entry of mypy's `--output json` report, one JSON object per line.
/// `file`, `column` and `hint` are present in the format but unused here.
#[derive(Debug, Deserialize)]
struct JsonDiagnostic {
    line: i64,
    severity: String,
    message: String,
    #[serde(default)]
    code: Option<String>,
}

pub fn parse_json_output(stdout: &str) -> Vec<DiagnosticLine> {
    stdout
        .lines()
        .filter_map(|line| {
            let parsed: JsonDiagnostic = serde_json::from_str(line).ok()?;
            Some(DiagnosticLine {
                absolute_line: parsed.line.max(0) as usize,
                severity: Severity::parse(&parsed.severity).unwrap_or(Severity::Error),
                message: parsed.message,
                code: parsed.code,
            })
        })
        .collect()
}

/// Parse mypy's plain text report: `file:line[:col[:...]]: severity: message
/// [code]`. Lines that do not match, such as the trailing "Found N errors"
/// summary, are dropped.
pub fn parse_text_output(stdout: &str) -> Vec<DiagnosticLine> {
    stdout.lines().filter_map(parse_text_line).collect()
}

fn parse_text_line(line: &str) -> Option<DiagnosticLine> {
    let mut parts = line.split(':');
    let _file = parts.next()?;
    let absolute_line: usize = parts.next()?.trim().parse().ok()?;

    // Skip optional column (and end-position) fields before the severity.
    let mut field = parts.next()?.trim();
    while !field.is_empty() && field.chars().all(|c| c.is_ascii_digit()) {
        field = parts.next()?.trim();
    }
    let severity = Severity::parse(field)?;

    let message = parts.collect::<Vec<_>>().join(":");
    let (message, code) = split_code(message.trim());

    Some(DiagnosticLine {
        absolute_line,
        severity,
        message,
        code,
    })
}

/// Split the trailing `  [error-code]` marker off a message, if present.
fn split_code(message: &str) -> (String, Option<String>) {
    if message.ends_with(']') {
        if let Some(open) = message.rfind("  [") {
            let code = &message[open + 3..message.len() - 1];
            if !code.is_empty() && !code.contains(']') {
                return (message[..open].trim_end().to_string(), Some(code.to_string()));
            }
        }
    }
    (message.to_string(), None)
}
