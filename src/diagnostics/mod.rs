use std::fmt;

use crate::session::CellOffsets;

/// Sentinel identifier for diagnostics that cannot be attributed to a cell:
/// synthetic line-0 failures and anything outside the offset table.
pub const UNKNOWN_CELL: &str = "<unknown>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl Severity {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "error" => Some(Severity::Error),
            "warning" => Some(Severity::Warning),
            "note" => Some(Severity::Note),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One checker finding, positioned in the synthetic document. Transient:
/// produced per check run and discarded after remapping.
#[derive(Debug, Clone)]
pub struct DiagnosticLine {
    pub absolute_line: usize,
    pub severity: Severity,
    pub message: String,
    pub code: Option<String>,
}

/// A finding attributed back to the cell it originated from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemappedDiagnostic {
    pub cell_id: String,
    /// 1-based line within the cell.
    pub relative_line: usize,
    pub severity: Severity,
    pub message: String,
    pub code: Option<String>,
}

/// Map each diagnostic's synthetic-document line back to "line N of cell I".
///
/// The result is grouped by cell in document order regardless of the order
/// the checker reported in; unattributable diagnostics come first. Within a
/// cell the checker's order is kept, since notes attach to the error they
/// follow.
pub fn remap(diagnostics: &[DiagnosticLine], offsets: &CellOffsets) -> Vec<RemappedDiagnostic> {
    let mut keyed: Vec<(usize, RemappedDiagnostic)> = diagnostics
        .iter()
        .map(|diag| match offsets.locate(diag.absolute_line) {
            Some(loc) => (
                loc.offset + 1,
                RemappedDiagnostic {
                    cell_id: loc.id.to_string(),
                    relative_line: loc.relative_line,
                    severity: diag.severity,
                    message: rewrite_line_refs(&diag.message, loc.offset),
                    code: diag.code.clone(),
                },
            ),
            None => (
                0,
                RemappedDiagnostic {
                    cell_id: UNKNOWN_CELL.to_string(),
                    relative_line: diag.absolute_line,
                    severity: diag.severity,
                    message: diag.message.clone(),
                    code: diag.code.clone(),
                },
            ),
        })
        .collect();

    // Stable sort on the cell's span start.
    keyed.sort_by_key(|(key, _)| *key);
    keyed.into_iter().map(|(_, diag)| diag).collect()
}

/// Format remapped diagnostics for the host's error stream, one mypy-style
/// line per finding. [`remap`] hands the input over grouped by cell.
pub fn render(remapped: &[RemappedDiagnostic]) -> String {
    let mut out = String::new();
    for diag in remapped {
        out.push_str(&format!(
            "cell {}:{}: {}: {}",
            diag.cell_id, diag.relative_line, diag.severity, diag.message
        ));
        if let Some(code) = &diag.code {
            out.push_str(&format!("  [{}]", code));
        }
        out.push('\n');
    }
    out
}

/// Rewrite `line N` references inside a message so they are relative to the
/// attributed cell rather than the synthetic document. References at or
/// before the cell's start are left alone.
pub fn rewrite_line_refs(message: &str, offset: usize) -> String {
    if offset == 0 {
        return message.to_string();
    }

    const NEEDLE: &str = "line ";
    let mut out = String::with_capacity(message.len());
    let mut rest = message;

    while let Some(pos) = rest.find(NEEDLE) {
        let (head, tail) = rest.split_at(pos + NEEDLE.len());
        out.push_str(head);
        let digits = tail.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits == 0 {
            rest = tail;
            continue;
        }
        let number: usize = tail[..digits].parse().unwrap_or(0);
        if number > offset {
            out.push_str(&(number - offset).to_string());
        } else {
            out.push_str(&tail[..digits]);
        }
        rest = &tail[digits..];
    }

    out.push_str(rest);
    out
}
