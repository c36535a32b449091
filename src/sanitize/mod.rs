mod rules;

pub use rules::{default_rules, Rule};

/// True when the whole cell is a cell magic (`%%...`). Such cells are not
/// Python at all and are skipped entirely: not recorded, not checked.
pub fn is_cell_magic(cell: &str) -> bool {
    cell.starts_with("%%")
}

/// Apply line rules to a cell, yielding one output line per input line.
///
/// A single trailing newline on the cell is not a line of its own; beyond
/// that, every input line maps to exactly one output line so that checker
/// line numbers stay in step with the cell as typed.
pub fn sanitize_lines(source: &str, rules: &[Rule]) -> Vec<String> {
    let body = source.strip_suffix('\n').unwrap_or(source);
    body.split('\n').map(|line| apply_rules(line, rules)).collect()
}

/// Convenience wrapper over [`sanitize_lines`] returning the joined text.
pub fn sanitize_cell(source: &str, rules: &[Rule]) -> String {
    sanitize_lines(source, rules).join("\n")
}

fn apply_rules(line: &str, rules: &[Rule]) -> String {
    for rule in rules {
        if (rule.matches)(line) {
            return rule.replacement.to_string();
        }
    }
    line.to_string()
}
