/// A line-preserving sanitization rule.
///
/// When `matches` accepts a line, the whole line is replaced by
/// `replacement`, which must itself be a single line. Host-only constructs
/// are neutralized by adding a rule here; the remap logic never needs to
/// know about them.
pub struct Rule {
    pub name: &'static str,
    pub matches: fn(&str) -> bool,
    pub replacement: &'static str,
}

/// The rules applied to every cell before it enters the synthetic document.
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule {
            name: "line-magic",
            matches: is_line_magic,
            replacement: "",
        },
        Rule {
            name: "shell-escape",
            matches: is_shell_escape,
            replacement: "",
        },
        Rule {
            name: "help-query",
            matches: is_help_query,
            replacement: "",
        },
        Rule {
            name: "reveal-type",
            matches: is_reveal_type,
            replacement: "",
        },
    ]
}

fn first_non_whitespace(line: &str) -> Option<char> {
    line.chars().find(|c| !c.is_whitespace())
}

/// `%matplotlib inline` and friends; also catches `%%` lines inside a cell.
fn is_line_magic(line: &str) -> bool {
    first_non_whitespace(line) == Some('%')
}

/// `!pip install ...`
fn is_shell_escape(line: &str) -> bool {
    first_non_whitespace(line) == Some('!')
}

/// `?print` or `print?` style help lookups.
fn is_help_query(line: &str) -> bool {
    first_non_whitespace(line) == Some('?') || line.ends_with('?')
}

/// A statement-level `reveal_type(...)` call. The checker consumes it the
/// first time around; keeping it in the accumulated program would report the
/// same revelation on every later cell.
fn is_reveal_type(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with("reveal_type(") && trimmed.ends_with(')')
}
