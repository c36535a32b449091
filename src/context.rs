use crate::checker::{run_check, CheckerConfig};
use crate::command::{parse_command, CommandError, MagicCommand};
use crate::diagnostics::{remap, render, DiagnosticLine, Severity};
use crate::sanitize::{default_rules, is_cell_magic, Rule};
use crate::session::SessionHistory;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Toggles read by the check pipeline before every run. Changed only by
/// explicit `%nb_mypy` commands.
#[derive(Debug, Clone)]
pub struct ModeState {
    pub enabled: bool,
    pub debug: bool,
    pub extra_args: Vec<String>,
}

impl Default for ModeState {
    fn default() -> Self {
        Self {
            enabled: true,
            debug: false,
            extra_args: Vec::new(),
        }
    }
}

/// Session-wide state: the cell history, the mode toggles and the checker
/// configuration. One instance per kernel process, created at load and
/// passed into the host's event handlers; dropped at shutdown, nothing
/// persists.
pub struct TypecheckContext {
    history: SessionHistory,
    mode: ModeState,
    checker: CheckerConfig,
    rules: Vec<Rule>,
}

impl Default for TypecheckContext {
    fn default() -> Self {
        Self::new(CheckerConfig::default())
    }
}

impl TypecheckContext {
    pub fn new(checker: CheckerConfig) -> Self {
        log::info!("nb-typecheck version {}", VERSION);
        Self {
            history: SessionHistory::new(),
            mode: ModeState::default(),
            checker,
            rules: default_rules(),
        }
    }

    pub fn mode(&self) -> &ModeState {
        &self.mode
    }

    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    /// Register an extra host-only construct to neutralize before checking.
    pub fn push_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Pre-execution hook: record the cell, check the accumulated program
    /// and return the rendered diagnostics, if any. Diagnostics are
    /// advisory; the caller runs the cell regardless of what this returns,
    /// and no failure in here ever reaches the host's execution loop.
    pub fn pre_run_cell(&mut self, id: &str, raw_source: &str) -> Option<String> {
        if !self.mode.enabled {
            return None;
        }
        if is_cell_magic(raw_source) {
            return None;
        }

        self.history.record_execution(id, raw_source, &self.rules);
        let (document, offsets) = self.history.synthetic_document();

        // The DebugOn toggle is the gate here, so the dump is emitted at a
        // level the default filter lets through.
        if self.mode.debug {
            log::info!("program so far:\n{}", document);
            log::info!("extra checker args: {:?}", self.mode.extra_args);
        }

        let report = run_check(&document, &self.checker, &self.mode.extra_args);

        let mut diagnostics = report.diagnostics;
        if let Some(stderr) = report.usage_error {
            // Bad extra options would fail every later run as well.
            diagnostics.push(DiagnosticLine {
                absolute_line: 0,
                severity: Severity::Note,
                message: format!(
                    "extra checker options were rejected and have been cleared: {}",
                    stderr
                ),
                code: None,
            });
            self.mode.extra_args.clear();
        }

        if diagnostics.is_empty() {
            return None;
        }

        let remapped = remap(&diagnostics, &offsets);
        let rendered = render(&remapped);
        if rendered.is_empty() {
            None
        } else {
            Some(rendered)
        }
    }

    /// `%nb_mypy` line command. The reply, when there is one, belongs on the
    /// host's error stream; an Err carries the usage message and changes no
    /// state.
    pub fn handle_command(&mut self, args: &str) -> Result<Option<String>, CommandError> {
        match parse_command(args)? {
            MagicCommand::ShowState => Ok(Some(format!(
                "State: {} {}",
                if self.mode.enabled { "On" } else { "Off" },
                if self.mode.debug { "DebugOn" } else { "DebugOff" },
            ))),
            MagicCommand::ShowVersion => Ok(Some(format!("Version {}", VERSION))),
            MagicCommand::Enable => {
                self.mode.enabled = true;
                Ok(None)
            }
            MagicCommand::Disable => {
                self.mode.enabled = false;
                Ok(None)
            }
            MagicCommand::DebugOn => {
                self.mode.debug = true;
                Ok(None)
            }
            MagicCommand::DebugOff => {
                self.mode.debug = false;
                Ok(None)
            }
            MagicCommand::SetOptions(options) => {
                self.mode.extra_args = options;
                Ok(None)
            }
        }
    }
}
