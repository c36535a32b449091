use std::io::{self, BufRead, Write};

use super::InterpreterSession;
use crate::context::{TypecheckContext, VERSION};

pub const MAGIC_PREFIX: &str = "%nb_mypy";

/// One cell of a percent-format script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptCell {
    pub id: String,
    pub source: String,
}

/// Split a percent-format script on `# %% <id>` markers. A marker without an
/// id gets the next free ordinal; text before the first marker becomes cell
/// "0". Repeating an id replays a re-execution of that cell.
pub fn split_percent_script(text: &str) -> Vec<ScriptCell> {
    let mut cells: Vec<ScriptCell> = Vec::new();
    let mut current: Option<ScriptCell> = None;
    let mut next_ordinal = 1usize;

    for line in text.lines() {
        if let Some(rest) = line.trim_start().strip_prefix("# %%") {
            if let Some(cell) = current.take() {
                cells.push(cell);
            }
            let id = match rest.trim() {
                "" => {
                    let id = next_ordinal.to_string();
                    next_ordinal += 1;
                    id
                }
                name => name.to_string(),
            };
            current = Some(ScriptCell {
                id,
                source: String::new(),
            });
        } else if let Some(cell) = current.as_mut() {
            if !cell.source.is_empty() {
                cell.source.push('\n');
            }
            cell.source.push_str(line);
        } else if !line.trim().is_empty() {
            current = Some(ScriptCell {
                id: "0".to_string(),
                source: line.to_string(),
            });
        }
    }
    if let Some(cell) = current.take() {
        cells.push(cell);
    }

    cells.retain(|c| !c.source.trim().is_empty());
    cells
}

/// A `%nb_mypy` command, when the text is a single such line.
fn magic_args(text: &str) -> Option<&str> {
    let line = text.trim();
    if line.contains('\n') {
        return None;
    }
    let rest = line.strip_prefix(MAGIC_PREFIX)?;
    if rest.is_empty() {
        Some("")
    } else if rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

fn dispatch_command(ctx: &mut TypecheckContext, args: &str) {
    match ctx.handle_command(args) {
        Ok(Some(reply)) => eprintln!("{}", reply),
        Ok(None) => {}
        Err(err) => eprintln!("{}", err),
    }
}

/// Replay a percent-format script: every cell is checked, reported on
/// stderr, then (unless `execute` is off) handed to a persistent
/// interpreter.
pub fn run_script(ctx: &mut TypecheckContext, text: &str, execute: bool) -> io::Result<()> {
    let mut interp = if execute {
        Some(InterpreterSession::start()?)
    } else {
        None
    };

    for cell in split_percent_script(text) {
        if let Some(args) = magic_args(&cell.source) {
            dispatch_command(ctx, args);
            continue;
        }

        if let Some(report) = ctx.pre_run_cell(&cell.id, &cell.source) {
            eprint!("{}", report);
        }

        if let Some(session) = interp.as_mut() {
            let out = session.run(&cell.source)?;
            if !out.trim().is_empty() {
                print!("{}", out);
            }
        }
    }

    Ok(())
}

/// Interactive mode: cells are read from stdin and end with a blank line.
/// `%nb_mypy ...` on its own dispatches immediately; `%cell <id>` names the
/// next cell so an earlier cell can be re-executed.
pub fn run_interactive(ctx: &mut TypecheckContext, execute: bool) -> io::Result<()> {
    let mut interp = if execute {
        Some(InterpreterSession::start()?)
    } else {
        None
    };
    let stdin = io::stdin();
    let mut next_cell = 1usize;
    let mut pending_id: Option<String> = None;

    eprintln!(
        "nb-typecheck {} (end a cell with a blank line, Ctrl-D to quit)",
        VERSION
    );

    'run: loop {
        let label = pending_id
            .clone()
            .unwrap_or_else(|| next_cell.to_string());
        eprint!("[{}]> ", label);
        io::stderr().flush()?;

        let mut cell = String::new();
        'cell: loop {
            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                if cell.trim().is_empty() {
                    break 'run;
                }
                break 'cell;
            }
            let line = line.trim_end_matches(['\r', '\n']).to_string();

            if cell.is_empty() {
                if let Some(args) = magic_args(&line) {
                    dispatch_command(ctx, args);
                    continue 'run;
                }
                if let Some(rest) = line.trim().strip_prefix("%cell ") {
                    pending_id = Some(rest.trim().to_string());
                    continue 'run;
                }
            }

            if line.trim().is_empty() {
                break 'cell;
            }
            if !cell.is_empty() {
                cell.push('\n');
            }
            cell.push_str(&line);
        }

        if cell.trim().is_empty() {
            continue 'run;
        }

        let id = match pending_id.take() {
            Some(id) => id,
            None => {
                let id = next_cell.to_string();
                next_cell += 1;
                id
            }
        };

        if let Some(report) = ctx.pre_run_cell(&id, &cell) {
            eprint!("{}", report);
        }

        if let Some(session) = interp.as_mut() {
            let out = session.run(&cell)?;
            if !out.trim().is_empty() {
                print!("{}", out);
            }
        }
    }

    Ok(())
}
