mod repl;
mod session;

pub use repl::{run_interactive, run_script, split_percent_script, ScriptCell, MAGIC_PREFIX};
pub use session::InterpreterSession;
