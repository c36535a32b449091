pub mod checker;
pub mod command;
pub mod context;
pub mod diagnostics;
pub mod host;
pub mod sanitize;
pub mod session;

pub use context::{ModeState, TypecheckContext, VERSION};
