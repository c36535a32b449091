use thiserror::Error;

/// The exact set of valid `%nb_mypy` argument forms, as listed in the usage
/// error.
pub const USAGE: &str =
    "valid arguments: '', '-v', 'On', 'Off', 'DebugOn', 'DebugOff', 'mypy-options OPTIONS'";

/// A parsed `%nb_mypy` line command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MagicCommand {
    ShowState,
    ShowVersion,
    Enable,
    Disable,
    DebugOn,
    DebugOff,
    /// Replace the extra checker option list. `mypy-options` with no
    /// arguments clears it.
    SetOptions(Vec<String>),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown argument '{0}'\n{usage}", usage = USAGE)]
    Unknown(String),
    #[error("could not parse options '{0}'")]
    BadOptions(String),
}

/// Parse the argument text of a `%nb_mypy` line command. An Err changes no
/// state; its message lists the valid forms.
pub fn parse_command(line: &str) -> Result<MagicCommand, CommandError> {
    let line = line.trim();
    match line {
        "" => Ok(MagicCommand::ShowState),
        "-v" => Ok(MagicCommand::ShowVersion),
        "On" => Ok(MagicCommand::Enable),
        "Off" => Ok(MagicCommand::Disable),
        "DebugOn" => Ok(MagicCommand::DebugOn),
        "DebugOff" => Ok(MagicCommand::DebugOff),
        "mypy-options" => Ok(MagicCommand::SetOptions(Vec::new())),
        _ => match line.strip_prefix("mypy-options ") {
            Some(rest) => {
                let options =
                    shlex::split(rest).ok_or_else(|| CommandError::BadOptions(rest.to_string()))?;
                Ok(MagicCommand::SetOptions(options))
            }
            None => Err(CommandError::Unknown(line.to_string())),
        },
    }
}
