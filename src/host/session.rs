use std::io::{self, BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{Duration, Instant};

const SENTINEL: &str = "__NB_TYPECHECK_DONE__";

/// A persistent interactive Python interpreter the driver feeds cells into
/// once they have been type checked. Prompts go to the interpreter's stderr,
/// which is discarded; program output arrives on the piped stdout.
pub struct InterpreterSession {
    _child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl InterpreterSession {
    pub fn start() -> io::Result<Self> {
        Self::start_with("python3")
    }

    pub fn start_with(program: &str) -> io::Result<Self> {
        let mut child = Command::new(program)
            .args(["-i", "-q"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let stdin = child.stdin.take().expect("no stdin");
        let stdout = child.stdout.take().expect("no stdout");

        let mut session = Self {
            _child: child,
            stdin,
            stdout: BufReader::new(stdout),
        };

        // Drain interpreter startup by waiting for a marker echo.
        session.stdin.write_all(b"print('INITIALIZED')\n")?;
        session.stdin.flush()?;

        let timeout = Duration::from_secs(5);
        let start = Instant::now();
        let mut line = String::new();
        loop {
            if start.elapsed() > timeout {
                break;
            }
            line.clear();
            match session.stdout.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {
                    if line.contains("INITIALIZED") {
                        break;
                    }
                }
                Err(_) => break,
            }
        }

        Ok(session)
    }

    /// Run one cell and collect its output until the sentinel echoes back.
    /// The trailing blank line closes any open block in the interactive
    /// grammar before the sentinel print is submitted.
    pub fn run(&mut self, cell: &str) -> io::Result<String> {
        self.stdin.write_all(cell.as_bytes())?;
        if !cell.ends_with('\n') {
            self.stdin.write_all(b"\n")?;
        }
        self.stdin.write_all(b"\n")?;
        self.stdin
            .write_all(format!("print('{}')\n", SENTINEL).as_bytes())?;
        self.stdin.flush()?;

        let mut output = String::new();
        let timeout = Duration::from_secs(30);
        let start = Instant::now();

        loop {
            if start.elapsed() > timeout {
                log::warn!("interpreter gave no answer within {:?}", timeout);
                return Ok(output);
            }

            let mut line = String::new();
            match self.stdout.read_line(&mut line) {
                Ok(0) => return Ok(output),
                Ok(_) => {
                    if line.trim() == SENTINEL {
                        return Ok(output);
                    }
                    output.push_str(&line);
                }
                Err(e) => return Err(e),
            }
        }
    }
}
