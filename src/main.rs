use std::fs;
use std::io;

use nb_typecheck::checker::CheckerConfig;
use nb_typecheck::{host, TypecheckContext};

fn print_usage() {
    eprintln!("usage: nb-typecheck [OPTIONS] [SCRIPT]");
    eprintln!();
    eprintln!("Without a script, runs an interactive session; with one, replays");
    eprintln!("its `# %% <id>` cells through the checker in order.");
    eprintln!();
    eprintln!("  --check-only      report diagnostics without executing cells");
    eprintln!("  --checker <prog>  type checker binary to invoke (default: mypy)");
    eprintln!("  --json            ask the checker for its JSON report format");
}

fn main() -> io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut checker = CheckerConfig::default();
    let mut execute = true;
    let mut script: Option<String> = None;

    let mut it = args.iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--check-only" => execute = false,
            "--json" => checker.json_output = true,
            "--checker" => match it.next() {
                Some(program) => checker.program = program.clone(),
                None => {
                    eprintln!("--checker needs a program name");
                    std::process::exit(2);
                }
            },
            "-h" | "--help" => {
                print_usage();
                return Ok(());
            }
            path if !path.starts_with('-') => script = Some(path.to_string()),
            other => {
                eprintln!("unknown flag: {}", other);
                print_usage();
                std::process::exit(2);
            }
        }
    }

    let mut ctx = TypecheckContext::new(checker);

    match script {
        Some(path) => {
            let text = fs::read_to_string(&path)?;
            host::run_script(&mut ctx, &text, execute)
        }
        None => host::run_interactive(&mut ctx, execute),
    }
}
