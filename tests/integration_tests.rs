use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

// Helper to install a stand-in checker script
fn stub_checker(name: &str, script: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "nb_typecheck_stub_{}_{}.sh",
        name,
        std::process::id()
    ));
    fs::write(&path, script).expect("Failed to write stub checker");
    let mut perms = fs::metadata(&path).expect("Failed to stat stub").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).expect("Failed to chmod stub");
    path
}

fn cleanup_stub(path: &PathBuf) {
    let _ = fs::remove_file(path);
}

fn config_for(path: &PathBuf) -> nb_typecheck::checker::CheckerConfig {
    nb_typecheck::checker::CheckerConfig {
        program: path.display().to_string(),
        base_args: Vec::new(),
        json_output: false,
    }
}

// Emits one assignment error at the line where `x = "s"` appears, like mypy
// would for an int/str redefinition; silent otherwise.
const ASSIGN_STUB: &str = r#"#!/bin/sh
for f in "$@"; do file="$f"; done
n=$(grep -n 'x = "s"' "$file" | head -n 1 | cut -d: -f1)
if [ -n "$n" ]; then
  echo "$file:$n: error: Incompatible types in assignment (expression has type \"str\", variable has type \"int\")  [assignment]"
  exit 1
fi
exit 0
"#;

#[cfg(test)]
mod pipeline_tests {
    use super::*;
    use nb_typecheck::checker::run_check;
    use nb_typecheck::diagnostics::Severity;
    use nb_typecheck::{TypecheckContext, VERSION};

    #[test]
    fn test_diagnostic_maps_to_offending_cell() {
        let stub = stub_checker("assign", ASSIGN_STUB);
        let mut ctx = TypecheckContext::new(config_for(&stub));

        assert!(
            ctx.pre_run_cell("a", "x: int = 1").is_none(),
            "First cell is clean"
        );

        let report = ctx
            .pre_run_cell("b", "x = \"s\"")
            .expect("Second cell should produce a diagnostic");
        assert!(
            report.contains("cell b:1: error: Incompatible types in assignment"),
            "Diagnostic at absolute line 2 belongs to cell b line 1, got: {}",
            report
        );
        assert!(report.contains("[assignment]"), "Error code is kept");

        cleanup_stub(&stub);
    }

    #[test]
    fn test_reexecution_keeps_attribution_stable() {
        let stub = stub_checker("reexec", ASSIGN_STUB);
        let mut ctx = TypecheckContext::new(config_for(&stub));

        assert!(ctx.pre_run_cell("a", "x: int = 1\ny = 2").is_none());
        let report = ctx.pre_run_cell("b", "x = \"s\"").expect("diagnostic");
        assert!(report.contains("cell b:1:"), "got: {}", report);

        // Growing cell "a" shifts cell "b" further down the document, but
        // the diagnostic must still land on cell b line 1.
        let report = ctx
            .pre_run_cell("a", "x: int = 1\ny = 2\nz = 3")
            .expect("stale diagnostic still reported");
        assert!(report.contains("cell b:1:"), "got: {}", report);
        assert_eq!(ctx.history().len(), 2, "Re-execution must not append");

        cleanup_stub(&stub);
    }

    #[test]
    fn test_missing_checker_is_single_synthetic_error() {
        let config = nb_typecheck::checker::CheckerConfig {
            program: "/nonexistent/nb-typecheck-no-such-binary".to_string(),
            base_args: Vec::new(),
            json_output: false,
        };

        let report = run_check("x = 1\n", &config, &[]);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].severity, Severity::Error);
        assert_eq!(report.diagnostics[0].absolute_line, 0);
        assert!(report.diagnostics[0].message.contains("could not be run"));

        // Through the context the cell still "executes": the hook returns a
        // report instead of failing.
        let mut ctx = TypecheckContext::new(config);
        let rendered = ctx.pre_run_cell("a", "x = 1").expect("failure report");
        assert!(
            rendered.contains("cell <unknown>:0: error:"),
            "got: {}",
            rendered
        );
    }

    #[test]
    fn test_crashing_checker_is_single_synthetic_error() {
        let stub = stub_checker("crash", "#!/bin/sh\necho \"Traceback: boom\" >&2\nexit 3\n");

        let report = run_check("x = 1\n", &config_for(&stub), &[]);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].severity, Severity::Error);
        assert_eq!(report.diagnostics[0].absolute_line, 0);
        assert!(
            report.diagnostics[0].message.contains("Traceback: boom"),
            "stderr detail is carried, got: {}",
            report.diagnostics[0].message
        );
        assert!(report.usage_error.is_none());

        cleanup_stub(&stub);
    }

    #[test]
    fn test_unparseable_checker_output_is_reported() {
        let stub = stub_checker("garbage", "#!/bin/sh\necho \"mangled output\"\nexit 1\n");

        let report = run_check("x = 1\n", &config_for(&stub), &[]);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].absolute_line, 0);
        assert!(
            report.diagnostics[0].message.contains("mangled output"),
            "got: {}",
            report.diagnostics[0].message
        );

        cleanup_stub(&stub);
    }

    #[test]
    fn test_custom_rule_neutralizes_new_host_construct() {
        fn is_display_call(line: &str) -> bool {
            line.trim_start().starts_with("display(")
        }

        let stub = stub_checker("rule", "#!/bin/sh\nexit 0\n");
        let mut ctx = TypecheckContext::new(config_for(&stub));
        ctx.push_rule(nb_typecheck::sanitize::Rule {
            name: "display-call",
            matches: is_display_call,
            replacement: "",
        });

        assert!(ctx.pre_run_cell("a", "display(x)\ny = 1").is_none());
        let record = &ctx.history().records()[0];
        assert_eq!(record.sanitized_source, "\ny = 1");
        assert_eq!(record.line_count, 2, "Replacement preserves the line count");

        cleanup_stub(&stub);
    }

    #[test]
    fn test_usage_error_clears_extra_options() {
        let stub = stub_checker(
            "usage",
            "#!/bin/sh\necho \"usage: mypy [-h] ...\" >&2\nexit 2\n",
        );
        let mut ctx = TypecheckContext::new(config_for(&stub));

        ctx.handle_command("mypy-options --bogus-flag")
            .expect("setting options always succeeds");
        assert_eq!(ctx.mode().extra_args, vec!["--bogus-flag".to_string()]);

        let report = ctx.pre_run_cell("a", "x = 1").expect("rejection report");
        assert!(
            report.contains("rejected and have been cleared"),
            "got: {}",
            report
        );
        assert!(
            ctx.mode().extra_args.is_empty(),
            "Rejected options must be dropped"
        );

        cleanup_stub(&stub);
    }

    #[test]
    fn test_state_and_version_commands() {
        let mut ctx = TypecheckContext::default();

        let state = ctx.handle_command("").expect("state").expect("reply");
        assert_eq!(state, "State: On DebugOff");

        ctx.handle_command("DebugOn").expect("toggle");
        ctx.handle_command("Off").expect("toggle");
        let state = ctx.handle_command("").expect("state").expect("reply");
        assert_eq!(state, "State: Off DebugOn");

        let version = ctx.handle_command("-v").expect("version").expect("reply");
        assert_eq!(version, format!("Version {}", VERSION));
    }

    #[test]
    fn test_unknown_command_lists_valid_arguments() {
        let mut ctx = TypecheckContext::default();

        let err = ctx.handle_command("foo").expect_err("foo is not valid");
        let message = err.to_string();
        assert!(message.contains("unknown argument 'foo'"), "got: {}", message);
        for form in [
            "''",
            "'-v'",
            "'On'",
            "'Off'",
            "'DebugOn'",
            "'DebugOff'",
            "'mypy-options OPTIONS'",
        ] {
            assert!(
                message.contains(form),
                "usage must list {}, got: {}",
                form,
                message
            );
        }

        // No state change on a usage error
        assert!(ctx.mode().enabled);
        assert!(!ctx.mode().debug);
        assert!(ctx.mode().extra_args.is_empty());
    }

    #[test]
    fn test_options_are_split_shell_style() {
        let mut ctx = TypecheckContext::default();

        ctx.handle_command("mypy-options --strict --python-version 3.11")
            .expect("options");
        assert_eq!(
            ctx.mode().extra_args,
            vec!["--strict", "--python-version", "3.11"]
        );

        ctx.handle_command("mypy-options \"--custom-typeshed-dir=/tmp/my stubs\"")
            .expect("quoted option");
        assert_eq!(
            ctx.mode().extra_args,
            vec!["--custom-typeshed-dir=/tmp/my stubs"]
        );

        ctx.handle_command("mypy-options").expect("bare form clears");
        assert!(ctx.mode().extra_args.is_empty());
    }

    #[test]
    fn test_disabled_checker_records_nothing() {
        let config = nb_typecheck::checker::CheckerConfig {
            program: "/nonexistent/never-invoked".to_string(),
            base_args: Vec::new(),
            json_output: false,
        };
        let mut ctx = TypecheckContext::new(config);

        ctx.handle_command("Off").expect("disable");
        assert!(ctx.pre_run_cell("a", "x = 1").is_none());
        assert!(ctx.history().is_empty(), "Disabled runs are not recorded");
    }

    #[test]
    fn test_cell_magic_is_skipped_entirely() {
        let config = nb_typecheck::checker::CheckerConfig {
            program: "/nonexistent/never-invoked".to_string(),
            base_args: Vec::new(),
            json_output: false,
        };
        let mut ctx = TypecheckContext::new(config);

        assert!(ctx.pre_run_cell("m", "%%bash\necho hi").is_none());
        assert!(ctx.history().is_empty());
    }

    #[test]
    fn test_json_report_parsing() {
        let stub = stub_checker(
            "json",
            concat!(
                "#!/bin/sh\n",
                "echo '{\"file\": \"cells.py\", \"line\": 1, \"column\": 0, ",
                "\"message\": \"Incompatible types in assignment\", \"hint\": null, ",
                "\"code\": \"assignment\", \"severity\": \"error\"}'\n",
                "exit 1\n",
            ),
        );
        let mut config = config_for(&stub);
        config.json_output = true;

        let report = run_check("x = 1\n", &config, &[]);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].absolute_line, 1);
        assert_eq!(report.diagnostics[0].severity, Severity::Error);
        assert_eq!(report.diagnostics[0].code.as_deref(), Some("assignment"));

        cleanup_stub(&stub);
    }
}

#[cfg(test)]
mod logging_tests {
    use super::*;
    use std::sync::Mutex;

    use nb_typecheck::TypecheckContext;

    static RECORDS: Mutex<Vec<String>> = Mutex::new(Vec::new());

    struct CaptureLogger;

    impl log::Log for CaptureLogger {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            // Same bar as the binary's default env_logger filter
            metadata.level() <= log::Level::Info
        }

        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                RECORDS.lock().unwrap().push(record.args().to_string());
            }
        }

        fn flush(&self) {}
    }

    static LOGGER: CaptureLogger = CaptureLogger;

    #[test]
    fn test_debug_on_surfaces_the_accumulated_program() {
        log::set_logger(&LOGGER).expect("no other logger in this test binary");
        log::set_max_level(log::LevelFilter::Info);

        let stub = stub_checker("debuglog", "#!/bin/sh\nexit 0\n");
        let mut ctx = TypecheckContext::new(config_for(&stub));

        ctx.pre_run_cell("a", "x = 1");
        assert!(
            !RECORDS
                .lock()
                .unwrap()
                .iter()
                .any(|m| m.contains("program so far")),
            "No program dump while debug is off"
        );

        ctx.handle_command("DebugOn").expect("toggle");
        ctx.pre_run_cell("b", "y = 2");
        assert!(
            RECORDS
                .lock()
                .unwrap()
                .iter()
                .any(|m| m.contains("program so far") && m.contains("y = 2")),
            "DebugOn must dump the accumulated program at a visible level"
        );

        ctx.handle_command("DebugOff").expect("toggle");
        RECORDS.lock().unwrap().clear();
        ctx.pre_run_cell("c", "z = 3");
        assert!(
            !RECORDS
                .lock()
                .unwrap()
                .iter()
                .any(|m| m.contains("program so far")),
            "DebugOff silences the dump again"
        );

        cleanup_stub(&stub);
    }
}

#[cfg(test)]
mod parser_tests {
    use nb_typecheck::checker::parse_text_output;
    use nb_typecheck::diagnostics::Severity;

    #[test]
    fn test_text_report_lines() {
        let stdout = "\
cells.py:2: error: Incompatible types in assignment (expression has type \"str\", variable has type \"int\")  [assignment]
cells.py:4: note: Revealed type is \"builtins.int\"
cells.py:7:5: warning: Statement is unreachable  [unreachable]
Found 1 error in 1 file (checked 1 source file)
";
        let diags = parse_text_output(stdout);
        assert_eq!(diags.len(), 3, "Summary line is not a diagnostic");

        assert_eq!(diags[0].absolute_line, 2);
        assert_eq!(diags[0].severity, Severity::Error);
        assert_eq!(diags[0].code.as_deref(), Some("assignment"));
        assert!(!diags[0].message.contains("[assignment]"));

        assert_eq!(diags[1].severity, Severity::Note);
        assert_eq!(diags[1].code, None);

        // Column number before the severity is skipped
        assert_eq!(diags[2].absolute_line, 7);
        assert_eq!(diags[2].severity, Severity::Warning);
    }

    #[test]
    fn test_message_with_colons_survives() {
        let stdout = "cells.py:3: error: Argument 1 to \"f\" has incompatible type \"Dict[str, int]\"; expected \"Mapping[str, str]\"  [arg-type]\n";
        let diags = parse_text_output(stdout);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("Dict[str, int]"));
        assert_eq!(diags[0].code.as_deref(), Some("arg-type"));
    }

    #[test]
    fn test_garbage_output_yields_nothing() {
        assert!(parse_text_output("not a diagnostic at all\n").is_empty());
        assert!(parse_text_output("").is_empty());
    }
}

#[cfg(test)]
mod sanitize_tests {
    use nb_typecheck::sanitize::{default_rules, sanitize_cell, sanitize_lines};

    #[test]
    fn test_host_syntax_becomes_blank_lines() {
        let rules = default_rules();
        let cell = "%matplotlib inline\nx = 1\n!pip install numpy\nprint?\nreveal_type(x)";
        let lines = sanitize_lines(cell, &rules);

        assert_eq!(lines, vec!["", "x = 1", "", "", ""]);
    }

    #[test]
    fn test_sanitization_preserves_line_count() {
        let rules = default_rules();
        for cell in ["x = 1", "x = 1\n", "%magic\n\n!shell\ny = 2", "", "\n\n"] {
            let body = cell.strip_suffix('\n').unwrap_or(cell);
            let expected = body.split('\n').count();
            assert_eq!(
                sanitize_lines(cell, &rules).len(),
                expected,
                "line count changed for {:?}",
                cell
            );
        }
    }

    #[test]
    fn test_plain_python_is_untouched() {
        let rules = default_rules();
        let cell = "def f(x: int) -> int:\n    return x * 2\n\ny = f(21)";
        assert_eq!(sanitize_cell(cell, &rules), cell);
    }

    #[test]
    fn test_indented_magic_is_blanked() {
        let rules = default_rules();
        assert_eq!(sanitize_cell("    %time f()", &rules), "");
    }
}
