//! End-to-end tests for the genbindc driver.
//!
//! Each test writes a catalog to a temp directory, invokes the binary and
//! asserts on stdout, stderr and the exit status.

use std::process::{Command, Output};

const HANDLERS: &str = r#"
[[type]]
name = "ICommand"
kind = "interface"

[[type]]
name = "Cmd1"
interfaces = ["ICommand"]

[[type]]
name = "Cmd2"
interfaces = ["ICommand"]

[[type]]
name = "IHandler"
kind = "interface"
params = [{ name = "T" }]

[[type]]
name = "Handler"
params = [{ name = "T", constraints = ["ICommand"] }]
interfaces = ["IHandler<T>"]

[[component]]
type = "Handler"
"#;

const LAYERED: &str = r#"
[[type]]
name = "IRepo"
kind = "interface"
params = [{ name = "T" }]

[[type]]
name = "Repo"
params = [{ name = "T" }]
interfaces = ["IRepo<T>"]

[[type]]
name = "Service"
params = [{ name = "T" }]

[[component]]
type = "Repo"

[[component]]
type = "Service"
dependencies = [{ shape = "IRepo<T>" }]
"#;

/// Helper: write `catalog` to a temp file and run genbindc with `args` then the path.
fn genbindc(catalog: &str, args: &[&str]) -> Output {
    genbindc_with_env(catalog, args, &[])
}

fn genbindc_with_env(catalog: &str, args: &[&str], env: &[(&str, &str)]) -> Output {
    let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = temp_dir.path().join("catalog.toml");
    std::fs::write(&path, catalog).expect("failed to write catalog");

    let mut command = Command::new(env!("CARGO_BIN_EXE_genbindc"));
    command.args(&args[..1]).arg(&path).args(&args[1..]);
    command.env_remove("GENBIND_LOG");
    for (key, value) in env {
        command.env(key, value);
    }
    command.output().expect("failed to invoke genbindc")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn close_prints_operations_and_summary() {
    let output = genbindc(HANDLERS, &["close"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let expected = "\
no-autowire Handler<T>
collect IHandler<Cmd1>
bind IHandler<Cmd1> -> Handler<Cmd1>
bind Handler<Cmd1> -> Handler<Cmd1>
no-autowire Handler<T>
collect IHandler<Cmd2>
bind IHandler<Cmd2> -> Handler<Cmd2>
bind Handler<Cmd2> -> Handler<Cmd2>
closed 2 type(s): 0 pinned, 0 duplicate(s), 0 constraint skip(s)
";
    assert_eq!(stdout(&output), expected);
}

#[test]
fn close_json_emits_one_object_per_line() {
    let output = genbindc(HANDLERS, &["close", "--json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let lines: Vec<serde_json::Value> = stdout(&output)
        .lines()
        .map(|l| serde_json::from_str(l).expect("invalid JSON line"))
        .collect();
    assert_eq!(lines.len(), 9);
    assert_eq!(lines[0]["op"], "disable_auto_discovery");
    assert_eq!(lines[0]["ty"], "Handler<T>");
    assert_eq!(lines[2]["service"], "IHandler<Cmd1>");
    assert_eq!(lines[2]["implementation"], "Handler<Cmd1>");
    assert_eq!(
        lines[8]["summary"]["closed"],
        serde_json::json!(["Handler<Cmd1>", "Handler<Cmd2>"])
    );
}

#[test]
fn check_lists_provider_links() {
    let output = genbindc(LAYERED, &["check"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let expected = "\
Repo<T>
  provides to Service<T> (IRepo<T>)
Service<T>
  needs IRepo<T>
3 type(s), 2 component(s), 0 demand(s)
";
    assert_eq!(stdout(&output), expected);
}

#[test]
fn unknown_type_is_reported_with_its_code() {
    let broken = HANDLERS.replace("[\"ICommand\"] }", "[\"ICmd\"] }");
    let output = genbindc(&broken, &["close", "--no-color"]);
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("G0001"), "stderr: {}", err);
    assert!(err.contains("unknown type `ICmd`"), "stderr: {}", err);
    assert!(stdout(&output).is_empty());
}

#[test]
fn json_diagnostics_are_parseable() {
    let output = genbindc("[[type]]\nname = 3\n", &["check", "--json"]);
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    let parsed: serde_json::Value =
        serde_json::from_str(err.trim()).unwrap_or_else(|e| panic!("{}: {}", e, err));
    assert_eq!(parsed["code"], "C0002");
    assert_eq!(parsed["severity"], "error");
}

#[test]
fn closing_faults_fail_the_run() {
    // `Service` gains a parameter that its dependency never mentions.
    let service = LAYERED.replace(
        "params = [{ name = \"T\" }]\n\n[[component]]",
        "params = [{ name = \"T\" }, { name = \"U\" }]\n\n[[component]]",
    );
    let catalog = format!(
        "[[type]]\nname = \"User\"\n{}\n[[demand]]\ncomponent = \"Repo\"\narguments = [\"User\"]\n",
        service
    );
    let output = genbindc(&catalog, &["close", "--no-color"]);
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("G0004"), "stderr: {}", err);
    assert!(err.contains("Service"), "stderr: {}", err);
}

#[test]
fn log_filter_comes_from_the_environment() {
    let quiet = genbindc(HANDLERS, &["close"]);
    assert!(!stderr(&quiet).contains("catalog loaded"));

    let verbose = genbindc_with_env(HANDLERS, &["close"], &[("GENBIND_LOG", "info")]);
    assert!(verbose.status.success());
    assert!(stderr(&verbose).contains("catalog loaded"), "stderr: {}", stderr(&verbose));
}
