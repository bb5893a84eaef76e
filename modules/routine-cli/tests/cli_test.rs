//! Tests that drive the `routine` binary itself.

use std::process::Command;

fn routine() -> Command {
    Command::new(env!("CARGO_BIN_EXE_routine"))
}

#[test]
fn help_and_version_ignore_bad_config() {
    for flag in ["--help", "--version"] {
        let output = routine()
            .arg(flag)
            .env("ROUTINE_DELAY_SCALE", "not-a-number")
            .env("ROUTINE_LOG", "=[bad")
            .output()
            .unwrap();
        assert!(output.status.success(), "{flag} failed: {output:?}");
        assert!(!output.stdout.is_empty());
    }
}

#[test]
fn bad_config_still_fails_real_commands() {
    let output = routine()
        .arg("controls")
        .env("ROUTINE_DELAY_SCALE", "not-a-number")
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ROUTINE_DELAY_SCALE"));
}

#[test]
fn controls_lists_demo_types() {
    let output = routine()
        .arg("controls")
        .env_remove("ROUTINE_DELAY_SCALE")
        .env_remove("ROUTINE_LOG")
        .output()
        .unwrap();
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().collect::<Vec<_>>(), ["DELAY", "ECHO", "FAIL", "HALT"]);
}
