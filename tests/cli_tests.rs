//! End-to-end CLI tests over the built binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn switchboard_cmd() -> Command {
    Command::cargo_bin("persona-switchboard").unwrap()
}

/// Command wired to an isolated data directory.
fn switchboard_cmd_in(data_dir: &TempDir) -> Command {
    let mut cmd = switchboard_cmd();
    cmd.env("SWITCHBOARD_DATA_DIR", data_dir.path());
    cmd
}

// ─────────────────────────────────────────────────────────────────
// Help and Version
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_help_lists_subcommands() {
    switchboard_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Persona Switchboard"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("persona"))
        .stdout(predicate::str::contains("settings"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_subcommand_prints_build_report() {
    switchboard_cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("persona-switchboard"))
        .stdout(predicate::str::contains("commit:"))
        .stdout(predicate::str::contains("target:"))
        .stdout(predicate::str::contains("rustc:"));
}

#[test]
fn test_version_flag() {
    switchboard_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("persona-switchboard"));
}

// ─────────────────────────────────────────────────────────────────
// Config Commands
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_config_show_prints_all_sections() {
    switchboard_cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[daemon]"))
        .stdout(predicate::str::contains("[app]"))
        .stdout(predicate::str::contains("[logging]"))
        .stdout(predicate::str::contains("[storage]"));
}

#[test]
fn test_config_validate_accepts_defaults() {
    switchboard_cmd()
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn test_config_validate_missing_file() {
    switchboard_cmd()
        .args(["config", "validate", "--config", "/nonexistent/path/config.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_config_init_help_lists_flags() {
    switchboard_cmd()
        .args(["config", "init", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--path"))
        .stdout(predicate::str::contains("--force"));
}

// ─────────────────────────────────────────────────────────────────
// Persona Command Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_persona_list_empty() {
    let tmp = TempDir::new().unwrap();
    switchboard_cmd_in(&tmp)
        .args(["persona", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No personas configured"));
}

#[test]
fn test_persona_add_and_list() {
    let tmp = TempDir::new().unwrap();

    switchboard_cmd_in(&tmp)
        .args(["persona", "add", "Coder", "--prompt", "You write code."])
        .assert()
        .success()
        .stdout(predicate::str::contains("created"));

    switchboard_cmd_in(&tmp)
        .args(["persona", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Coder"));
}

#[test]
fn test_persona_add_rejects_bad_color() {
    let tmp = TempDir::new().unwrap();
    switchboard_cmd_in(&tmp)
        .args([
            "persona", "add", "Coder", "--prompt", "You write code.", "--color", "red",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E701"));
}

#[test]
fn test_persona_activate_and_show() {
    let tmp = TempDir::new().unwrap();

    switchboard_cmd_in(&tmp)
        .args(["persona", "add", "Writer", "--prompt", "You write prose."])
        .assert()
        .success();

    switchboard_cmd_in(&tmp)
        .args(["persona", "activate", "Writer"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Active persona: Writer"));

    // Show with no argument resolves the active persona
    switchboard_cmd_in(&tmp)
        .args(["persona", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Writer"))
        .stdout(predicate::str::contains("You write prose."));
}

#[test]
fn test_persona_remove() {
    let tmp = TempDir::new().unwrap();

    switchboard_cmd_in(&tmp)
        .args(["persona", "add", "Coder", "--prompt", "You write code."])
        .assert()
        .success();

    switchboard_cmd_in(&tmp)
        .args(["persona", "remove", "Coder"])
        .assert()
        .success()
        .stdout(predicate::str::contains("removed"));

    switchboard_cmd_in(&tmp)
        .args(["persona", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No personas configured"));
}

#[test]
fn test_persona_show_unknown_fails() {
    let tmp = TempDir::new().unwrap();
    switchboard_cmd_in(&tmp)
        .args(["persona", "show", "Nobody"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E700"))
        .stderr(predicate::str::contains("persona list"));
}

#[test]
fn test_persona_import_invalid_payload() {
    let tmp = TempDir::new().unwrap();
    let bad_file = tmp.path().join("bad.json");
    std::fs::write(&bad_file, r#"{"name": "not an array"}"#).unwrap();

    switchboard_cmd_in(&tmp)
        .args(["persona", "import", bad_file.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E702"));

    // Nothing was applied
    switchboard_cmd_in(&tmp)
        .args(["persona", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No personas configured"));
}

#[test]
fn test_persona_import_export_round_trip() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("personas.json");
    std::fs::write(
        &file,
        r##"[{"name": "Coder", "prompt": "You write code.", "color": "#ff0000"}]"##,
    )
    .unwrap();

    switchboard_cmd_in(&tmp)
        .args(["persona", "import", file.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 1 persona(s)"));

    switchboard_cmd_in(&tmp)
        .args(["persona", "export"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"Coder\""))
        .stdout(predicate::str::contains("#ff0000"));
}

// ─────────────────────────────────────────────────────────────────
// Settings Command Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_settings_show_defaults() {
    let tmp = TempDir::new().unwrap();
    switchboard_cmd_in(&tmp)
        .args(["settings", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("open-in-new-tab:         true"))
        .stdout(predicate::str::contains("confirm-switch:          true"));
}

#[test]
fn test_settings_set_round_trip() {
    let tmp = TempDir::new().unwrap();

    switchboard_cmd_in(&tmp)
        .args(["settings", "set", "confirm-switch", "false"])
        .assert()
        .success()
        .stdout(predicate::str::contains("confirm-switch = false"));

    switchboard_cmd_in(&tmp)
        .args(["settings", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("confirm-switch:          false"))
        .stdout(predicate::str::contains("auto-inject:             true"));
}

#[test]
fn test_settings_set_unknown_key_fails() {
    let tmp = TempDir::new().unwrap();
    switchboard_cmd_in(&tmp)
        .args(["settings", "set", "frobnicate", "true"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown setting"));
}

// ─────────────────────────────────────────────────────────────────
// Run Command
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_run_help_mentions_config_flag() {
    switchboard_cmd()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Run the daemon"))
        .stdout(predicate::str::contains("--config"));
}

#[test]
fn test_run_refuses_missing_config_file() {
    switchboard_cmd()
        .args(["run", "--config", "/nonexistent/config.toml"])
        .assert()
        .failure();
}

// ─────────────────────────────────────────────────────────────────
// Global flags and errors
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_verbosity_flags_accepted() {
    for flag in ["-v", "-vv", "--quiet"] {
        switchboard_cmd().args([flag, "version"]).assert().success();
    }
}

#[test]
fn test_unknown_subcommand_fails() {
    switchboard_cmd()
        .arg("unknown-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_no_subcommand_fails() {
    switchboard_cmd().assert().failure();
}
