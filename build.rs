//! Embeds git and toolchain facts as `SWITCHBOARD_*` env vars for
//! `src/version.rs`.

use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    let vars = [
        (
            "SWITCHBOARD_GIT_HASH",
            capture("git", &["rev-parse", "--short=8", "HEAD"]),
        ),
        (
            "SWITCHBOARD_GIT_BRANCH",
            capture("git", &["rev-parse", "--abbrev-ref", "HEAD"]),
        ),
        ("SWITCHBOARD_GIT_DIRTY", git_dirty()),
        (
            "SWITCHBOARD_BUILD_TIMESTAMP",
            Some(chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string()),
        ),
        ("SWITCHBOARD_TARGET", env::var("TARGET").ok()),
        ("SWITCHBOARD_PROFILE", env::var("PROFILE").ok()),
        ("SWITCHBOARD_RUSTC_VERSION", capture("rustc", &["--version"])),
    ];

    for (name, value) in vars {
        println!(
            "cargo:rustc-env={}={}",
            name,
            value.unwrap_or_else(|| "unknown".to_string())
        );
    }
}

/// Run a command and return its trimmed stdout, or `None` on any failure.
fn capture(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    Some(text.trim().to_string())
}

fn git_dirty() -> Option<String> {
    let status = capture("git", &["status", "--porcelain"])?;
    Some(if status.is_empty() { "false" } else { "true" }.to_string())
}
