//! Build metadata embedded by `build.rs`.

use std::fmt;

/// Compile-time build facts, resolved once by the build script.
#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub git_hash: &'static str,
    pub git_branch: &'static str,
    pub build_timestamp: &'static str,
    pub target: &'static str,
    pub profile: &'static str,
    pub rustc_version: &'static str,
    dirty: &'static str,
}

impl BuildInfo {
    pub const fn current() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            git_hash: env!("SWITCHBOARD_GIT_HASH"),
            git_branch: env!("SWITCHBOARD_GIT_BRANCH"),
            build_timestamp: env!("SWITCHBOARD_BUILD_TIMESTAMP"),
            target: env!("SWITCHBOARD_TARGET"),
            profile: env!("SWITCHBOARD_PROFILE"),
            rustc_version: env!("SWITCHBOARD_RUSTC_VERSION"),
            dirty: env!("SWITCHBOARD_GIT_DIRTY"),
        }
    }

    /// Whether uncommitted changes were present at build time.
    pub fn git_dirty(&self) -> bool {
        self.dirty == "true"
    }

    /// Version plus commit, e.g. `0.1.0-ab12cd34` or `0.1.0-ab12cd34-dirty`.
    pub fn full_version(&self) -> String {
        let mut v = format!("{}-{}", self.version, self.git_hash);
        if self.git_dirty() {
            v.push_str("-dirty");
        }
        v
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", self.name, self.full_version())?;
        writeln!(
            f,
            "  commit:  {}{} on {}",
            self.git_hash,
            if self.git_dirty() { " (dirty)" } else { "" },
            self.git_branch
        )?;
        writeln!(f, "  built:   {} ({} profile)", self.build_timestamp, self.profile)?;
        writeln!(f, "  target:  {}", self.target)?;
        writeln!(f, "  rustc:   {}", self.rustc_version)
    }
}

pub fn build_info() -> BuildInfo {
    BuildInfo::current()
}

/// Print the full build report (the `version` subcommand).
pub fn print_version() {
    print!("{}", build_info());
}
