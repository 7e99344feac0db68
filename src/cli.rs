//! CLI argument parsing using clap v4
//!
//! Defines the command-line interface for the persona switchboard.

use clap::{Parser, Subcommand};

/// Persona Switchboard - persona-aware chat tab coordinator
///
/// Runs the background daemon that routes persona switches to browser tabs,
/// and manages the shared persona store from the command line.
#[derive(Parser, Debug)]
#[command(name = "persona-switchboard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(short, long, env = "SWITCHBOARD_CONFIG", global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for the switchboard
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the daemon (listens for the browser shim and routes switches)
    Run,

    /// Display version and build information
    Version,

    /// Inspect and manage the daemon configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Persona management (create, edit, import, activate)
    Persona {
        #[command(subcommand)]
        subcommand: PersonaSubcommand,
    },

    /// Behavior settings (the flags read by the daemon and injectors)
    Settings {
        #[command(subcommand)]
        subcommand: SettingsSubcommand,
    },
}

/// Persona subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum PersonaSubcommand {
    /// List all personas
    List,

    /// Show a persona (defaults to the active one)
    Show {
        /// Persona id or name
        persona: Option<String>,
    },

    /// Add a new persona
    Add {
        /// Display name
        name: String,

        /// Seed prompt injected into fresh conversations
        #[arg(short, long)]
        prompt: String,

        /// Short description
        #[arg(short, long, default_value = "")]
        description: String,

        /// RGB hex color (#RRGGBB)
        #[arg(long)]
        color: Option<String>,
    },

    /// Edit an existing persona
    Edit {
        /// Persona id or name
        persona: String,

        /// New display name
        #[arg(long)]
        name: Option<String>,

        /// New seed prompt
        #[arg(short, long)]
        prompt: Option<String>,

        /// New description
        #[arg(short, long)]
        description: Option<String>,

        /// New RGB hex color (#RRGGBB)
        #[arg(long)]
        color: Option<String>,
    },

    /// Remove a persona
    Remove {
        /// Persona id or name
        persona: String,
    },

    /// Make a persona the global active one
    Activate {
        /// Persona id or name
        persona: String,
    },

    /// Import personas from a JSON file
    Import {
        /// Path to a JSON array of personas with name and prompt fields
        file: String,
    },

    /// Export personas as JSON
    Export {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Settings subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SettingsSubcommand {
    /// Display the current settings
    Show,

    /// Set a behavior flag
    Set {
        /// Flag name: open-in-new-tab, auto-inject, show-active-indicator,
        /// confirm-switch, personalized-background
        key: String,

        /// true or false
        #[arg(action = clap::ArgAction::Set)]
        value: bool,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Print the effective configuration
    Show,

    /// Write a commented default configuration file
    Init {
        /// Destination for the generated file
        #[arg(short, long)]
        path: Option<String>,

        /// Replace the file if it already exists
        #[arg(short, long)]
        force: bool,
    },

    /// Check the configuration and report problems
    Validate,
}
