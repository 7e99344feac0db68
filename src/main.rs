//! Persona Switchboard - persona-aware chat tab coordinator
//!
//! This is the main entry point for the persona-switchboard binary.
//! The daemon listens for the browser shim on a WebSocket bridge, tracks
//! which tabs belong to which personas, and routes switch requests to an
//! existing tab or a new conversation. The other subcommands manage the
//! shared persona store and the daemon configuration.

use std::fs;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use persona_switchboard::cli::{
    Cli, Commands, ConfigSubcommand, PersonaSubcommand, SettingsSubcommand,
};
use persona_switchboard::config::{self, SwitchboardConfig};
use persona_switchboard::coordinator::{AppRouting, BridgePrompt, Coordinator};
use persona_switchboard::error::{Error, Result};
use persona_switchboard::host::{BridgeHost, HostEnvironment};
use persona_switchboard::logging;
use persona_switchboard::registry::TabRegistry;
use persona_switchboard::server::{BridgeServer, BridgeServerConfig};
use persona_switchboard::store::PersonaStore;
use persona_switchboard::types::{self, Persona, Settings, DEFAULT_COLOR};
use persona_switchboard::version;

/// Store-backed subcommands that share the same setup path
enum StoreCommand {
    Persona(PersonaSubcommand),
    Settings(SettingsSubcommand),
}

fn main() -> Result<()> {
    // Parse CLI arguments first (before logging, so we know verbosity)
    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            version::print_version();
            Ok(())
        }
        Commands::Config { subcommand } => {
            // Config commands use minimal logging
            logging::init_simple(tracing::Level::WARN)?;
            handle_config_command(cli.config.as_deref(), subcommand)
        }
        Commands::Persona { subcommand } => run_store_command(
            cli.config.as_deref(),
            cli.verbose,
            StoreCommand::Persona(subcommand),
        ),
        Commands::Settings { subcommand } => run_store_command(
            cli.config.as_deref(),
            cli.verbose,
            StoreCommand::Settings(subcommand),
        ),
        Commands::Run => run_main(cli.config.as_deref(), cli.verbose, cli.quiet),
    }
}

/// Run a store-backed CLI command on a small single-threaded runtime
fn run_store_command(
    config_path: Option<&str>,
    verbose: u8,
    command: StoreCommand,
) -> Result<()> {
    logging::init_simple(if verbose > 0 {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    })?;

    let config = load_config_or_exit(config_path);
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create runtime: {}", e)))?;

    let store = PersonaStore::new(config.store_path());
    let result = rt.block_on(async {
        match command {
            StoreCommand::Persona(subcommand) => handle_persona_command(&store, subcommand).await,
            StoreCommand::Settings(subcommand) => {
                handle_settings_command(&store, subcommand).await
            }
        }
    });
    if let Err(e) = result {
        eprint!("{}", e.format_for_terminal());
        std::process::exit(e.exit_code());
    }
    Ok(())
}

/// Entry point for the `run` subcommand
fn run_main(config_path: Option<&str>, verbose: u8, quiet: bool) -> Result<()> {
    // Load configuration for the daemon
    let config = load_config_or_exit(config_path);

    // Initialize logging with config settings
    // The guards must be kept alive for the lifetime of the program
    let _log_guards = logging::init_logging(&config.logging, verbose, quiet)?;

    // Log version info at startup
    let build = version::build_info();
    info!(
        version = %build.full_version(),
        target = %build.target,
        profile = %build.profile,
        "Starting Persona Switchboard"
    );

    run_daemon(config)
}

/// Load the configuration or exit with a formatted error
fn load_config_or_exit(config_path: Option<&str>) -> SwitchboardConfig {
    match SwitchboardConfig::load(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            // Use formatted error for terminal
            eprint!("{}", e.format_for_terminal());
            std::process::exit(e.exit_code());
        }
    }
}

/// Run the daemon in normal operation mode
fn run_daemon(config: SwitchboardConfig) -> Result<()> {
    info!(
        listen_addr = %config.daemon.listen_addr,
        app_domain = %config.app.domain,
        store = %config.store_path().display(),
        "Configuration loaded"
    );

    // Ensure the data directory exists
    let data_dir = config.data_dir();
    if !data_dir.exists() {
        fs::create_dir_all(&data_dir).map_err(|e| Error::IoWrite {
            path: data_dir.clone(),
            source: e,
        })?;
        info!(path = %data_dir.display(), "Created data directory");
    }

    // Build and run the tokio runtime
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("persona-switchboard")
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create async runtime: {}", e)))?;

    runtime.block_on(async_daemon_main(config))
}

/// Async daemon main loop
async fn async_daemon_main(config: SwitchboardConfig) -> Result<()> {
    let store = Arc::new(PersonaStore::new(config.store_path()));
    if store.ensure_seeded().await? {
        info!("First run: seeded the default persona");
    }

    // Wire the coordinator: the registry starts empty on every launch and
    // refills as page injectors re-register their tabs.
    let bridge = Arc::new(BridgeHost::new());
    let host: Arc<dyn HostEnvironment> = bridge.clone();
    let prompt = Arc::new(BridgePrompt::new(host.clone()));
    let app = AppRouting {
        domain: config.app.domain.clone(),
        new_conversation_url: config.app.new_conversation_url.clone(),
    };
    let coordinator = Arc::new(Coordinator::new(
        store.clone(),
        TabRegistry::new(),
        host,
        prompt,
        app,
    ));

    let server = Arc::new(BridgeServer::new(
        BridgeServerConfig {
            listen_addr: config.daemon.listen_addr.clone(),
            queue_size: config.daemon.queue_size,
        },
        coordinator.clone(),
        bridge,
    ));
    let addr = server.start().await?;

    info!(addr = %addr, "Switchboard ready, waiting for the browser shim");

    // The bridge tasks run until the process is told to stop.
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| Error::Internal(format!("Failed to listen for shutdown signal: {}", e)))?;

    info!(
        tracked_tabs = coordinator.registry().len(),
        pending_navigations = coordinator.pending_navigations().len(),
        "Shutdown signal received"
    );
    Ok(())
}

// ─────────────────────────────────────────────────────────────────
// Persona commands
// ─────────────────────────────────────────────────────────────────

/// Handle persona subcommands against the shared store
async fn handle_persona_command(store: &PersonaStore, subcommand: PersonaSubcommand) -> Result<()> {
    match subcommand {
        PersonaSubcommand::List => {
            let data = store.load().await?;
            if data.personas.is_empty() {
                println!("No personas configured.");
                return Ok(());
            }
            for persona in &data.personas {
                let marker = if data.active_persona_id.as_deref() == Some(persona.id.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!(
                    "{} {:<24} {:<9} {}",
                    marker, persona.name, persona.color, persona.id
                );
            }
        }

        PersonaSubcommand::Show { persona } => {
            let resolved = match persona {
                Some(ref id_or_name) => store.find_persona(id_or_name).await?.ok_or_else(|| {
                    Error::PersonaNotFound {
                        name: id_or_name.clone(),
                    }
                })?,
                None => store.active_persona().await?.ok_or_else(|| Error::PersonaNotFound {
                    name: "(active)".to_string(),
                })?,
            };
            print_persona(&resolved);
        }

        PersonaSubcommand::Add {
            name,
            prompt,
            description,
            color,
        } => {
            let persona = Persona::new(
                name,
                description,
                prompt,
                color.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
            );
            persona.validate()?;
            let id = persona.id.clone();
            let name = persona.name.clone();
            store.add_personas(vec![persona]).await?;
            println!("Persona '{}' created: {}", name, id);
        }

        PersonaSubcommand::Edit {
            persona,
            name,
            prompt,
            description,
            color,
        } => {
            let existing = store
                .find_persona(&persona)
                .await?
                .ok_or_else(|| Error::PersonaNotFound { name: persona.clone() })?;

            let mut data = store.load().await?;
            let entry = data
                .personas
                .iter_mut()
                .find(|p| p.id == existing.id)
                .ok_or_else(|| Error::PersonaNotFound { name: persona.clone() })?;

            if let Some(name) = name {
                entry.name = name;
            }
            if let Some(prompt) = prompt {
                entry.prompt = prompt;
            }
            if let Some(description) = description {
                entry.description = description;
            }
            if let Some(color) = color {
                entry.color = color;
            }
            entry.validate()?;
            let updated_name = entry.name.clone();

            store.set_personas(data.personas).await?;
            println!("Persona '{}' updated.", updated_name);
        }

        PersonaSubcommand::Remove { persona } => {
            let existing = store
                .find_persona(&persona)
                .await?
                .ok_or_else(|| Error::PersonaNotFound { name: persona.clone() })?;
            store.remove_persona(&existing.id).await?;
            println!("Persona '{}' removed.", existing.name);
        }

        PersonaSubcommand::Activate { persona } => {
            let existing = store
                .find_persona(&persona)
                .await?
                .ok_or_else(|| Error::PersonaNotFound { name: persona.clone() })?;
            store.set_active_persona_id(Some(&existing.id)).await?;
            println!("Active persona: {}", existing.name);
        }

        PersonaSubcommand::Import { file } => {
            let content = fs::read_to_string(&file).map_err(|e| Error::IoRead {
                path: file.clone().into(),
                source: e,
            })?;
            let personas = types::import_personas(&content)?;
            let count = personas.len();
            store.add_personas(personas).await?;
            println!("Imported {} persona(s).", count);
        }

        PersonaSubcommand::Export { output } => {
            let personas = store.personas().await?;
            if personas.is_empty() {
                println!("No personas to export.");
                return Ok(());
            }
            let json = types::export_personas(&personas)?;
            match output {
                Some(path) => {
                    fs::write(&path, json).map_err(|e| Error::IoWrite {
                        path: path.clone().into(),
                        source: e,
                    })?;
                    println!("Exported {} persona(s) to {}", personas.len(), path);
                }
                None => println!("{}", json),
            }
        }
    }

    Ok(())
}

/// Print one persona's full record
fn print_persona(persona: &Persona) {
    println!("Name:        {}", persona.name);
    println!("Id:          {}", persona.id);
    println!("Color:       {}", persona.color);
    println!("Created:     {}", persona.created.format("%Y-%m-%d %H:%M:%S UTC"));
    if !persona.description.is_empty() {
        println!("Description: {}", persona.description);
    }
    if !persona.prompt.is_empty() {
        println!("Prompt:      {}", persona.prompt);
    }
}

// ─────────────────────────────────────────────────────────────────
// Settings commands
// ─────────────────────────────────────────────────────────────────

/// Handle settings subcommands against the shared store
async fn handle_settings_command(
    store: &PersonaStore,
    subcommand: SettingsSubcommand,
) -> Result<()> {
    match subcommand {
        SettingsSubcommand::Show => {
            let settings = store.settings().await?;
            println!("open-in-new-tab:         {}", settings.open_in_new_tab);
            println!("auto-inject:             {}", settings.auto_inject);
            println!("show-active-indicator:   {}", settings.show_active_indicator);
            println!("confirm-switch:          {}", settings.confirm_switch);
            println!("personalized-background: {}", settings.personalized_background);
        }

        SettingsSubcommand::Set { key, value } => {
            let mut settings = store.settings().await?;
            apply_setting(&mut settings, &key, value)?;
            store.set_settings(settings).await?;
            println!("{} = {}", key, value);
        }
    }

    Ok(())
}

/// Apply one flag by its CLI name
fn apply_setting(settings: &mut Settings, key: &str, value: bool) -> Result<()> {
    match key {
        "open-in-new-tab" => settings.open_in_new_tab = value,
        "auto-inject" => settings.auto_inject = value,
        "show-active-indicator" => settings.show_active_indicator = value,
        "confirm-switch" => settings.confirm_switch = value,
        "personalized-background" => settings.personalized_background = value,
        other => {
            return Err(Error::Config(format!(
                "Unknown setting '{}'. Valid settings: open-in-new-tab, auto-inject, \
                 show-active-indicator, confirm-switch, personalized-background",
                other
            )))
        }
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────
// Config commands
// ─────────────────────────────────────────────────────────────────

/// Handle configuration subcommands
fn handle_config_command(config_path: Option<&str>, subcommand: ConfigSubcommand) -> Result<()> {
    match subcommand {
        ConfigSubcommand::Show => {
            let cfg = SwitchboardConfig::load(config_path)?;
            println!("{}", toml::to_string_pretty(&cfg)?);
        }
        ConfigSubcommand::Init { path, force } => {
            config::init_config(path.as_deref(), force)?;
        }
        ConfigSubcommand::Validate => match SwitchboardConfig::load(config_path) {
            Ok(_) => {
                println!("Configuration is valid.");
            }
            Err(e) => {
                eprint!("{}", e.format_for_terminal());
                std::process::exit(e.exit_code());
            }
        },
    }

    Ok(())
}
