//! lockyard - administer a registry of lockable resources
//!
//! The CLI loads the registry through the lock manager, applies one
//! administrative command and exits. Lock transitions are reported through
//! the event channel and logged with tracing.

mod cli;
mod display;
mod error;
mod events;
mod logging;

use crate::cli::{Cli, Commands, RequestArgs};
use crate::display::{CommandOutput, OutputRenderer};
use crate::error::CliError;
use crate::events::EventHandler;
use clap::Parser;
use lockyard_config::{Config, ResourceSeed};
use lockyard_events::EventReceiver;
use lockyard_lock::{LockManager, LockSettings};
use lockyard_registry::JsonFileStore;
use lockyard_types::{
    Environment, OutputFormat, Requester, RequesterId, Resource, ResourceRequest,
};
use std::process;
use std::sync::Arc;
use tokio::select;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    init_tracing(json_mode, cli.global.debug);

    if let Err(e) = run(cli).await {
        error!("Application error: {}", e);
        if !json_mode {
            eprintln!("Error: {e}");
        }
        process::exit(1);
    }
}

/// Main application logic
async fn run(cli: Cli) -> Result<(), CliError> {
    info!("Starting lockyard v{}", env!("CARGO_PKG_VERSION"));

    // file (or defaults), then environment, then CLI flags
    let config_path = match &cli.global.config {
        Some(path) => path.clone(),
        None => Config::default_path()?,
    };
    let mut config = Config::load_or_default(Some(config_path.as_path())).await?;
    config.merge_env()?;
    apply_cli_config(&mut config, &cli.global);
    config.validate()?;

    let format = output_format(&cli.global, &config);
    let renderer = OutputRenderer::new(format);

    // Config-only commands never touch the registry
    if let Commands::Fair { state } = cli.command {
        config.locks.fair_selection = state.enabled();
        config.save_to_file(&config_path).await?;
        let message = format!(
            "Fair selection {} in {}",
            if state.enabled() { "enabled" } else { "disabled" },
            config_path.display()
        );
        renderer.render(&CommandOutput::Success { message })?;
        return Ok(());
    }

    let (event_sender, event_receiver) = lockyard_events::channel();
    let store = Arc::new(JsonFileStore::new(config.registry_path()));
    let manager = LockManager::new(store, lock_settings(&config)).with_event_sender(event_sender);
    manager.load().await?;
    let seeded = manager
        .seed(config.resources.iter().map(ResourceSeed::to_resource))
        .await;
    if seeded > 0 {
        info!(seeded, "added resources from config");
    }

    let mut event_handler = EventHandler::new(format != OutputFormat::Json);
    let output =
        execute_command_with_events(cli.command, &manager, event_receiver, &mut event_handler)
            .await?;

    renderer.render(&output)?;
    info!("Command completed successfully");
    Ok(())
}

/// Execute command with concurrent event handling
async fn execute_command_with_events(
    command: Commands,
    manager: &LockManager,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
) -> Result<CommandOutput, CliError> {
    let mut command_future = Box::pin(execute_command(command, manager));

    loop {
        select! {
            result = &mut command_future => {
                while let Ok(message) = event_receiver.try_recv() {
                    event_handler.handle_event(&message);
                }
                return result;
            }

            message = event_receiver.recv() => {
                if let Some(message) = message {
                    event_handler.handle_event(&message);
                }
            }
        }
    }
}

/// Execute the specified command
async fn execute_command(
    command: Commands,
    manager: &LockManager,
) -> Result<CommandOutput, CliError> {
    match command {
        Commands::List { matching } => {
            let mut resources = manager.resources().await;
            if let Some(expression) = matching {
                let matched = matching_names(manager, &expression, &Environment::new()).await?;
                resources.retain(|r| matched.contains(&r.name));
            }
            Ok(CommandOutput::Resources { resources })
        }

        Commands::Create {
            name,
            capabilities,
            description,
        } => {
            let tags = capabilities
                .as_deref()
                .map(Resource::parse_capabilities)
                .unwrap_or_default();
            manager.create_resource(&name, tags, description).await?;
            Ok(CommandOutput::Success {
                message: format!("Created resource {}", name.trim()),
            })
        }

        Commands::Delete { name } => {
            let removed = manager.delete_resource(&name).await?;
            Ok(CommandOutput::Success {
                message: format!("Deleted resource {}", removed.name),
            })
        }

        Commands::Tag { name, capabilities } => {
            manager
                .set_capabilities(&name, Resource::parse_capabilities(&capabilities))
                .await?;
            Ok(CommandOutput::Success {
                message: format!("Updated capabilities of {name}"),
            })
        }

        Commands::Capabilities { with_names } => Ok(CommandOutput::Capabilities {
            capabilities: manager.capabilities(with_names).await.into_iter().collect(),
        }),

        Commands::Reserve { names, by } => {
            manager.reserve(&names, &by).await?;
            Ok(CommandOutput::Success {
                message: format!("Reserved [{}] for {by}", names.join(", ")),
            })
        }

        Commands::Unreserve { names } => {
            let outcome = manager.unreserve(&names).await?;
            Ok(CommandOutput::Released {
                resources: outcome.released,
            })
        }

        Commands::Reset { names } => {
            let outcome = manager.reset(&names).await?;
            Ok(CommandOutput::Released {
                resources: outcome.released,
            })
        }

        Commands::Lock {
            requester,
            request,
            variable,
        } => {
            let mut request = build_request(request)?;
            if let Some(variable) = variable {
                request = request.with_variable(variable);
            }
            let requester = Requester::new(requester, chrono::Utc::now());
            let grant = manager.try_acquire(&request, &requester).await?;
            Ok(CommandOutput::Granted { grant })
        }

        Commands::Unlock { requester, names } => {
            let outcome = manager
                .release(
                    &RequesterId::new(requester),
                    &names,
                    manager.settings().default_precedence,
                )
                .await;
            Ok(CommandOutput::Released {
                resources: outcome.released,
            })
        }

        Commands::Match { expression, env } => {
            let environment: Environment = env.into_iter().collect();
            let matched = matching_names(manager, &expression, &environment).await?;
            let mut resources = manager.resources().await;
            resources.retain(|r| matched.contains(&r.name));
            let free = manager.free_amount(&expression, &environment).await;
            Ok(CommandOutput::Matches {
                expression,
                free,
                resources,
            })
        }

        Commands::Plan { request, any_state } => {
            let request = build_request(request)?;
            let resources = manager.preview(&request, !any_state).await?;
            Ok(CommandOutput::Plan { resources })
        }

        Commands::Fair { .. } => Err(CliError::InvalidArguments(
            "fair is handled before the registry is opened".to_string(),
        )),
    }
}

/// Names of every resource matching `expression`, regardless of state
async fn matching_names(
    manager: &LockManager,
    expression: &str,
    environment: &Environment,
) -> Result<Vec<String>, CliError> {
    let request = ResourceRequest::new()
        .with_capability(expression, 0)
        .with_environment(environment.clone());
    match manager.preview(&request, false).await {
        Ok(names) => Ok(names),
        Err(lockyard_errors::LockError::Unsatisfiable { .. }) => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

fn build_request(args: RequestArgs) -> Result<ResourceRequest, CliError> {
    let mut request = ResourceRequest::new().with_environment(args.env.into_iter().collect());
    if !args.resources.is_empty() {
        request = request.with_names(args.resources);
    }
    for group in args.groups {
        request = request.with_group(group);
    }
    if request.groups.is_empty() {
        return Err(CliError::InvalidArguments(
            "give at least one --resource or --capability".to_string(),
        ));
    }
    Ok(request)
}

fn lock_settings(config: &Config) -> LockSettings {
    LockSettings {
        fair_selection: config.locks.fair_selection,
        default_precedence: config.locks.queue_precedence,
        auto_create_resources: config.locks.auto_create_resources,
    }
}

fn output_format(global: &cli::GlobalArgs, config: &Config) -> OutputFormat {
    if global.json {
        OutputFormat::Json
    } else if global.plain {
        OutputFormat::Plain
    } else {
        config.general.default_output
    }
}

/// Apply CLI configuration overrides (highest precedence)
fn apply_cli_config(config: &mut Config, global: &cli::GlobalArgs) {
    if let Some(path) = &global.registry {
        config.registry.path = Some(path.clone());
    }
}

/// Initialize tracing/logging
fn init_tracing(json_mode: bool, debug_enabled_flag: bool) {
    let debug_enabled = std::env::var("RUST_LOG").is_ok() || debug_enabled_flag;

    if json_mode && !debug_enabled {
        // keep stdout clean for the JSON document
        tracing_subscriber::fmt()
            .with_writer(std::io::sink)
            .with_env_filter("off")
            .init();
    } else if json_mode {
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new("info,lockyard=debug")
                }),
            )
            .init();
    } else if debug_enabled {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new(
                        "info,lockyard=debug,lockyard_lock=debug,lockyard_resolver=debug",
                    )
                }),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .init();
    }
}
