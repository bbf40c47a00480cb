//! Guest agent updater CLI
//!
//! Entry point for the `guest-agent-updater` command-line tool.

use clap::{Parser, Subcommand};
use guest_agent_updater::logging::init_logging;
use guest_agent_updater::signal::SignalHandler;
use guest_agent_updater::{CancelToken, EngineResult, UpdateEngine, UpdaterConfig};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "guest-agent-updater")]
#[command(about = "Installs, updates and manages the cloud guest agent", version)]
struct Cli {
    /// Path to config file (default: /etc/guest-agent-updater/config.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Log level or filter directive (RUST_LOG takes precedence)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show what `update` would do without changing anything
    #[command(alias = "dry-run")]
    Check {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Download the latest release and install it, rolling back on failure
    Update,

    /// Start the agent service
    Start,

    /// Stop the agent service
    Stop,

    /// Stop and unregister the agent service and delete the installation
    Remove,

    /// Print the updater version
    Version,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli.log_level) {
        eprintln!("Error initializing logging: {}", e);
        process::exit(1);
    }

    match cli.command {
        Commands::Check { json } => run_with_engine(cli.config, |engine| {
            let action = engine.check()?;
            if json {
                let output = serde_json::json!({
                    "action": action.as_str(),
                    "code": action.code(),
                });
                println!("{}", output);
            } else {
                println!("{}", action);
            }
            Ok(())
        }),
        Commands::Update => run_with_engine(cli.config, UpdateEngine::update),
        Commands::Start => run_with_engine(cli.config, |engine| engine.start()),
        Commands::Stop => run_with_engine(cli.config, |engine| engine.stop()),
        Commands::Remove => run_with_engine(cli.config, UpdateEngine::remove),
        Commands::Version => run_version(),
    }
}

fn run_version() {
    let version = env!("CARGO_PKG_VERSION");
    if guest_repo::parse_version(version).is_some() {
        println!("{}", version);
    } else {
        eprintln!("Error: build version '{}' is not a valid semantic version", version);
        process::exit(1);
    }
}

/// Build and initialize the engine, run `op`, then close the engine.
///
/// Exits the process with status 1 on any error. An error from `op` is
/// reported in preference to an error from closing.
fn run_with_engine<F>(config_path: Option<PathBuf>, op: F)
where
    F: FnOnce(&mut UpdateEngine) -> EngineResult<()>,
{
    let config = match UpdaterConfig::load(config_path.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            process::exit(1);
        }
    };

    let cancel = CancelToken::new();
    let signals = SignalHandler::new(cancel.clone());
    if let Err(e) = signals.install() {
        eprintln!("Error installing signal handler: {}", e);
        process::exit(1);
    }

    let mut engine = match UpdateEngine::from_config(&config, cancel) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let result = engine.init().and_then(|()| op(&mut engine));
    let closed = engine.close();

    if let Err(e) = result.and(closed) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
