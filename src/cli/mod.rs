//! CLI module: command parsing and dispatch
//!
//! All CLI logic lives here. `main.rs` calls `cli::run()`.

pub mod agent;
pub mod care;
pub mod common;
pub mod config;
pub mod daemon;
pub mod status;

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "petclaw")]
#[command(version)]
#[command(about = "A companion creature that lives on your host", long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.petclaw/config.json)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one message to the pet and print the reply
    Ask {
        /// Message text
        #[arg(required = true)]
        message: Vec<String>,
    },
    /// Talk to the pet interactively
    Chat,
    /// Show vitals, mood and host metrics
    Status {
        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Give the pet a name and species (restarts its life)
    Name { name: String, species: String },
    /// Feed the pet
    Feed,
    /// Play with the pet
    Play,
    /// Pet the pet
    Pet,
    /// Bring a dead pet back
    Revive,
    /// End the pet's life
    Kill,
    /// Fold one metrics sample from a JSON file into the pet
    Sample {
        /// File holding a JSON metrics object
        path: PathBuf,
    },
    /// Run background telemetry and persistence until interrupted
    Daemon {
        /// JSON metrics file refreshed by an external sampler
        #[arg(long, value_name = "PATH")]
        metrics_file: Option<PathBuf>,
    },
    /// Validate configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show version information
    Version,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Load and validate the config, reporting problems
    Check,
    /// Print the effective config with secrets masked
    Show,
}

/// Entry point for the CLI, called from main().
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Respect logging settings when the config loads; otherwise fall back to
    // defaults so a broken config still produces readable errors.
    let logging_cfg = common::load_config(cli.config.as_deref())
        .map(|c| c.logging)
        .unwrap_or_default();
    petclaw::utils::logging::init_logging(&logging_cfg);

    let config_path = cli.config.as_deref();

    match cli.command {
        None => {
            let mut cmd = Cli::command();
            cmd.print_help()?;
            println!();
        }
        Some(Commands::Ask { message }) => {
            agent::cmd_ask(config_path, message.join(" ")).await?;
        }
        Some(Commands::Chat) => {
            agent::cmd_chat(config_path).await?;
        }
        Some(Commands::Status { json }) => {
            status::cmd_status(config_path, json)?;
        }
        Some(Commands::Name { name, species }) => {
            care::cmd_name(config_path, &name, &species)?;
        }
        Some(Commands::Feed) => care::cmd_care(config_path, care::CareAction::Feed)?,
        Some(Commands::Play) => care::cmd_care(config_path, care::CareAction::Play)?,
        Some(Commands::Pet) => care::cmd_care(config_path, care::CareAction::Pet)?,
        Some(Commands::Revive) => care::cmd_revive(config_path)?,
        Some(Commands::Kill) => care::cmd_kill(config_path)?,
        Some(Commands::Sample { path }) => {
            daemon::cmd_sample(config_path, path).await?;
        }
        Some(Commands::Daemon { metrics_file }) => {
            daemon::cmd_daemon(config_path, metrics_file).await?;
        }
        Some(Commands::Config { action }) => {
            config::cmd_config(config_path, action)?;
        }
        Some(Commands::Version) => {
            cmd_version();
        }
    }

    Ok(())
}

/// Display version information
fn cmd_version() {
    println!("petclaw {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("A companion creature that lives on your host");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ask_joins_words() {
        let cli = Cli::try_parse_from(["petclaw", "ask", "how", "are", "you"]).unwrap();
        match cli.command {
            Some(Commands::Ask { message }) => assert_eq!(message.join(" "), "how are you"),
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["petclaw", "status", "--config", "/tmp/c.json"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.json")));
        assert!(matches!(cli.command, Some(Commands::Status { json: false })));
    }

    #[test]
    fn test_parse_daemon_metrics_file() {
        let cli =
            Cli::try_parse_from(["petclaw", "daemon", "--metrics-file", "/run/metrics.json"])
                .unwrap();
        match cli.command {
            Some(Commands::Daemon { metrics_file }) => {
                assert_eq!(metrics_file, Some(PathBuf::from("/run/metrics.json")))
            }
            _ => panic!("expected daemon"),
        }
    }
}
