//! Auth Service - operator CLI.

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use auth_service_lib::AuthServiceConfig;
use credential_store::MigrateAction;

#[derive(Parser)]
#[command(name = "auth-service")]
#[command(about = "Credential and session lifecycle service")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the credential store schema
    Migrate {
        #[arg(value_enum, default_value = "up")]
        action: MigrateCommand,
    },
    /// Verify Postgres and Redis are reachable
    Check,
}

#[derive(Clone, Copy, ValueEnum)]
enum MigrateCommand {
    /// Apply pending migrations
    Up,
    /// Roll back the last migration
    Down,
    /// List migrations and whether they are applied
    Status,
    /// Drop all tables and re-apply every migration
    Fresh,
}

impl From<MigrateCommand> for MigrateAction {
    fn from(command: MigrateCommand) -> Self {
        match command {
            MigrateCommand::Up => MigrateAction::Up,
            MigrateCommand::Down => MigrateAction::Down,
            MigrateCommand::Status => MigrateAction::Status,
            MigrateCommand::Fresh => MigrateAction::Fresh,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AuthServiceConfig::from_env()?;
    tracing::debug!(?config, "Configuration loaded");

    match cli.command {
        Commands::Migrate { action } => {
            let action = MigrateAction::from(action);
            let states = auth_service_lib::run_migrations(&config, action).await?;
            for state in states {
                let marker = if state.applied { "[x]" } else { "[ ]" };
                println!("{} {}", marker, state.name);
            }
        }
        Commands::Check => {
            auth_service_lib::check(&config).await?;
            println!("ok");
        }
    }

    Ok(())
}
