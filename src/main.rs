use anyhow::Result;
use clap::{Parser, Subcommand};
use foodgram::commands;
use foodgram::config::{Config, DEFAULT_CONFIG_FILE};
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the YAML config file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Log at debug level regardless of config
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve,
    /// Manage database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Import ingredients from a JSON file
    ImportIngredients {
        /// JSON array of {"name", "measurement_unit"} objects
        file: PathBuf,
    },
    /// Import tags from a JSON file
    ImportTags {
        /// JSON array of {"name", "color", "slug"} objects
        file: PathBuf,
    },
    /// Create an administrator account
    CreateAdmin {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        username: Option<String>,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply all pending migrations
    Up,
    /// Roll back the most recent migration
    Down,
    /// List migrations and whether they are applied
    Status,
}

fn init_tracing(config: &Config, verbose: bool) {
    let level = if verbose {
        Level::DEBUG
    } else {
        config.log_level.parse().unwrap_or(Level::INFO)
    };
    tracing_subscriber::fmt().with_max_level(level).init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(&cli.config)?;
    init_tracing(&config, cli.verbose);

    match &cli.command {
        Commands::Serve => commands::serve::execute_serve(config).await,
        Commands::Migrate { action } => match action {
            MigrateAction::Up => commands::migrate::execute_migrate_up(&config).await,
            MigrateAction::Down => commands::migrate::execute_migrate_down(&config).await,
            MigrateAction::Status => commands::migrate::execute_migrate_status(&config).await,
        },
        Commands::ImportIngredients { file } => {
            commands::import::execute_import_ingredients(&config, file).await
        }
        Commands::ImportTags { file } => commands::import::execute_import_tags(&config, file).await,
        Commands::CreateAdmin { email, username } => {
            commands::admin::execute_create_admin(&config, email.as_deref(), username.as_deref())
                .await
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }

    Ok(())
}
