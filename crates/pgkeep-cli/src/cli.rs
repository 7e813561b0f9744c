//! pgkeep command line interface
//!
//! Usage:
//!   pgkeep health [--verbose]
//!   pgkeep validate --tables users,orders
//!   pgkeep fix [--tables ...]
//!   pgkeep standards [--tables ...] [--dry-run]
//!   pgkeep event-triggers [--enable | --disable] [--yes]
//!   pgkeep generate-migration [--output-dir DIR]
//!   pgkeep install

mod action;
mod logging;
mod output;
mod settings_file;

use action::{Action, ActionOptions, Toggle};
use anyhow::{Context, Result};
use clap::{Args, Parser};
use pgkeep_core::{Catalog, Connection, Maintenance};
use pgkeep_postgres::{ConnectionOptions, PgCatalog, PostgresConnection, SqlAssets, SslMode};
use pgkeep_standards::{DEFAULT_MIGRATION_DIR, StandardsEngine};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    name = "pgkeep",
    about = "Keep PostgreSQL schemas in line with table standards",
    version
)]
struct Cli {
    /// health, validate, fix, standards, event-triggers, generate-migration or install
    action: String,

    /// Restrict the action to these tables (comma separated)
    #[arg(long, value_delimiter = ',')]
    tables: Vec<String>,

    /// Report what `standards` would change without changing it
    #[arg(long)]
    dry_run: bool,

    /// Enable the event trigger
    #[arg(long)]
    enable: bool,

    /// Disable the event trigger
    #[arg(long)]
    disable: bool,

    /// Do not ask for confirmation
    #[arg(short = 'y', long)]
    yes: bool,

    /// Show per-check details and operation statistics
    #[arg(short, long)]
    verbose: bool,

    /// Print machine-readable JSON
    #[arg(long)]
    json: bool,

    /// Settings file (defaults to the user config directory)
    #[arg(long, env = "PGKEEP_CONFIG")]
    config: Option<PathBuf>,

    /// Where `generate-migration` writes its file
    #[arg(long, default_value = DEFAULT_MIGRATION_DIR)]
    output_dir: PathBuf,

    #[command(flatten)]
    connection: ConnectionArgs,
}

#[derive(Args, Debug)]
struct ConnectionArgs {
    #[arg(long, env = "PGHOST", default_value = "localhost")]
    host: String,

    #[arg(long, env = "PGPORT", default_value_t = 5432)]
    port: u16,

    #[arg(long, env = "PGDATABASE", default_value = "postgres")]
    database: String,

    #[arg(long, env = "PGUSER")]
    user: Option<String>,

    #[arg(long, env = "PGPASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// disable, prefer, require, verify-ca or verify-full
    #[arg(long, env = "PGSSLMODE", default_value = "prefer")]
    sslmode: String,

    #[arg(long, env = "PGSSLROOTCERT")]
    sslrootcert: Option<PathBuf>,

    #[arg(long, env = "PGSSLCERT")]
    sslcert: Option<PathBuf>,

    #[arg(long, env = "PGSSLKEY")]
    sslkey: Option<PathBuf>,

    /// Schema to inspect, overriding the settings file
    #[arg(long)]
    schema: Option<String>,
}

impl ConnectionArgs {
    fn to_options(&self) -> Result<ConnectionOptions> {
        let ssl_mode: SslMode = self
            .sslmode
            .parse()
            .with_context(|| format!("Invalid sslmode '{}'", self.sslmode))?;
        Ok(ConnectionOptions {
            host: self.host.clone(),
            port: self.port,
            database: self.database.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            ssl_mode,
            ssl_ca_cert: self.sslrootcert.clone(),
            ssl_client_cert: self.sslcert.clone(),
            ssl_client_key: self.sslkey.clone(),
            ..ConnectionOptions::default()
        })
    }
}

#[tokio::main]
async fn main() {
    match run(Cli::parse()).await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    // Configuration errors are reported before any connection is opened.
    let action: Action = match cli.action.parse() {
        Ok(action) => action,
        Err(err) => {
            eprintln!("{err}");
            return Ok(1);
        }
    };
    let toggle = match Toggle::from_flags(cli.enable, cli.disable) {
        Ok(toggle) => toggle,
        Err(err) => {
            eprintln!("{err}");
            return Ok(1);
        }
    };

    let mut settings = settings_file::load(cli.config.as_deref())?;
    if let Some(schema) = &cli.connection.schema {
        settings.schema = schema.clone();
    }

    logging::init(logging::LoggingConfig::from_settings(
        &settings.logging,
        cli.verbose,
    )?)?;

    let assets = SqlAssets::load(settings.sql_dir.as_deref()).context("Failed to load packaged SQL")?;

    let options = cli.connection.to_options()?;
    let connection = PostgresConnection::connect(&options)
        .await
        .with_context(|| format!("Failed to connect to {}:{}/{}", options.host, options.port, options.database))?;
    let connection: Arc<dyn Connection> = Arc::new(connection);

    let catalog = Arc::new(PgCatalog::new(connection.clone(), settings.schema.clone(), assets));
    let engine = StandardsEngine::new(
        catalog.clone() as Arc<dyn Catalog>,
        catalog as Arc<dyn Maintenance>,
        settings,
    )?;

    let action_options = ActionOptions {
        tables: cli.tables,
        dry_run: cli.dry_run,
        toggle,
        assume_yes: cli.yes,
        verbose: cli.verbose,
        json: cli.json,
        output_dir: cli.output_dir,
    };

    let code = action::execute(action, &engine, &action_options).await;

    if let Err(err) = connection.close().await {
        tracing::warn!(error = %err, "failed to close connection");
    }

    code
}
