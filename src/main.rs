//! Bibliotheca CLI Entry Point
//!
//! Prompts for credentials, connects to the administrative and catalog
//! databases and runs the interactive menu. Results go to stdout; errors and
//! logs go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use bibliotheca::config::{self, Overrides, Settings};
use bibliotheca::console::{Console, Terminal};
use bibliotheca::logging::init_logging;
use bibliotheca::{menu, ConnectionConfig, OutputFormat, PgConnection, Printer, Session};

/// Bibliotheca - interactive book catalog client for PostgreSQL
#[derive(Parser)]
#[command(name = "bibliotheca")]
#[command(about = "Manage a PostgreSQL book catalog and the roles allowed to use it")]
#[command(version)]
struct Cli {
    /// Server host [default: 127.0.0.1]
    #[arg(long)]
    host: Option<String>,

    /// Server port [default: 5432]
    #[arg(long)]
    port: Option<u16>,

    /// Login user (prompted when omitted)
    #[arg(long)]
    user: Option<String>,

    /// Administrative database [default: postgres]
    #[arg(long)]
    admin_database: Option<String>,

    /// Catalog database [default: library]
    #[arg(long)]
    catalog_database: Option<String>,

    /// Read configuration from this file instead of the local/global files
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print results and errors as JSON envelopes
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            admin_database: self.admin_database.clone(),
            catalog_database: self.catalog_database.clone(),
            output: self.json.then_some(OutputFormat::Json),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.quiet) {
        eprintln!("{e}");
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let file = config::load_with_precedence(cli.config.as_deref())?;
    let settings = Settings::resolve(file, cli.overrides())?;
    let printer = Printer::new(settings.output);
    let mut console = Terminal;

    let user = match settings.user.clone() {
        Some(user) => user,
        None => console.text("Enter username")?,
    };
    let password = console.password("Enter password")?;

    let admin_config = ConnectionConfig::postgres(
        settings.host.clone(),
        settings.port,
        user,
        password,
        settings.admin_database.clone(),
    );

    let session = Session::<PgConnection>::open(
        &admin_config,
        settings.catalog_database.clone(),
        settings.seed_roles.clone(),
    )
    .await
    .context("could not open the database connections")?;

    menu::run(session, &mut console, printer, settings.year_attempts).await?;
    Ok(())
}
