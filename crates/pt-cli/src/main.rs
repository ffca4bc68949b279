use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pt_cli::commands::{cycles, overlaps, regen, report, tools, users};
use pt_cli::{Cli, Commands, Config, CyclesAction, RegenAction, ToolsAction, UsersAction};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(pt_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = pt_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((db, config))
}

#[expect(
    clippy::too_many_lines,
    reason = "CLI command dispatch is inherently verbose"
)]
fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    match &cli.command {
        Some(Commands::Cycles { action }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            match action {
                CyclesAction::Add {
                    press,
                    tool,
                    position,
                    total,
                    user,
                    date,
                } => cycles::add(&db, *press, *tool, position, *total, *user, date.as_deref())?,
                CyclesAction::List {
                    press,
                    tool,
                    limit,
                    offset,
                    json,
                } => cycles::list(&db, *press, *tool, *limit, *offset, *json)?,
                CyclesAction::Delete { id } => cycles::delete(&db, *id)?,
            }
        }
        Some(Commands::Report { press, json }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            report::run(&db, *press, *json)?;
        }
        Some(Commands::Overlaps { json }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            overlaps::run(&db, *json)?;
        }
        Some(Commands::Regen { action }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            match action {
                RegenAction::Start { tool, reason, user } => {
                    regen::start(&db, *tool, reason, *user)?;
                }
                RegenAction::Stop { tool, user } => regen::stop(&db, *tool, *user)?,
                RegenAction::Abort { tool, user } => regen::abort(&db, *tool, *user)?,
                RegenAction::History { tool, json } => regen::history(&db, *tool, *json)?,
            }
        }
        Some(Commands::Tools { action }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            match action {
                ToolsAction::Add {
                    position,
                    width,
                    height,
                    code,
                    kind,
                } => tools::add(&db, position, *width, *height, code, kind)?,
                ToolsAction::List { json } => tools::list(&db, *json)?,
                ToolsAction::SetPress { tool, press, user } => {
                    tools::set_press(&db, *tool, *press, *user)?;
                }
                ToolsAction::MarkDead { tool, user } => tools::mark_dead(&db, *tool, *user)?,
                ToolsAction::Revive { tool, user } => tools::revive(&db, *tool, *user)?,
            }
        }
        Some(Commands::Users { action }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            match action {
                UsersAction::Add { name } => users::add(&db, name)?,
                UsersAction::List { json } => users::list(&db, *json)?,
            }
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
