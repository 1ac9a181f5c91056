//! Apply the embedded schema migrations to the configured database.
//!
//! Settings come from `USER_STORE_*` environment variables and config files;
//! `--database-url` overrides whatever they resolve to.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;

use clap::Parser;
use color_eyre::eyre::{Context, Result, eyre};
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};
use user_store::DatabaseSettings;
use user_store::outbound::persistence::run_pending_migrations;

/// `migrate` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "migrate",
    about = "Create or upgrade the users and emails schema",
    version
)]
struct CliArgs {
    /// Database connection URL. Falls back to the configured settings.
    #[arg(long = "database-url", value_name = "url")]
    database_url: Option<String>,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let args = CliArgs::parse();
    let database_url = resolve_database_url(args.database_url, load_settings)?;

    let applied = run_pending_migrations(&database_url).wrap_err("migration run failed")?;
    if applied.is_empty() {
        info!("schema already up to date");
    }
    for version in applied {
        println!("applied={version}");
    }
    Ok(())
}

fn load_settings() -> Result<DatabaseSettings> {
    DatabaseSettings::load_from_iter([OsString::from("migrate")])
        .map_err(|err| eyre!("failed to load database settings: {err}"))
}

/// Settings are only loaded when no `--database-url` was given.
fn resolve_database_url(
    cli: Option<String>,
    load: impl FnOnce() -> Result<DatabaseSettings>,
) -> Result<String> {
    match cli {
        Some(url) if url.trim().is_empty() => Err(eyre!("--database-url must not be empty")),
        Some(url) => Ok(url),
        None => load()?
            .database_url()
            .wrap_err("failed to resolve database url from settings"),
    }
}
