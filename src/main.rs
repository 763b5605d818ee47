//! carbot - a chat bot daemon built on the `car` command framework.
//!
//! Platform events arrive as newline-delimited JSON on stdin and replies are
//! written the same way to stdout. Logs go to stderr.

mod cogs;
mod config;
mod db;
mod gateway;
mod prefix;

use crate::cogs::Services;
use crate::config::Config;
use crate::db::Database;
use crate::prefix::GuildPrefixes;
use car::model::UserId;
use car::{Bot, ClearanceLevel};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries protocol frames, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    if let Err(errors) = config::validate(&config, cogs::BUILTIN) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        return Err(anyhow::anyhow!(
            "{} configuration error(s) in {config_path}",
            errors.len()
        ));
    }

    info!(
        name = %config.bot.name,
        prefix = %config.bot.default_prefix,
        "Starting carbot"
    );

    let db = Database::new(&config.database.path).await?;
    for owner in &config.bot.owners {
        db.clearances()
            .set(UserId(*owner), ClearanceLevel::ADMIN)
            .await?;
    }
    info!(count = config.bot.owners.len(), "Owners seeded");

    let prefixes = Arc::new(GuildPrefixes::new(db.clone(), &config.bot.default_prefix));
    let bot = Bot::new(Arc::new(db.clone()), prefixes.clone());

    let export_path = config.export.as_ref().map(|e| PathBuf::from(&e.path));
    cogs::register(
        &bot,
        Services {
            db,
            prefixes,
            export_path: export_path.clone(),
        },
    )?;

    for cog in &config.cogs.load {
        bot.load(cog)?;
    }

    if let Some(path) = &export_path {
        cogs::write_export(path, &bot.export()).await?;
    }

    let (out, writer) = gateway::spawn_writer(tokio::io::stdout());
    gateway::run(&bot, BufReader::new(tokio::io::stdin()), out).await?;

    // Every sender is gone once `run` returns, so the writer drains and exits.
    writer.await??;
    info!("Shutdown complete");
    Ok(())
}
