//! Admin cog: clearance management and cog lifecycle from chat.
//!
//! Every command is hidden and requires [`ClearanceLevel::ADMIN`].

use super::command;
use car::converter::InRange;
use car::model::UserId;
use car::{
    ArgType, Argument, Args, BotHandle, CarError, Check, ClearanceLevel, Cog, CommandBuilder,
    CommandResult, Context, Declaration, RequiresClearance,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Longest export shown inline when no export file is configured.
const INLINE_EXPORT_LIMIT: usize = 1800;

pub struct Admin {
    bot: BotHandle,
    export_path: Option<PathBuf>,
}

/// Registry mistakes are the admin's to read, not a server fault.
fn lifecycle_error(err: CarError) -> CarError {
    match err {
        CarError::Configuration(msg) => CarError::Command(msg),
        other => other,
    }
}

/// Write the structured command registration JSON.
pub async fn write_export(path: &Path, commands: &[Value]) -> Result<(), CarError> {
    let json = serde_json::to_string_pretty(commands)
        .map_err(|e| CarError::Internal(anyhow::Error::new(e)))?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| CarError::Storage(format!("failed to write {}: {e}", path.display())))?;
    info!(path = %path.display(), commands = commands.len(), "Command schema exported");
    Ok(())
}

impl Admin {
    pub fn new(bot: BotHandle, export_path: Option<PathBuf>) -> Self {
        Self { bot, export_path }
    }

    async fn set_clearance(self: Arc<Self>, ctx: Arc<Context>, args: Args) -> CommandResult {
        let user = UserId(args.int("user_id")? as u64);
        let level = args.int("level")?;
        ctx.clearance.set_clearance(user, level).await?;

        info!(user = %user, level, by = %ctx.author.id, "Clearance level changed");
        ctx.respond(format!("Clearance level of `{user}` set to `{level}`"))
            .await
    }

    async fn load(self: Arc<Self>, ctx: Arc<Context>, args: Args) -> CommandResult {
        let cog = args.str("cog")?;
        self.bot.load(cog).map_err(lifecycle_error)?;
        ctx.respond(format!("Loaded `{cog}`")).await
    }

    async fn unload(self: Arc<Self>, ctx: Arc<Context>, args: Args) -> CommandResult {
        let cog = args.str("cog")?;
        self.bot.unload(cog).map_err(lifecycle_error)?;
        ctx.respond(format!("Unloaded `{cog}`")).await
    }

    async fn reload(self: Arc<Self>, ctx: Arc<Context>, args: Args) -> CommandResult {
        let cog = args.str("cog")?;
        self.bot.reload(cog).map_err(lifecycle_error)?;
        ctx.respond(format!("Reloaded `{cog}`")).await
    }

    async fn cogs(self: Arc<Self>, ctx: Arc<Context>, _args: Args) -> CommandResult {
        let (loaded, available) = self.bot.with_registry(|registry| {
            let loaded: Vec<String> = registry.cogs().map(|c| format!("`{c}`")).collect();
            let available: Vec<String> = registry
                .cog_classes()
                .filter(|c| !registry.is_loaded(c))
                .map(|c| format!("`{c}`"))
                .collect();
            (loaded, available)
        })?;

        let list = |names: Vec<String>| {
            if names.is_empty() {
                "*(None)*".to_string()
            } else {
                names.join(", ")
            }
        };
        ctx.respond(format!(
            "Loaded: {}\nAvailable: {}",
            list(loaded),
            list(available)
        ))
        .await
    }

    async fn export(self: Arc<Self>, ctx: Arc<Context>, _args: Args) -> CommandResult {
        let commands = self.bot.export()?;
        if let Some(path) = &self.export_path {
            write_export(path, &commands).await?;
            return ctx
                .respond(format!(
                    "Exported {} commands to `{}`",
                    commands.len(),
                    path.display()
                ))
                .await;
        }

        let json = serde_json::to_string(&commands)
            .map_err(|e| CarError::Internal(anyhow::Error::new(e)))?;
        if json.len() > INLINE_EXPORT_LIMIT {
            return Err(CarError::command(format!(
                "The export is {} bytes; configure `export.path` to write it to a file.",
                json.len()
            )));
        }
        ctx.respond(format!("```json\n{json}\n```")).await
    }
}

impl Cog for Admin {
    fn category(&self) -> Option<&str> {
        Some("Admin")
    }

    fn checks(&self) -> Vec<Arc<dyn Check>> {
        vec![Arc::new(RequiresClearance::new(ClearanceLevel::ADMIN))]
    }

    fn commands(self: Arc<Self>) -> Result<Vec<Declaration>, CarError> {
        let cog_arg = || Argument::new("cog", ArgType::Str).description("the name of a cog");
        Ok(vec![
            CommandBuilder::new("set_clearance")
                .description("Sets a user's clearance level")
                .hidden()
                .arg(Argument::new("user_id", ArgType::Int).range(InRange::at_least(0)))
                .arg(Argument::new("level", ArgType::Int))
                .handler(command(&self, Self::set_clearance))
                .build_text()?,
            CommandBuilder::new("load")
                .hidden()
                .arg(cog_arg())
                .handler(command(&self, Self::load))
                .build_text()?,
            CommandBuilder::new("unload")
                .hidden()
                .arg(cog_arg())
                .handler(command(&self, Self::unload))
                .build_text()?,
            CommandBuilder::new("reload")
                .hidden()
                .arg(cog_arg())
                .handler(command(&self, Self::reload))
                .build_text()?,
            CommandBuilder::new("cogs")
                .hidden()
                .handler(command(&self, Self::cogs))
                .build_text()?,
            CommandBuilder::new("export")
                .description("Exports the structured command list")
                .hidden()
                .handler(command(&self, Self::export))
                .build_text()?,
        ])
    }
}
