//! Meta cog: help, ping and usage stats.

use super::command;
use car::model::Embed;
use car::value::ArgValue;
use car::{
    ArgType, Argument, Args, BotHandle, CarError, Cog, CommandBuilder, CommandResult, Context,
    Declaration,
};
use futures_util::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Commands listed by `stats`.
const TOP_COMMANDS: usize = 5;

pub struct Meta {
    bot: BotHandle,
}

impl Meta {
    pub fn new(bot: &BotHandle) -> Self {
        Self { bot: bot.clone() }
    }

    async fn help(self: Arc<Self>, ctx: Arc<Context>, args: Args) -> CommandResult {
        match args.optional("command").and_then(ArgValue::as_str) {
            None => self.list_commands(&ctx).await,
            Some(name) => self.describe_command(&ctx, name).await,
        }
    }

    async fn list_commands(&self, ctx: &Context) -> CommandResult {
        let categories = self.bot.with_registry(|registry| {
            let mut categories: BTreeMap<String, Vec<String>> = BTreeMap::new();
            for cmd in registry.text_commands().filter(|c| !c.core.is_hidden()) {
                categories
                    .entry(cmd.core.category().to_string())
                    .or_default()
                    .push(format!("`{}`", cmd.name()));
            }
            categories
        })?;

        let mut embed = Embed::described(format!(
            "Use `{}help <command>` for details on a command.",
            ctx.prefix
        ))
        .titled("Commands");
        for (category, names) in categories {
            embed = embed.field(category, names.join(" "));
        }
        ctx.respond(embed).await
    }

    async fn describe_command(&self, ctx: &Context, name: &str) -> CommandResult {
        let cmd = self
            .bot
            .with_registry(|registry| registry.text_command(name))?
            .filter(|c| !c.core.is_hidden())
            .ok_or_else(|| CarError::command(format!("There's no command called `{name}`!")))?;

        let mut description = cmd.core.description().to_string();
        if !description.is_empty() {
            description.push_str("\n\n");
        }
        description.push_str(&cmd.core.usage(&ctx.prefix));

        let mut embed = Embed::described(description).titled(cmd.name());
        if !cmd.aliases.is_empty() {
            let aliases: Vec<String> = cmd.aliases.iter().map(|a| format!("`{a}`")).collect();
            embed = embed.field("Aliases", aliases.join(", "));
        }

        let requirements = join_all(cmd.core.checks().iter().map(|check| check.describe(ctx))).await;
        if !requirements.is_empty() {
            embed = embed.field("Requirements", requirements.join("\n"));
        }
        ctx.respond(embed).await
    }

    async fn ping(self: Arc<Self>, ctx: Arc<Context>, _args: Args) -> CommandResult {
        ctx.respond("Pong!").await
    }

    async fn stats(self: Arc<Self>, ctx: Arc<Context>, _args: Args) -> CommandResult {
        let (cogs, top) = self.bot.with_registry(|registry| {
            let top: Vec<String> = registry
                .command_stats()
                .into_iter()
                .take(TOP_COMMANDS)
                .map(|(name, uses)| format!("`{name}`: {uses}"))
                .collect();
            (registry.cogs().count(), top)
        })?;

        let top = if top.is_empty() {
            "*(None)*".to_string()
        } else {
            top.join("\n")
        };
        let embed = Embed::default()
            .titled("Stats")
            .field("Uptime", format_uptime(self.bot.uptime()))
            .field("Cogs loaded", cogs.to_string())
            .field("Most used commands", top);
        ctx.respond(embed).await
    }
}

impl Cog for Meta {
    fn category(&self) -> Option<&str> {
        Some("Meta")
    }

    fn commands(self: Arc<Self>) -> Result<Vec<Declaration>, CarError> {
        Ok(vec![
            CommandBuilder::new("help")
                .description("Lists my commands, or explains one of them")
                .arg(
                    Argument::new("command", ArgType::Str)
                        .description("the name of a command")
                        .default(ArgValue::Null),
                )
                .handler(command(&self, Self::help))
                .build_text()?,
            CommandBuilder::new("ping")
                .description("Checks whether I'm alive")
                .handler(command(&self, Self::ping))
                .build_mixed()?,
            CommandBuilder::new("stats")
                .description("Shows uptime and the most used commands")
                .handler(command(&self, Self::stats))
                .build_mixed()?,
        ])
    }
}

/// `3d 04h 05m 06s`, dropping leading zero units.
fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    let (d, h, m, s) = (secs / 86_400, secs / 3600 % 24, secs / 60 % 60, secs % 60);
    if d > 0 {
        format!("{d}d {h:02}h {m:02}m {s:02}s")
    } else if h > 0 {
        format!("{h}h {m:02}m {s:02}s")
    } else if m > 0 {
        format!("{m}m {s:02}s")
    } else {
        format!("{s}s")
    }
}
