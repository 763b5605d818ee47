//! Preconditions evaluated before a command runs.

use crate::context::Context;
use crate::error::CarError;
use crate::model::GuildId;
use async_trait::async_trait;
use indexmap::IndexMap;
use tracing::{error, warn};

pub const EMOTE_YES: &str = "`[✓]`";
pub const EMOTE_NO: &str = "`[ ]`";

fn emote(condition: bool) -> &'static str {
    if condition { EMOTE_YES } else { EMOTE_NO }
}

#[async_trait]
pub trait Check: Send + Sync {
    /// Fail with a check error when the precondition does not hold.
    async fn evaluate(&self, ctx: &Context) -> Result<(), CarError>;

    /// Status line for help output, whether or not the check passes.
    async fn describe(&self, ctx: &Context) -> String;

    /// Guild the owning command's registration is restricted to.
    fn guild_scope(&self) -> Option<GuildId> {
        None
    }
}

/// Capability flags that must (or must not) be granted in the channel.
#[derive(Debug, Clone)]
pub struct RequiresPermissions {
    permissions: IndexMap<String, bool>,
}

impl RequiresPermissions {
    pub fn new<I, S>(permissions: I) -> Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        Self {
            permissions: permissions.into_iter().map(|(p, v)| (p.into(), v)).collect(),
        }
    }

    /// Every flag must be granted.
    pub fn all<I, S>(flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(flags.into_iter().map(|f| (f, true)))
    }

    fn missing(&self, ctx: &Context) -> Result<Vec<&str>, CarError> {
        let Some(granted) = &ctx.permissions else {
            error!(?ctx, "non-guild-only command requires permissions");
            return Err(CarError::Context(
                "Non-guild-only command cannot require permissions".into(),
            ));
        };
        Ok(self
            .permissions
            .iter()
            .filter(|(flag, want)| granted.has(flag) != **want)
            .map(|(flag, _)| flag.as_str())
            .collect())
    }
}

#[async_trait]
impl Check for RequiresPermissions {
    async fn evaluate(&self, ctx: &Context) -> Result<(), CarError> {
        let missing = self.missing(ctx)?;
        if missing.is_empty() {
            return Ok(());
        }
        let list: Vec<String> = missing.iter().map(|p| format!("`{p}`")).collect();
        Err(CarError::check(format!(
            "You aren't allowed to use this command!\n\nMissing permissions:\n{}",
            list.join("\n")
        )))
    }

    async fn describe(&self, ctx: &Context) -> String {
        let missing = self.missing(ctx).unwrap_or_else(|_| self.permissions.keys().map(String::as_str).collect());
        let flags: Vec<String> = self
            .permissions
            .keys()
            .map(|p| {
                if missing.contains(&p.as_str()) {
                    format!("{p} (missing)")
                } else {
                    p.clone()
                }
            })
            .collect();
        format!("{} Requires permissions: {}", emote(missing.is_empty()), flags.join(", "))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GuildOnly;

#[async_trait]
impl Check for GuildOnly {
    async fn evaluate(&self, ctx: &Context) -> Result<(), CarError> {
        if ctx.is_direct_message() {
            return Err(CarError::check("This command is only available in servers!"));
        }
        Ok(())
    }

    async fn describe(&self, ctx: &Context) -> String {
        format!("{} Must be used in a server", emote(!ctx.is_direct_message()))
    }
}

/// Restricts a command to one guild, including its structured registration.
#[derive(Debug, Clone, Copy)]
pub struct SpecificGuildOnly {
    pub guild_id: GuildId,
}

impl SpecificGuildOnly {
    pub fn new(guild_id: GuildId) -> Self {
        Self { guild_id }
    }

    fn in_guild(&self, ctx: &Context) -> bool {
        ctx.guild.as_ref().is_some_and(|g| g.id == self.guild_id)
    }
}

#[async_trait]
impl Check for SpecificGuildOnly {
    async fn evaluate(&self, ctx: &Context) -> Result<(), CarError> {
        if ctx.is_direct_message() {
            return Err(CarError::check("This command is only available in servers!"));
        }
        if !self.in_guild(ctx) {
            return Err(CarError::check("This command is not available in this server!"));
        }
        Ok(())
    }

    async fn describe(&self, ctx: &Context) -> String {
        if self.in_guild(ctx) {
            format!("{EMOTE_YES} Is available in this server")
        } else {
            format!("{EMOTE_NO} Is not available in this server")
        }
    }

    fn guild_scope(&self) -> Option<GuildId> {
        Some(self.guild_id)
    }
}

/// Minimum stored clearance level for the invoking user.
#[derive(Debug, Clone, Copy)]
pub struct RequiresClearance {
    pub level: i64,
}

impl RequiresClearance {
    pub fn new(level: i64) -> Self {
        Self { level }
    }
}

#[async_trait]
impl Check for RequiresClearance {
    async fn evaluate(&self, ctx: &Context) -> Result<(), CarError> {
        let level = ctx.clearance.ensure(ctx.author.id).await?;
        if level < self.level {
            return Err(CarError::check("You aren't allowed to use this command!"));
        }
        Ok(())
    }

    async fn describe(&self, ctx: &Context) -> String {
        let allowed = match ctx.clearance.ensure(ctx.author.id).await {
            Ok(level) => level >= self.level,
            Err(e) => {
                warn!(error = %e, "clearance lookup failed while describing");
                false
            }
        };
        format!("{} Requires special permissions", emote(allowed))
    }
}
