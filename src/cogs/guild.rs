//! Guild cog: per-server settings and join/leave messages.

use super::{command, listener};
use crate::db::{Database, GuildSettings, SettingValue};
use crate::prefix::GuildPrefixes;
use car::model::{Embed, Guild, Member, Reply};
use car::value::ArgValue;
use car::{
    ArgType, Argument, Args, CarError, Cog, CommandBuilder, CommandResult, Context, Declaration,
    Event, EventPayload, GuildOnly, Listener, RequiresPermissions,
};
use std::sync::Arc;
use tracing::debug;

const PLACEHOLDER_HELP: &str =
    "{name}, {discrim}, {id}, and {mention} are replaced with their respective values";

const NONE: &str = "*(None)*";

pub struct GuildCog {
    db: Database,
    prefixes: Arc<GuildPrefixes>,
}

/// Fill the join/leave message placeholders for `member`.
fn render_message(template: &str, member: &Member) -> String {
    template
        .replace("{name}", &member.user.name)
        .replace("{discrim}", &member.user.discriminator)
        .replace("{id}", &member.user.id.to_string())
        .replace("{mention}", &member.user.mention())
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

fn or_none(text: &str) -> &str {
    if text.is_empty() { NONE } else { text }
}

impl GuildCog {
    pub fn new(db: Database, prefixes: Arc<GuildPrefixes>) -> Self {
        Self { db, prefixes }
    }

    fn setting_value(name: &str, value: &ArgValue) -> Result<Option<SettingValue>, CarError> {
        let value = match value {
            ArgValue::Null => return Ok(None),
            ArgValue::Bool(b) => SettingValue::Bool(*b),
            ArgValue::Channel(c) => SettingValue::Channel(c.id),
            ArgValue::Str(s) if name == "prefix" => {
                if s.is_empty() || s.chars().any(char::is_whitespace) {
                    return Err(CarError::command("Prefixes can't be empty or contain spaces!"));
                }
                SettingValue::Text(s.clone())
            }
            ArgValue::Str(s) => SettingValue::Text(s.clone()),
            other => {
                return Err(CarError::Internal(anyhow::anyhow!(
                    "setting `{name}` resolved to unexpected {}",
                    other.kind()
                )));
            }
        };
        Ok(Some(value))
    }

    fn settings_embed(&self, settings: &GuildSettings, guild: &Guild) -> Embed {
        let channel = settings
            .joinleave_channel
            .and_then(|id| guild.channels.iter().find(|c| c.id == id))
            .map_or_else(|| NONE.to_string(), |c| c.mention());

        Embed::default()
            .titled("Settings")
            .field(
                "prefix",
                settings
                    .prefix
                    .as_deref()
                    .unwrap_or(self.prefixes.default_prefix()),
            )
            .field("join_message_enabled", yes_no(settings.join_message_enabled))
            .field("join_message", or_none(&settings.join_message))
            .field("leave_message_enabled", yes_no(settings.leave_message_enabled))
            .field("leave_message", or_none(&settings.leave_message))
            .field("joinleave_channel", channel)
    }

    async fn settings(self: Arc<Self>, ctx: Arc<Context>, args: Args) -> CommandResult {
        let guild = ctx.guild()?.clone();

        // Validate everything before writing anything.
        let mut updates = Vec::new();
        for (name, value) in args.iter() {
            if let Some(value) = Self::setting_value(name, value)? {
                updates.push((name.clone(), value));
            }
        }

        let repo = self.db.settings();
        for (name, value) in updates {
            repo.update(guild.id, &name, value).await?;
            if name == "prefix" {
                self.prefixes.invalidate(guild.id);
            }
        }

        let settings = repo.get(guild.id).await?;
        ctx.respond(self.settings_embed(&settings, &guild)).await
    }

    async fn on_member_join(self: Arc<Self>, event: Arc<Event>) -> CommandResult {
        let EventPayload::MemberJoin { guild, member } = &event.payload else {
            return Ok(());
        };
        let settings = self.db.settings().get(guild.id).await?;
        self.announce(&event, settings.join_message_enabled, &settings.join_message, &settings, member)
            .await
    }

    async fn on_member_leave(self: Arc<Self>, event: Arc<Event>) -> CommandResult {
        let EventPayload::MemberLeave { guild, member } = &event.payload else {
            return Ok(());
        };
        let settings = self.db.settings().get(guild.id).await?;
        self.announce(&event, settings.leave_message_enabled, &settings.leave_message, &settings, member)
            .await
    }

    async fn announce(
        &self,
        event: &Event,
        enabled: bool,
        template: &str,
        settings: &GuildSettings,
        member: &Member,
    ) -> CommandResult {
        let Some(channel) = settings.joinleave_channel else {
            return Ok(());
        };
        if !enabled || template.is_empty() {
            return Ok(());
        }
        debug!(guild = %settings.guild_id, event = %event.name, "Announcing member");
        event
            .outbox
            .send_to(channel, Reply::text(render_message(template, member)))
            .await
    }
}

impl Cog for GuildCog {
    fn category(&self) -> Option<&str> {
        Some("Server")
    }

    fn commands(self: Arc<Self>) -> Result<Vec<Declaration>, CarError> {
        let optional = |name: &str, kind: ArgType| Argument::new(name, kind).default(ArgValue::Null);
        Ok(vec![
            CommandBuilder::new("settings")
                .description("Views server settings. Specify arguments to change values")
                .alias("set")
                .alias("config")
                .alias("conf")
                .check(GuildOnly)
                .check(RequiresPermissions::all(["manage_guild"]))
                .arg(optional("prefix", ArgType::Str))
                .arg(optional("join_message_enabled", ArgType::Bool))
                .arg(optional("join_message", ArgType::Str).description(PLACEHOLDER_HELP))
                .arg(optional("leave_message_enabled", ArgType::Bool))
                .arg(optional("leave_message", ArgType::Str).description(PLACEHOLDER_HELP))
                .arg(optional("joinleave_channel", ArgType::TextChannel))
                .handler(command(&self, Self::settings))
                .build_mixed()?,
        ])
    }

    fn listeners(self: Arc<Self>) -> Vec<Listener> {
        vec![
            Listener::new("member_join", listener(&self, Self::on_member_join)),
            Listener::new("member_leave", listener(&self, Self::on_member_leave)),
        ]
    }
}
