//! Guild entity lookups: by id, by mention, then by fuzzy name.

use super::{Converter, Schema, raw_text};
use crate::context::Context;
use crate::enums::{ChannelType, OptionType};
use crate::error::CarError;
use crate::fuzzy::fuzzy_match_one;
use crate::model::{ChannelKind, Guild};
use crate::value::ArgValue;
use async_trait::async_trait;
use regex::Regex;
use serde_json::json;
use std::sync::{Arc, LazyLock};
use tracing::warn;

static USER_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<@!?(\d+)>$").expect("user mention pattern is valid"));
static ROLE_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<@&(\d+)>$").expect("role mention pattern is valid"));
static CHANNEL_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<#(\d+)>$").expect("channel mention pattern is valid"));
static EMOTE_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<a?:\w+:(\d+)>$").expect("emote mention pattern is valid"));

fn require_guild(ctx: &Context) -> Result<&Arc<Guild>, CarError> {
    ctx.guild.as_ref().ok_or_else(|| {
        warn!("guild entity argument used outside a guild; command should be guild-only");
        CarError::check("You must be in a server to use this command!")
    })
}

/// A bare id or the id inside a mention.
fn explicit_id(raw: &str, mention: &Regex) -> Option<u64> {
    if let Ok(id) = raw.parse::<u64>() {
        return Some(id);
    }
    mention
        .captures(raw)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn nothing_to_match(what: &str) -> CarError {
    CarError::argument(format!("There are no {what} in this server!"))
}

fn set_type(schema: &mut Schema, kind: OptionType) {
    schema.insert("type".into(), json!(kind as u8));
}

/// Split a trailing `#1234` discriminator off a member query.
fn split_discriminator(query: &str) -> (&str, Option<&str>) {
    let n = query.len();
    if n > 5 && query.is_char_boundary(n - 5) && query[n - 5..].starts_with('#') {
        let digits = &query[n - 4..];
        if digits.chars().all(|c| c.is_ascii_digit()) {
            return (&query[..n - 5], Some(digits));
        }
    }
    (query, None)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ToMember;

#[async_trait]
impl Converter for ToMember {
    async fn convert(&self, ctx: &Context, raw: ArgValue) -> Result<ArgValue, CarError> {
        let guild = require_guild(ctx)?;
        let query = raw_text(&raw);

        if let Some(id) = explicit_id(&query, &USER_MENTION)
            && let Some(m) = guild.members.iter().find(|m| m.user.id.0 == id)
        {
            return Ok(ArgValue::Member(m.clone()));
        }

        let (name, discrim) = split_discriminator(&query);
        let members: Vec<_> = guild
            .members
            .iter()
            .filter(|m| discrim.is_none_or(|d| m.user.discriminator == d))
            .collect();
        if members.is_empty() {
            return Err(nothing_to_match("matching members"));
        }

        let names: Vec<&str> = members.iter().map(|m| m.user.name.as_str()).collect();
        let nicked: Vec<_> = members.iter().copied().filter(|m| m.nick.is_some()).collect();
        let nicks: Vec<String> = nicked
            .iter()
            .filter_map(|m| m.nick.as_deref().map(str::to_lowercase))
            .collect();

        let by_name = fuzzy_match_one(name, &names);
        let by_nick = fuzzy_match_one(&name.to_lowercase(), &nicks);

        let member = match (by_name, by_nick) {
            (Some((d1, i1)), Some((d2, i2))) => {
                if d1 <= d2 {
                    members[i1]
                } else {
                    nicked[i2]
                }
            }
            (Some((_, i1)), None) => members[i1],
            (None, Some((_, i2))) => nicked[i2],
            (None, None) => return Err(nothing_to_match("matching members")),
        };
        Ok(ArgValue::Member(member.clone()))
    }

    fn describe(&self) -> String {
        "a member".into()
    }

    fn modify_schema(&self, schema: &mut Schema) {
        set_type(schema, OptionType::User);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ToRole;

#[async_trait]
impl Converter for ToRole {
    async fn convert(&self, ctx: &Context, raw: ArgValue) -> Result<ArgValue, CarError> {
        let guild = require_guild(ctx)?;
        let query = raw_text(&raw);

        if let Some(id) = explicit_id(&query, &ROLE_MENTION)
            && let Some(r) = guild.roles.iter().find(|r| r.id.0 == id)
        {
            return Ok(ArgValue::Role(r.clone()));
        }

        let names: Vec<&str> = guild.roles.iter().map(|r| r.name.as_str()).collect();
        let (_, idx) = fuzzy_match_one(&query, &names).ok_or_else(|| nothing_to_match("roles"))?;
        Ok(ArgValue::Role(guild.roles[idx].clone()))
    }

    fn describe(&self) -> String {
        "a role".into()
    }

    fn modify_schema(&self, schema: &mut Schema) {
        set_type(schema, OptionType::Role);
    }
}

async fn lookup_channel(ctx: &Context, raw: ArgValue, kind: ChannelKind) -> Result<ArgValue, CarError> {
    let guild = require_guild(ctx)?;
    let query = raw_text(&raw);
    let channels: Vec<_> = guild.channels_of(kind).collect();

    if let Some(id) = explicit_id(&query, &CHANNEL_MENTION)
        && let Some(c) = channels.iter().find(|c| c.id.0 == id)
    {
        return Ok(ArgValue::Channel((*c).clone()));
    }

    let names: Vec<&str> = channels.iter().map(|c| c.name.as_str()).collect();
    let (_, idx) = fuzzy_match_one(&query, &names).ok_or_else(|| nothing_to_match("channels"))?;
    Ok(ArgValue::Channel(channels[idx].clone()))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ToTextChannel;

#[async_trait]
impl Converter for ToTextChannel {
    async fn convert(&self, ctx: &Context, raw: ArgValue) -> Result<ArgValue, CarError> {
        lookup_channel(ctx, raw, ChannelKind::Text).await
    }

    fn describe(&self) -> String {
        "a text channel".into()
    }

    fn modify_schema(&self, schema: &mut Schema) {
        set_type(schema, OptionType::Channel);
        schema.insert("channel_types".into(), json!([ChannelType::GuildText as u8]));
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ToVoiceChannel;

#[async_trait]
impl Converter for ToVoiceChannel {
    async fn convert(&self, ctx: &Context, raw: ArgValue) -> Result<ArgValue, CarError> {
        lookup_channel(ctx, raw, ChannelKind::Voice).await
    }

    fn describe(&self) -> String {
        "a voice channel".into()
    }

    fn modify_schema(&self, schema: &mut Schema) {
        set_type(schema, OptionType::Channel);
        schema.insert("channel_types".into(), json!([ChannelType::GuildVoice as u8]));
    }
}

/// Custom emote by id, `<:name:id>`, exact name, then fuzzy name.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToEmote;

#[async_trait]
impl Converter for ToEmote {
    async fn convert(&self, ctx: &Context, raw: ArgValue) -> Result<ArgValue, CarError> {
        let guild = require_guild(ctx)?;
        let query = raw_text(&raw);

        if let Some(id) = explicit_id(&query, &EMOTE_MENTION)
            && let Some(e) = guild.emotes.iter().find(|e| e.id.0 == id)
        {
            return Ok(ArgValue::Emote(e.clone()));
        }
        if let Some(e) = guild.emotes.iter().find(|e| e.name == query) {
            return Ok(ArgValue::Emote(e.clone()));
        }

        let names: Vec<&str> = guild.emotes.iter().map(|e| e.name.as_str()).collect();
        let (_, idx) = fuzzy_match_one(&query, &names).ok_or_else(|| nothing_to_match("emotes"))?;
        Ok(ArgValue::Emote(guild.emotes[idx].clone()))
    }

    fn describe(&self) -> String {
        "an emote".into()
    }

    fn modify_schema(&self, schema: &mut Schema) {
        set_type(schema, OptionType::String);
    }
}
