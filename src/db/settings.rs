//! Guild settings repository backing the `guild_settings` table.

use super::{DbError, from_sql, to_sql};
use car::model::{ChannelId, GuildId};
use sqlx::SqlitePool;
use std::fmt;

/// Columns a `settings` update may touch.
pub const SETTING_COLUMNS: &[&str] = &[
    "prefix",
    "join_message_enabled",
    "join_message",
    "leave_message_enabled",
    "leave_message",
    "joinleave_channel",
];

/// One guild's settings row. Missing rows read as the defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildSettings {
    pub guild_id: GuildId,
    /// Guild-specific prefix; `None` falls back to the configured default.
    pub prefix: Option<String>,
    pub join_message_enabled: bool,
    pub join_message: String,
    pub leave_message_enabled: bool,
    pub leave_message: String,
    pub joinleave_channel: Option<ChannelId>,
    pub updated_at: i64,
}

impl GuildSettings {
    fn defaults(guild_id: GuildId) -> Self {
        Self {
            guild_id,
            prefix: None,
            join_message_enabled: false,
            join_message: String::new(),
            leave_message_enabled: false,
            leave_message: String::new(),
            joinleave_channel: None,
            updated_at: 0,
        }
    }
}

/// A new value for a single settings column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    Bool(bool),
    Text(String),
    Channel(ChannelId),
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Channel(c) => write!(f, "channel {c}"),
        }
    }
}

type SettingsRow = (i64, Option<String>, bool, String, bool, String, Option<i64>, i64);

/// Repository for per-guild settings.
pub struct SettingsRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SettingsRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Settings for a guild, or the defaults if it has no row yet.
    pub async fn get(&self, guild: GuildId) -> Result<GuildSettings, DbError> {
        let row = sqlx::query_as::<_, SettingsRow>(
            r#"
            SELECT guild_id, prefix, join_message_enabled, join_message,
                   leave_message_enabled, leave_message, joinleave_channel, updated_at
            FROM guild_settings
            WHERE guild_id = ?
            "#,
        )
        .bind(to_sql(guild.0))
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map_or_else(
            || GuildSettings::defaults(guild),
            |(
                guild_id,
                prefix,
                join_message_enabled,
                join_message,
                leave_message_enabled,
                leave_message,
                joinleave_channel,
                updated_at,
            )| GuildSettings {
                guild_id: GuildId(from_sql(guild_id)),
                prefix,
                join_message_enabled,
                join_message,
                leave_message_enabled,
                leave_message,
                joinleave_channel: joinleave_channel.map(|c| ChannelId(from_sql(c))),
                updated_at,
            },
        ))
    }

    /// Create the default row if the guild has none.
    pub async fn ensure(&self, guild: GuildId) -> Result<(), DbError> {
        sqlx::query("INSERT OR IGNORE INTO guild_settings (guild_id) VALUES (?)")
            .bind(to_sql(guild.0))
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Update a single column, creating the row first if needed.
    pub async fn update(
        &self,
        guild: GuildId,
        column: &str,
        value: SettingValue,
    ) -> Result<(), DbError> {
        let Some(column) = SETTING_COLUMNS.iter().find(|c| **c == column) else {
            return Err(DbError::UnknownSetting(column.to_string()));
        };
        let valid = match (*column, &value) {
            ("join_message_enabled" | "leave_message_enabled", SettingValue::Bool(_)) => true,
            ("prefix" | "join_message" | "leave_message", SettingValue::Text(_)) => true,
            ("joinleave_channel", SettingValue::Channel(_)) => true,
            _ => false,
        };
        if !valid {
            return Err(DbError::InvalidSetting {
                column: column.to_string(),
                value: value.to_string(),
            });
        }

        self.ensure(guild).await?;

        // `column` comes from SETTING_COLUMNS, never from user input.
        let sql = format!("UPDATE guild_settings SET {column} = ?, updated_at = ? WHERE guild_id = ?");
        let query = sqlx::query(&sql);
        let query = match value {
            SettingValue::Bool(b) => query.bind(b),
            SettingValue::Text(s) => query.bind(s),
            SettingValue::Channel(c) => query.bind(to_sql(c.0)),
        };
        query
            .bind(chrono::Utc::now().timestamp())
            .bind(to_sql(guild.0))
            .execute(self.pool)
            .await?;

        tracing::debug!(guild = %guild, column = %column, "Guild setting updated");
        Ok(())
    }
}
