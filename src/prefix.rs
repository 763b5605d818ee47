//! Per-guild text command prefixes, cached in front of the settings table.

use crate::db::Database;
use async_trait::async_trait;
use car::PrefixSource;
use car::model::GuildId;
use dashmap::DashMap;
use tracing::warn;

/// Resolves prefixes from `guild_settings`, falling back to the default.
pub struct GuildPrefixes {
    db: Database,
    default: String,
    cache: DashMap<GuildId, String>,
}

impl GuildPrefixes {
    pub fn new(db: Database, default: impl Into<String>) -> Self {
        Self {
            db,
            default: default.into(),
            cache: DashMap::new(),
        }
    }

    pub fn default_prefix(&self) -> &str {
        &self.default
    }

    /// Forget the cached prefix after the guild's settings change.
    pub fn invalidate(&self, guild: GuildId) {
        self.cache.remove(&guild);
    }
}

#[async_trait]
impl PrefixSource for GuildPrefixes {
    async fn prefix(&self, guild: Option<GuildId>) -> String {
        let Some(guild) = guild else {
            return self.default.clone();
        };
        if let Some(prefix) = self.cache.get(&guild) {
            return prefix.clone();
        }

        let prefix = match self.db.settings().get(guild).await {
            Ok(settings) => settings
                .prefix
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| self.default.clone()),
            Err(e) => {
                // Not cached, so the next message retries the lookup.
                warn!(guild = %guild, error = %e, "Failed to load guild prefix");
                return self.default.clone();
            }
        };
        self.cache.insert(guild, prefix.clone());
        prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SettingValue;

    #[tokio::test]
    async fn test_prefix_falls_back_and_caches() {
        let db = Database::new(":memory:").await.unwrap();
        let prefixes = GuildPrefixes::new(db.clone(), ".");

        assert_eq!(prefixes.prefix(None).await, ".");
        assert_eq!(prefixes.prefix(Some(GuildId(500))).await, ".");

        db.settings()
            .update(GuildId(500), "prefix", SettingValue::Text("!".into()))
            .await
            .unwrap();
        // Still cached.
        assert_eq!(prefixes.prefix(Some(GuildId(500))).await, ".");

        prefixes.invalidate(GuildId(500));
        assert_eq!(prefixes.prefix(Some(GuildId(500))).await, "!");
        assert_eq!(prefixes.prefix(None).await, ".");
    }
}
