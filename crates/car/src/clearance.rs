//! Per-user clearance storage port.

use crate::enums::ClearanceLevel;
use crate::error::CarError;
use crate::model::UserId;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Narrow storage interface used by the clearance check and admin commands.
#[async_trait]
pub trait ClearanceStore: Send + Sync {
    /// Stored clearance, or `None` if the user has no row yet.
    async fn clearance(&self, user: UserId) -> Result<Option<i64>, CarError>;

    /// Insert a row at [`ClearanceLevel::DEFAULT`] if none exists.
    async fn insert_default(&self, user: UserId) -> Result<(), CarError>;

    async fn set_clearance(&self, user: UserId, level: i64) -> Result<(), CarError>;

    /// Read the clearance, lazily creating the default row.
    async fn ensure(&self, user: UserId) -> Result<i64, CarError> {
        if let Some(level) = self.clearance(user).await? {
            return Ok(level);
        }
        self.insert_default(user).await?;
        Ok(self.clearance(user).await?.unwrap_or(ClearanceLevel::DEFAULT))
    }
}

/// Process-local store, used by tests and storage-less deployments.
#[derive(Debug, Default)]
pub struct MemoryClearanceStore {
    levels: RwLock<HashMap<UserId, i64>>,
}

impl MemoryClearanceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClearanceStore for MemoryClearanceStore {
    async fn clearance(&self, user: UserId) -> Result<Option<i64>, CarError> {
        Ok(self.levels.read().get(&user).copied())
    }

    async fn insert_default(&self, user: UserId) -> Result<(), CarError> {
        self.levels
            .write()
            .entry(user)
            .or_insert(ClearanceLevel::DEFAULT);
        Ok(())
    }

    async fn set_clearance(&self, user: UserId, level: i64) -> Result<(), CarError> {
        self.levels.write().insert(user, level);
        Ok(())
    }
}
