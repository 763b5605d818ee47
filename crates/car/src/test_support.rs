//! Fixtures shared by the unit tests.

use crate::clearance::MemoryClearanceStore;
use crate::context::{Context, Responder, Surface};
use crate::error::CarError;
use crate::model::{Channel, ChannelId, ChannelKind, Guild, Permissions, Reply, User, UserId};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

/// Responder that keeps every reply in memory.
#[derive(Default)]
pub struct NullResponder {
    pub sent: Mutex<Vec<Reply>>,
}

#[async_trait]
impl Responder for NullResponder {
    async fn send(&self, reply: Reply) -> Result<(), CarError> {
        self.sent.lock().push(reply);
        Ok(())
    }

    async fn respond(&self, reply: Reply) -> Result<(), CarError> {
        self.sent.lock().push(reply);
        Ok(())
    }

    async fn defer(&self) -> Result<(), CarError> {
        Ok(())
    }

    async fn edit_response(&self, _reply: Reply) -> Result<(), CarError> {
        Ok(())
    }

    async fn delete_response(&self) -> Result<(), CarError> {
        Ok(())
    }
}

pub fn author() -> User {
    User {
        id: UserId(100),
        name: "tester".into(),
        discriminator: "0100".into(),
        bot: false,
    }
}

pub fn dm_context() -> Context {
    Context::new(
        Surface::Text,
        ".",
        Channel {
            id: ChannelId(1),
            name: String::new(),
            kind: ChannelKind::Dm,
        },
        None,
        author(),
        None,
        Arc::new(MemoryClearanceStore::new()),
        Arc::new(NullResponder::default()),
    )
}

pub fn guild_context(guild: Guild) -> Context {
    guild_context_with(guild, Permissions::default())
}

pub fn guild_context_with(guild: Guild, permissions: Permissions) -> Context {
    Context::new(
        Surface::Text,
        ".",
        Channel {
            id: ChannelId(2),
            name: "general".into(),
            kind: ChannelKind::Text,
        },
        Some(Arc::new(guild)),
        author(),
        Some(permissions),
        Arc::new(MemoryClearanceStore::new()),
        Arc::new(NullResponder::default()),
    )
}

pub fn detached_handle() -> crate::bot::BotHandle {
    crate::bot::BotHandle::detached(Arc::new(MemoryClearanceStore::new()))
}
