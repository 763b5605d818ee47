//! Integration test common infrastructure.
//!
//! Provides a recording responder and builders for inbound events.

#![allow(dead_code)]

use async_trait::async_trait;
use car::model::{
    Channel, ChannelId, ChannelKind, EventId, Guild, GuildId, Member, Permissions, Reply, User,
    UserId,
};
use car::{
    CarError, InboundMessage, Interaction, InteractionData, InteractionOption, Outbox, Responder,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Which responder method delivered a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Via {
    Send,
    Respond,
    Edit,
}

/// Responder that records every reply in order.
#[derive(Default)]
pub struct RecordingResponder {
    replies: Mutex<Vec<(Via, Reply)>>,
    started: AtomicBool,
}

impl RecordingResponder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn replies(&self) -> Vec<(Via, Reply)> {
        self.replies.lock().clone()
    }

    /// Text of every reply: content, or the embed description.
    pub fn texts(&self) -> Vec<String> {
        self.replies
            .lock()
            .iter()
            .map(|(_, reply)| {
                reply
                    .content
                    .clone()
                    .or_else(|| reply.embed.as_ref().and_then(|e| e.description.clone()))
                    .unwrap_or_default()
            })
            .collect()
    }

    pub fn mark_started(&self) {
        self.started.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Responder for RecordingResponder {
    async fn send(&self, reply: Reply) -> Result<(), CarError> {
        self.replies.lock().push((Via::Send, reply));
        Ok(())
    }

    async fn respond(&self, reply: Reply) -> Result<(), CarError> {
        self.started.store(true, Ordering::SeqCst);
        self.replies.lock().push((Via::Respond, reply));
        Ok(())
    }

    async fn defer(&self) -> Result<(), CarError> {
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn edit_response(&self, reply: Reply) -> Result<(), CarError> {
        self.replies.lock().push((Via::Edit, reply));
        Ok(())
    }

    async fn delete_response(&self) -> Result<(), CarError> {
        Ok(())
    }

    fn response_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }
}

/// Outbox that records channel posts.
#[derive(Default)]
pub struct RecordingOutbox {
    pub posts: Mutex<Vec<(ChannelId, Reply)>>,
}

#[async_trait]
impl Outbox for RecordingOutbox {
    async fn send_to(&self, channel: ChannelId, reply: Reply) -> Result<(), CarError> {
        self.posts.lock().push((channel, reply));
        Ok(())
    }
}

pub fn user(id: u64, name: &str) -> User {
    User {
        id: UserId(id),
        name: name.into(),
        discriminator: format!("{:04}", id % 10_000),
        bot: false,
    }
}

pub fn text_channel(id: u64) -> Channel {
    Channel {
        id: ChannelId(id),
        name: "general".into(),
        kind: ChannelKind::Text,
    }
}

pub fn dm_channel() -> Channel {
    Channel {
        id: ChannelId(1),
        name: String::new(),
        kind: ChannelKind::Dm,
    }
}

/// Guild with the test author (id 100) and two other members.
pub fn guild() -> Arc<Guild> {
    Arc::new(Guild {
        id: GuildId(500),
        name: "Test Guild".into(),
        members: vec![
            Member {
                user: user(100, "tester"),
                nick: None,
            },
            Member {
                user: user(101, "bobby"),
                nick: Some("Bob".into()),
            },
            Member {
                user: user(102, "carol"),
                nick: None,
            },
        ],
        roles: Vec::new(),
        channels: vec![text_channel(2)],
        emotes: Vec::new(),
    })
}

pub fn dm_message(content: &str) -> InboundMessage {
    InboundMessage {
        id: EventId(1),
        content: content.into(),
        author: user(100, "tester"),
        channel: dm_channel(),
        guild: None,
        permissions: None,
    }
}

pub fn guild_message(content: &str, permissions: Permissions) -> InboundMessage {
    InboundMessage {
        id: EventId(2),
        content: content.into(),
        author: user(100, "tester"),
        channel: text_channel(2),
        guild: Some(guild()),
        permissions: Some(permissions),
    }
}

pub fn option(name: &str, kind: u64, value: Value) -> InteractionOption {
    InteractionOption {
        name: name.into(),
        kind,
        value: Some(value),
        options: None,
    }
}

pub fn frame(name: &str, kind: u64, options: Vec<InteractionOption>) -> InteractionOption {
    InteractionOption {
        name: name.into(),
        kind,
        value: None,
        options: Some(options),
    }
}

pub fn interaction(name: &str, options: Vec<InteractionOption>) -> Interaction {
    Interaction {
        id: EventId(3),
        user: user(100, "tester"),
        channel: dm_channel(),
        guild: None,
        permissions: None,
        data: InteractionData {
            kind: 1,
            name: name.into(),
            options,
        },
    }
}
