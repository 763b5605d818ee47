//! Inbound shapes consumed from the gateway collaborator.

use crate::model::{Channel, EventId, Guild, Member, Permissions, User};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// A chat message that may carry a text command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: EventId,
    pub content: String,
    pub author: User,
    pub channel: Channel,
    #[serde(default)]
    pub guild: Option<Arc<Guild>>,
    /// Invoker's capabilities in `channel`; absent in DMs.
    #[serde(default)]
    pub permissions: Option<Permissions>,
}

/// A structured command invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub id: EventId,
    pub user: User,
    pub channel: Channel,
    #[serde(default)]
    pub guild: Option<Arc<Guild>>,
    #[serde(default)]
    pub permissions: Option<Permissions>,
    pub data: InteractionData,
}

/// Root node of a structured invocation payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionData {
    #[serde(rename = "type")]
    pub kind: u64,
    pub name: String,
    #[serde(default)]
    pub options: Vec<InteractionOption>,
}

/// One option node; either a subcommand frame or an argument value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionOption {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: u64,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub options: Option<Vec<InteractionOption>>,
}

/// Payload of a non-command platform event fanned out to listeners.
#[derive(Debug, Clone)]
pub enum EventPayload {
    Message(InboundMessage),
    MemberJoin { guild: Arc<Guild>, member: Member },
    MemberLeave { guild: Arc<Guild>, member: Member },
    Raw(Value),
}
