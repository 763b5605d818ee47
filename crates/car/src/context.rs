//! Invocation context passed to checks, converters and handlers.
//!
//! A `Context` is built once per inbound invocation by the bot front-end.
//! All platform I/O goes through the [`Responder`] port so the core never
//! talks to a gateway directly.

use crate::clearance::ClearanceStore;
use crate::error::CarError;
use crate::model::{Attachment, Channel, Guild, Member, Permissions, Reply, User};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Which wire surface an invocation arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Text,
    Structured,
}

impl Surface {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Structured => "structured",
        }
    }
}

/// Outbound I/O for one invocation, implemented by the gateway.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Post a fresh message in the invocation channel.
    async fn send(&self, reply: Reply) -> Result<(), CarError>;

    /// Answer the invocation itself (message reply or interaction response).
    async fn respond(&self, reply: Reply) -> Result<(), CarError>;

    /// Acknowledge a slow invocation (typing indicator or deferred response).
    async fn defer(&self) -> Result<(), CarError>;

    async fn edit_response(&self, reply: Reply) -> Result<(), CarError>;

    async fn delete_response(&self) -> Result<(), CarError>;

    /// Most recent attachment in the channel or the referenced message.
    async fn latest_attachment(&self) -> Result<Option<Attachment>, CarError> {
        Ok(None)
    }

    /// Whether the structured response has already been used.
    fn response_started(&self) -> bool {
        false
    }
}

/// Context of a single invocation.
pub struct Context {
    pub surface: Surface,
    /// Prefix used to invoke the command (`/` on the structured surface).
    pub prefix: String,
    pub channel: Channel,
    pub guild: Option<Arc<Guild>>,
    pub author: User,
    /// Invoker's capabilities in `channel`; `None` outside guild channels.
    pub permissions: Option<Permissions>,
    pub clearance: Arc<dyn ClearanceStore>,
    responder: Arc<dyn Responder>,
}

impl Context {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        surface: Surface,
        prefix: impl Into<String>,
        channel: Channel,
        guild: Option<Arc<Guild>>,
        author: User,
        permissions: Option<Permissions>,
        clearance: Arc<dyn ClearanceStore>,
        responder: Arc<dyn Responder>,
    ) -> Self {
        Self {
            surface,
            prefix: prefix.into(),
            channel,
            guild,
            author,
            permissions,
            clearance,
            responder,
        }
    }

    pub fn is_direct_message(&self) -> bool {
        self.guild.is_none()
    }

    /// The guild, or a context error for commands that forgot `guild_only`.
    pub fn guild(&self) -> Result<&Arc<Guild>, CarError> {
        self.guild
            .as_ref()
            .ok_or_else(|| CarError::Context("This command should be set to guild-only!".into()))
    }

    /// The invoker as a guild member.
    pub fn member(&self) -> Result<&Member, CarError> {
        let guild = self.guild()?;
        guild
            .member(self.author.id)
            .ok_or_else(|| CarError::Context(format!("{} is not a member of {}", self.author.id, guild.id)))
    }

    pub fn responder(&self) -> &Arc<dyn Responder> {
        &self.responder
    }

    pub async fn send(&self, reply: impl Into<Reply>) -> Result<(), CarError> {
        self.responder.send(reply.into()).await
    }

    pub async fn respond(&self, reply: impl Into<Reply>) -> Result<(), CarError> {
        self.responder.respond(reply.into()).await
    }

    pub async fn defer(&self) -> Result<(), CarError> {
        self.responder.defer().await
    }

    pub async fn edit_response(&self, reply: impl Into<Reply>) -> Result<(), CarError> {
        self.responder.edit_response(reply.into()).await
    }

    pub async fn delete_response(&self) -> Result<(), CarError> {
        self.responder.delete_response().await
    }

    pub async fn latest_attachment(&self) -> Result<Option<Attachment>, CarError> {
        self.responder.latest_attachment().await
    }

    /// Errors go through `respond` unless a structured response was already
    /// sent, in which case a plain channel message is the only option.
    pub(crate) fn should_respond(&self) -> bool {
        match self.surface {
            Surface::Text => true,
            Surface::Structured => !self.responder.response_started(),
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("surface", &self.surface)
            .field("prefix", &self.prefix)
            .field("channel", &self.channel.id)
            .field("guild", &self.guild.as_ref().map(|g| g.id))
            .field("author", &self.author.id)
            .finish()
    }
}
