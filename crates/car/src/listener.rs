//! Cog-owned handlers for non-command platform events.

use crate::error::{CarError, CommandResult};
use crate::event::EventPayload;
use crate::model::{ChannelId, Reply};
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Outbound channel messages for code that is not answering an invocation.
#[async_trait]
pub trait Outbox: Send + Sync {
    async fn send_to(&self, channel: ChannelId, reply: Reply) -> Result<(), CarError>;
}

/// A platform event fanned out to listeners.
#[derive(Clone)]
pub struct Event {
    pub name: String,
    pub payload: EventPayload,
    pub outbox: Arc<dyn Outbox>,
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("payload", &self.payload)
            .finish()
    }
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn on_event(&self, event: Arc<Event>) -> CommandResult;
}

#[async_trait]
impl<F, Fut> EventHandler for F
where
    F: Fn(Arc<Event>) -> Fut + Send + Sync,
    Fut: Future<Output = CommandResult> + Send + 'static,
{
    async fn on_event(&self, event: Arc<Event>) -> CommandResult {
        (self)(event).await
    }
}

/// Handler bound to an event name.
pub struct Listener {
    event: String,
    handler: Arc<dyn EventHandler>,
    cog: Option<String>,
}

impl Listener {
    pub fn new(event: impl Into<String>, handler: impl EventHandler + 'static) -> Self {
        Self {
            event: event.into(),
            handler: Arc::new(handler),
            cog: None,
        }
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn cog(&self) -> Option<&str> {
        self.cog.as_deref()
    }

    pub(crate) fn attach(&mut self, cog: &str) {
        self.cog = Some(cog.to_string());
    }

    pub async fn run(&self, event: Arc<Event>) -> CommandResult {
        if self.cog.is_none() {
            return Err(CarError::configuration(format!(
                "listener for `{}` was not initialized properly",
                self.event
            )));
        }
        self.handler.on_event(event).await
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("event", &self.event)
            .field("cog", &self.cog)
            .finish()
    }
}
