//! Bot front-end: owns the registry and turns inbound events into tasks.

use crate::clearance::{ClearanceStore, MemoryClearanceStore};
use crate::cog::CogClass;
use crate::command::Command;
use crate::context::{Context, Responder, Surface};
use crate::dispatch::{self, Outcome};
use crate::enums::CommandType;
use crate::error::CarError;
use crate::event::{EventPayload, InboundMessage, Interaction};
use crate::listener::{Event, Outbox};
use crate::model::{ChannelKind, GuildId};
use crate::registry::Registry;
use crate::telemetry::spans;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{Instrument, error, warn};

/// Prefix used when nothing more specific is configured.
pub const DEFAULT_PREFIX: &str = ".";

/// Resolves the text-command prefix for a guild (`None` for DMs).
#[async_trait]
pub trait PrefixSource: Send + Sync {
    async fn prefix(&self, guild: Option<GuildId>) -> String;
}

/// The same prefix everywhere.
#[derive(Debug, Clone)]
pub struct StaticPrefix(pub String);

impl Default for StaticPrefix {
    fn default() -> Self {
        Self(DEFAULT_PREFIX.to_string())
    }
}

#[async_trait]
impl PrefixSource for StaticPrefix {
    async fn prefix(&self, _guild: Option<GuildId>) -> String {
        self.0.clone()
    }
}

/// The framework entry point. Clones share the registry and stores.
#[derive(Clone)]
pub struct Bot {
    registry: Arc<RwLock<Registry>>,
    clearance: Arc<dyn ClearanceStore>,
    prefixes: Arc<dyn PrefixSource>,
    started: Instant,
}

impl Bot {
    pub fn new(clearance: Arc<dyn ClearanceStore>, prefixes: Arc<dyn PrefixSource>) -> Self {
        Self {
            registry: Arc::new(RwLock::new(Registry::new())),
            clearance,
            prefixes,
            started: Instant::now(),
        }
    }

    /// In-memory clearance and the default prefix.
    pub fn with_defaults() -> Self {
        Self::new(
            Arc::new(MemoryClearanceStore::new()),
            Arc::new(StaticPrefix::default()),
        )
    }

    /// Handle given to cogs; does not keep the registry alive.
    pub fn handle(&self) -> BotHandle {
        BotHandle {
            registry: Arc::downgrade(&self.registry),
            clearance: self.clearance.clone(),
            started: self.started,
        }
    }

    pub fn registry(&self) -> &Arc<RwLock<Registry>> {
        &self.registry
    }

    pub fn clearance(&self) -> &Arc<dyn ClearanceStore> {
        &self.clearance
    }

    pub fn add_cog_class(&self, class: CogClass) -> Result<(), CarError> {
        self.registry.write().add_cog_class(class)
    }

    pub fn load(&self, name: &str) -> Result<(), CarError> {
        self.handle().load(name)
    }

    pub fn unload(&self, name: &str) -> Result<(), CarError> {
        self.registry.write().unload(name)
    }

    pub fn reload(&self, name: &str) -> Result<(), CarError> {
        self.handle().reload(name)
    }

    pub fn export(&self) -> Vec<Value> {
        self.registry.read().export()
    }

    /// Route a chat message to a text command.
    ///
    /// Returns `None` when the message is not an invocation: bot authors,
    /// voice channels, a missing prefix or an unknown command name.
    pub async fn process_message(
        &self,
        msg: InboundMessage,
        responder: Arc<dyn Responder>,
    ) -> Option<JoinHandle<Outcome>> {
        if msg.author.bot || msg.channel.kind == ChannelKind::Voice {
            return None;
        }

        let prefix = self.prefixes.prefix(msg.guild.as_ref().map(|g| g.id)).await;
        let body = msg.content.strip_prefix(prefix.as_str())?;
        if body.is_empty() {
            return None;
        }
        let (name, input) = body.split_once(' ').unwrap_or((body, ""));

        let cmd = {
            let registry = self.registry.read();
            let cmd = registry.text_command(name)?;
            registry.record_use(&Command::Text(cmd.clone()));
            cmd
        };
        let input = input.to_string();

        let ctx = Arc::new(Context::new(
            Surface::Text,
            prefix,
            msg.channel,
            msg.guild,
            msg.author,
            msg.permissions,
            self.clearance.clone(),
            responder,
        ));
        Some(tokio::spawn(dispatch::run_text(cmd, ctx, input)))
    }

    /// Route a structured interaction. Only chat-input interactions are
    /// handled; an unknown path resolves to [`Outcome::Dropped`].
    pub fn process_interaction(
        &self,
        interaction: Interaction,
        responder: Arc<dyn Responder>,
    ) -> Option<JoinHandle<Outcome>> {
        if interaction.data.kind != CommandType::ChatInput as u64 {
            return None;
        }

        let (path, options) = dispatch::resolve_path(&interaction.data);
        let registry = self.registry.clone();
        let ctx = Arc::new(Context::new(
            Surface::Structured,
            "/",
            interaction.channel,
            interaction.guild,
            interaction.user,
            interaction.permissions,
            self.clearance.clone(),
            responder,
        ));

        Some(tokio::spawn(async move {
            let cmd = {
                let registry = registry.read();
                let cmd = registry.structured_command(&path);
                if let Some(cmd) = &cmd {
                    registry.record_use(&Command::Structured(cmd.clone()));
                }
                cmd
            };
            let Some(cmd) = cmd else {
                warn!(path = %path, "Structured command not recognized (stale command list?)");
                return Outcome::Dropped;
            };
            dispatch::run_structured(cmd, ctx, options).await
        }))
    }

    /// Fan an event out to every listener registered for it, one task each.
    pub fn dispatch_event(
        &self,
        name: &str,
        payload: EventPayload,
        outbox: Arc<dyn Outbox>,
    ) -> Vec<JoinHandle<()>> {
        let listeners = self.registry.read().listeners_for(name);
        if listeners.is_empty() {
            return Vec::new();
        }

        let event = Arc::new(Event {
            name: name.to_string(),
            payload,
            outbox,
        });

        listeners
            .into_iter()
            .map(|listener| {
                let event = event.clone();
                let span = spans::listener(listener.event(), listener.cog().unwrap_or_default());
                tokio::spawn(
                    async move {
                        if let Err(err) = listener.run(event).await {
                            error!(code = err.error_code(), error = ?err, "listener failed");
                        }
                    }
                    .instrument(span),
                )
            })
            .collect()
    }
}

/// Weak handle to a [`Bot`], given to cogs at construction.
#[derive(Clone)]
pub struct BotHandle {
    registry: Weak<RwLock<Registry>>,
    clearance: Arc<dyn ClearanceStore>,
    started: Instant,
}

impl BotHandle {
    /// Handle attached to no bot; registry operations fail.
    pub fn detached(clearance: Arc<dyn ClearanceStore>) -> Self {
        Self {
            registry: Weak::new(),
            clearance,
            started: Instant::now(),
        }
    }

    fn registry(&self) -> Result<Arc<RwLock<Registry>>, CarError> {
        self.registry
            .upgrade()
            .ok_or_else(|| CarError::Context("the bot has shut down".into()))
    }

    /// Run `f` under the registry read lock.
    pub fn with_registry<R>(&self, f: impl FnOnce(&Registry) -> R) -> Result<R, CarError> {
        let registry = self.registry()?;
        let guard = registry.read();
        Ok(f(&guard))
    }

    pub fn load(&self, name: &str) -> Result<(), CarError> {
        self.registry()?.write().load(name, self)
    }

    pub fn unload(&self, name: &str) -> Result<(), CarError> {
        self.registry()?.write().unload(name)
    }

    pub fn reload(&self, name: &str) -> Result<(), CarError> {
        self.registry()?.write().reload(name, self)
    }

    pub fn export(&self) -> Result<Vec<Value>, CarError> {
        self.with_registry(Registry::export)
    }

    pub fn clearance(&self) -> &Arc<dyn ClearanceStore> {
        &self.clearance
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }
}

impl std::fmt::Debug for BotHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotHandle")
            .field("attached", &(self.registry.strong_count() > 0))
            .finish()
    }
}
