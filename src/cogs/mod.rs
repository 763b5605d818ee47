//! Built-in cogs shipped with the daemon.
//!
//! Each cog is registered as a [`CogClass`] whose factory captures the shared
//! daemon state it needs (database, prefix cache), so `reload` builds a fresh
//! instance against the same state.

mod admin;
mod guild;
mod meta;
mod utility;

pub use admin::{Admin, write_export};
pub use guild::GuildCog;
pub use meta::Meta;
pub use utility::Utility;

use crate::db::Database;
use crate::prefix::GuildPrefixes;
use car::listener::EventHandler;
use car::{Args, Bot, CarError, CogClass, CommandResult, Context, Event, Handler};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

/// Names of the cog classes [`register`] adds, in default load order.
pub const BUILTIN: &[&str] = &["Meta", "Admin", "Guild", "Utility"];

/// Shared state handed to cog factories.
#[derive(Clone)]
pub struct Services {
    pub db: Database,
    pub prefixes: Arc<GuildPrefixes>,
    /// Where `export` writes the registration JSON, if configured.
    pub export_path: Option<PathBuf>,
}

/// Register every built-in cog class. Nothing is loaded yet.
pub fn register(bot: &Bot, services: Services) -> Result<(), CarError> {
    bot.add_cog_class(CogClass::new("Meta", Meta::new))?;

    let export_path = services.export_path.clone();
    bot.add_cog_class(CogClass::new("Admin", move |handle| {
        Admin::new(handle.clone(), export_path.clone())
    }))?;

    let (db, prefixes) = (services.db.clone(), services.prefixes.clone());
    bot.add_cog_class(CogClass::new("Guild", move |_| {
        GuildCog::new(db.clone(), prefixes.clone())
    }))?;

    bot.add_cog_class(CogClass::new("Utility", |_| Utility))?;
    Ok(())
}

/// Bind a cog method as a command handler.
pub(crate) fn command<C, F, Fut>(cog: &Arc<C>, method: F) -> impl Handler + 'static
where
    C: Send + Sync + 'static,
    F: Fn(Arc<C>, Arc<Context>, Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CommandResult> + Send + 'static,
{
    let cog = cog.clone();
    move |ctx: Arc<Context>, args: Args| method(cog.clone(), ctx, args)
}

/// Bind a cog method as a listener.
pub(crate) fn listener<C, F, Fut>(cog: &Arc<C>, method: F) -> impl EventHandler + 'static
where
    C: Send + Sync + 'static,
    F: Fn(Arc<C>, Arc<Event>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CommandResult> + Send + 'static,
{
    let cog = cog.clone();
    move |event: Arc<Event>| method(cog.clone(), event)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fixtures shared by the cog tests.

    use async_trait::async_trait;
    use car::model::{
        Channel, ChannelId, ChannelKind, EventId, Guild, Member, Permissions, Reply, User, UserId,
    };
    use car::{
        CarError, InboundMessage, Interaction, InteractionData, InteractionOption, Outbox,
        Responder,
    };
    use serde_json::Value;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Records every reply, regardless of how it was sent.
    #[derive(Default)]
    pub struct Recorder {
        pub replies: Mutex<Vec<Reply>>,
        started: AtomicBool,
    }

    impl Recorder {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Content, or the embed description when there is no content.
        pub fn texts(&self) -> Vec<String> {
            self.replies
                .lock()
                .iter()
                .map(|r| {
                    r.content
                        .clone()
                        .or_else(|| r.embed.as_ref().and_then(|e| e.description.clone()))
                        .unwrap_or_default()
                })
                .collect()
        }

        pub fn last(&self) -> Reply {
            self.replies.lock().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl Responder for Recorder {
        async fn send(&self, reply: Reply) -> Result<(), CarError> {
            self.replies.lock().push(reply);
            Ok(())
        }

        async fn respond(&self, reply: Reply) -> Result<(), CarError> {
            self.started.store(true, Ordering::Release);
            self.replies.lock().push(reply);
            Ok(())
        }

        async fn defer(&self) -> Result<(), CarError> {
            self.started.store(true, Ordering::Release);
            Ok(())
        }

        async fn edit_response(&self, reply: Reply) -> Result<(), CarError> {
            self.replies.lock().push(reply);
            Ok(())
        }

        async fn delete_response(&self) -> Result<(), CarError> {
            Ok(())
        }

        fn response_started(&self) -> bool {
            self.started.load(Ordering::Acquire)
        }
    }

    #[derive(Default)]
    pub struct Posts(pub Mutex<Vec<(ChannelId, Reply)>>);

    #[async_trait]
    impl Outbox for Posts {
        async fn send_to(&self, channel: ChannelId, reply: Reply) -> Result<(), CarError> {
            self.0.lock().push((channel, reply));
            Ok(())
        }
    }

    pub fn user(id: u64, name: &str) -> User {
        User {
            id: UserId(id),
            name: name.to_string(),
            discriminator: "0001".to_string(),
            bot: false,
        }
    }

    pub fn guild() -> Arc<Guild> {
        Arc::new(Guild {
            id: car::model::GuildId(500),
            name: "Test Server".to_string(),
            members: vec![
                Member {
                    user: user(100, "tester"),
                    nick: None,
                },
                Member {
                    user: user(101, "bobby"),
                    nick: Some("Bob".to_string()),
                },
            ],
            roles: Vec::new(),
            channels: vec![Channel {
                id: ChannelId(9),
                name: "welcome".to_string(),
                kind: ChannelKind::Text,
            }],
            emotes: Vec::new(),
        })
    }

    pub fn dm(content: &str) -> InboundMessage {
        InboundMessage {
            id: EventId(1),
            content: content.to_string(),
            author: user(100, "tester"),
            channel: Channel {
                id: ChannelId(1),
                name: String::new(),
                kind: ChannelKind::Dm,
            },
            guild: None,
            permissions: None,
        }
    }

    pub fn in_guild(content: &str, permissions: &[&str]) -> InboundMessage {
        InboundMessage {
            guild: Some(guild()),
            channel: Channel {
                id: ChannelId(8),
                name: "general".to_string(),
                kind: ChannelKind::Text,
            },
            permissions: Some(Permissions::new(permissions.iter().copied())),
            ..dm(content)
        }
    }

    pub fn option(name: &str, kind: u64, value: Value) -> InteractionOption {
        InteractionOption {
            name: name.to_string(),
            kind,
            value: Some(value),
            options: None,
        }
    }

    pub fn subcommand(name: &str, options: Vec<InteractionOption>) -> InteractionOption {
        InteractionOption {
            name: name.to_string(),
            kind: 1,
            value: None,
            options: Some(options),
        }
    }

    /// A chat-input invocation from user 100 in a DM.
    pub fn interaction(name: &str, options: Vec<InteractionOption>) -> Interaction {
        let msg = dm("");
        Interaction {
            id: EventId(2),
            user: msg.author,
            channel: msg.channel,
            guild: None,
            permissions: None,
            data: InteractionData {
                kind: 1,
                name: name.to_string(),
                options,
            },
        }
    }
}
