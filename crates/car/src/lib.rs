//! # car
//!
//! Command framework core for carbot.
//!
//! One command declaration is exposed on two surfaces: structured
//! (slash-style, schema-validated) invocations and prefix text messages.
//! Both go through the same pipeline of checks, argument conversion,
//! concurrency accounting and error rendering.
//!
//! ## Features
//!
//! - Quote- and escape-aware tokenizer with `-flag value` extraction
//! - Composable argument converters (numbers, durations, URLs, choices,
//!   ranges, fuzzy entity lookups)
//! - Permission, guild and clearance checks
//! - Cogs that load, unload and reload at runtime, all-or-nothing
//! - Structured command schema export with nested subcommands
//!
//! ## Quick Start
//!
//! ```ignore
//! use car::{Bot, Cog, CogClass, CommandBuilder, Declaration, CarError};
//! use std::sync::Arc;
//!
//! struct Meta;
//!
//! impl Cog for Meta {
//!     fn commands(self: Arc<Self>) -> Result<Vec<Declaration>, CarError> {
//!         Ok(vec![CommandBuilder::new("ping")
//!             .description("Pong!")
//!             .handler(|ctx: Arc<car::Context>, _args: car::Args| async move {
//!                 ctx.respond("Pong!").await
//!             })
//!             .build_mixed()?])
//!     }
//! }
//!
//! let bot = Bot::with_defaults();
//! bot.add_cog_class(CogClass::new("Meta", |_| Meta))?;
//! bot.load("Meta")?;
//! ```

pub mod argument;
pub mod bot;
pub mod check;
pub mod clearance;
pub mod cog;
pub mod command;
pub mod context;
pub mod converter;
pub mod dispatch;
pub mod enums;
pub mod error;
pub mod event;
pub mod fuzzy;
pub mod listener;
pub mod model;
pub mod registry;
pub mod telemetry;
pub mod tokenizer;
pub mod value;

#[cfg(test)]
mod test_support;

pub use argument::{ArgType, Argument};
pub use bot::{Bot, BotHandle, PrefixSource, StaticPrefix};
pub use check::{Check, GuildOnly, RequiresClearance, RequiresPermissions, SpecificGuildOnly};
pub use clearance::{ClearanceStore, MemoryClearanceStore};
pub use cog::{Cog, CogClass};
pub use command::{Command, CommandBuilder, Declaration, Handler, StructuredCommand, TextCommand};
pub use context::{Context, Responder, Surface};
pub use dispatch::{Outcome, Stage};
pub use enums::ClearanceLevel;
pub use error::{CarError, CommandResult};
pub use event::{EventPayload, InboundMessage, Interaction, InteractionData, InteractionOption};
pub use listener::{Event, Listener, Outbox};
pub use registry::Registry;
pub use tokenizer::{Tokenizer, filter_kwargs};
pub use value::{ArgValue, Args};
