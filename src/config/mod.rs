//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Config struct definitions (Config, BotConfig, DatabaseConfig, CogsConfig)
//! - [`validation`]: Startup validation collecting every problem at once

mod types;
mod validation;

pub use types::Config;
pub use validation::validate;
