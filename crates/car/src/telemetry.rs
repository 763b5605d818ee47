//! Telemetry utilities for command timing and invocation correlation.

use std::time::Instant;

/// Guard for timing command execution.
///
/// Logs command latency when dropped.
pub struct CommandTimer {
    command: String,
    surface: &'static str,
    start: Instant,
}

impl CommandTimer {
    /// Start timing a command.
    pub fn new(command: impl Into<String>, surface: &'static str) -> Self {
        Self {
            command: command.into(),
            surface,
            start: Instant::now(),
        }
    }
}

impl Drop for CommandTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        tracing::debug!(
            command = %self.command,
            surface = self.surface,
            duration_ms = duration * 1000.0,
            "command finished"
        );
    }
}

/// Standardized span constructors.
pub mod spans {
    use tracing::{Span, info_span};

    /// Create a span for one command invocation.
    pub fn invocation(command: &str, surface: &str, user: u64, guild: Option<u64>) -> Span {
        if let Some(guild) = guild {
            info_span!("command", name = %command, surface = %surface, user = user, guild = guild)
        } else {
            info_span!("command", name = %command, surface = %surface, user = user)
        }
    }

    /// Create a span for a listener run.
    pub fn listener(event: &str, cog: &str) -> Span {
        info_span!("listener", event = %event, cog = %cog)
    }
}
