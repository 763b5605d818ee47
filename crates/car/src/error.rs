//! Unified error handling for the command framework.
//!
//! Every stage of an invocation (checks, argument resolution, the handler
//! itself) fails with a [`CarError`]. The dispatcher catches it exactly once
//! and maps the kind to a user-facing reply or a server-side log entry.

use thiserror::Error;

/// Errors raised while declaring, loading or running commands.
#[derive(Debug, Error)]
pub enum CarError {
    /// Malformed declaration or registry collision. Fatal for the load
    /// operation, never shown to end users.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A precondition or authorization check failed.
    #[error("{0}")]
    Check(String),

    /// An argument was missing or failed conversion.
    #[error("{message}")]
    Argument {
        message: String,
        /// Name of the offending argument, highlighted in the usage outline.
        highlight: Option<String>,
    },

    /// Domain-specific failure raised by a command handler.
    #[error("{0}")]
    Command(String),

    /// The invocation context cannot serve the request (e.g. a permission
    /// check on a DM channel).
    #[error("context error: {0}")]
    Context(String),

    /// The platform collaborator failed to deliver a response.
    #[error("platform error: {0}")]
    Platform(String),

    /// The storage collaborator failed.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl CarError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn check(msg: impl Into<String>) -> Self {
        Self::Check(msg.into())
    }

    /// Argument failure without a highlighted argument yet. The dispatcher
    /// fills in the highlight when it knows which argument was being parsed.
    pub fn argument(msg: impl Into<String>) -> Self {
        Self::Argument {
            message: msg.into(),
            highlight: None,
        }
    }

    pub fn missing_argument(name: &str) -> Self {
        Self::Argument {
            message: "I am missing this argument!".to_string(),
            highlight: Some(name.to_string()),
        }
    }

    pub fn command(msg: impl Into<String>) -> Self {
        Self::Command(msg.into())
    }

    /// Attach the argument name to an argument error that has none.
    pub fn highlighted(self, name: &str) -> Self {
        match self {
            Self::Argument {
                message,
                highlight: None,
            } => Self::Argument {
                message,
                highlight: Some(name.to_string()),
            },
            other => other,
        }
    }

    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Check(_) => "check_failed",
            Self::Argument { .. } => "bad_argument",
            Self::Command(_) => "command_error",
            Self::Context(_) => "context_error",
            Self::Platform(_) => "platform_error",
            Self::Storage(_) => "storage_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Whether the message of this error is meant for the invoking user.
    ///
    /// Everything else is logged and replaced with a generic reply.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::Check(_) | Self::Argument { .. } | Self::Command(_)
        )
    }
}

/// Result type for command handlers and listeners.
pub type CommandResult = Result<(), CarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(CarError::check("no").error_code(), "check_failed");
        assert_eq!(CarError::argument("bad").error_code(), "bad_argument");
        assert_eq!(
            CarError::Internal(anyhow::anyhow!("boom")).error_code(),
            "internal_error"
        );
    }

    #[test]
    fn test_highlight_only_fills_missing() {
        let err = CarError::argument("bad").highlighted("count");
        assert!(matches!(
            err,
            CarError::Argument { highlight: Some(ref h), .. } if h == "count"
        ));

        let err = CarError::missing_argument("first").highlighted("second");
        assert!(matches!(
            err,
            CarError::Argument { highlight: Some(ref h), .. } if h == "first"
        ));

        let err = CarError::command("nope").highlighted("x");
        assert!(matches!(err, CarError::Command(_)));
    }

    #[test]
    fn test_user_facing_kinds() {
        assert!(CarError::command("x").is_user_facing());
        assert!(!CarError::configuration("x").is_user_facing());
        assert!(!CarError::Context("x".into()).is_user_facing());
    }
}
