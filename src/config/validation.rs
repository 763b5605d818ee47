//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("bot.name is required")]
    MissingBotName,
    #[error("bot.default_prefix must not be empty")]
    EmptyPrefix,
    #[error("bot.default_prefix must not contain whitespace, got '{0}'")]
    PrefixContainsSpace(String),
    #[error("cogs.load lists '{0}' more than once")]
    DuplicateCog(String),
    #[error("cogs.load names an unknown cog: {0}")]
    UnknownCog(String),
    #[error("database.path parent directory does not exist: {0}")]
    DatabasePathInvalid(String),
}

/// Validate a configuration, returning all errors found.
///
/// `known_cogs` is the set of cog classes the daemon registers.
pub fn validate(config: &Config, known_cogs: &[&str]) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.bot.name.trim().is_empty() {
        errors.push(ValidationError::MissingBotName);
    }

    let prefix = &config.bot.default_prefix;
    if prefix.is_empty() {
        errors.push(ValidationError::EmptyPrefix);
    } else if prefix.chars().any(char::is_whitespace) {
        errors.push(ValidationError::PrefixContainsSpace(prefix.clone()));
    }

    let mut seen = HashSet::new();
    for cog in &config.cogs.load {
        if !seen.insert(cog.as_str()) {
            errors.push(ValidationError::DuplicateCog(cog.clone()));
        } else if !known_cogs.contains(&cog.as_str()) {
            errors.push(ValidationError::UnknownCog(cog.clone()));
        }
    }

    // Database path validation
    let db_path = Path::new(&config.database.path);
    if config.database.path != ":memory:"
        && let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        errors.push(ValidationError::DatabasePathInvalid(
            config.database.path.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KNOWN: &[&str] = &["Meta", "Admin", "Guild", "Utility"];

    fn minimal_valid_config() -> String {
        r#"
[bot]
name = "carbot"

[database]
path = ":memory:"
"#
        .to_string()
    }

    #[test]
    fn test_valid_config_passes() {
        let config: Config = toml::from_str(&minimal_valid_config()).unwrap();
        assert!(validate(&config, KNOWN).is_ok());
    }

    #[test]
    fn test_empty_bot_name_fails() {
        let toml = r#"
[bot]
name = "  "

[database]
path = ":memory:"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config, KNOWN).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ValidationError::MissingBotName)));
    }

    #[test]
    fn test_bad_prefixes_fail() {
        let toml = r#"
[bot]
name = "carbot"
default_prefix = ""

[database]
path = ":memory:"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config, KNOWN).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ValidationError::EmptyPrefix)));

        let toml = r#"
[bot]
name = "carbot"
default_prefix = "c "

[database]
path = ":memory:"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config, KNOWN).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ValidationError::PrefixContainsSpace(_))));
    }

    #[test]
    fn test_cog_list_problems_are_all_reported() {
        let toml = r#"
[bot]
name = ""

[database]
path = "/nonexistent/dir/carbot.db"

[cogs]
load = ["Meta", "Music", "Meta"]
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config, KNOWN).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().any(|e| matches!(e, ValidationError::UnknownCog(c) if c == "Music")));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::DuplicateCog(c) if c == "Meta")));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::DatabasePathInvalid(_))));
    }
}
