//! Builder for command declarations.

use super::{CommandCore, Handler, StructuredCommand, TextCommand};
use crate::argument::{Argument, is_option_name};
use crate::check::Check;
use crate::context::Context;
use crate::error::{CarError, CommandResult};
use crate::value::Args;
use indexmap::IndexMap;
use std::sync::Arc;

const DEFAULT_DESCRIPTION: &str = "No description";
const GROUP_DESCRIPTION: &str = "Command Group";

async fn group_handler(_ctx: Arc<Context>, _args: Args) -> CommandResult {
    Ok(())
}

/// A built, not yet registered, command declaration.
#[derive(Debug)]
pub enum Declaration {
    Text(TextCommand),
    Structured(StructuredCommand),
    /// One definition exposed on both surfaces.
    Mixed {
        text: TextCommand,
        structured: StructuredCommand,
    },
}

/// Accumulates a command definition.
///
/// ```ignore
/// CommandBuilder::new("roll")
///     .description("Roll a die")
///     .handler(RollHandler)
///     .arg(Argument::new("sides", ArgType::Int).default(6))
///     .alias("r")
///     .build_mixed()?
/// ```
#[derive(Clone)]
pub struct CommandBuilder {
    name: String,
    text_name: Option<String>,
    structured_name: Option<String>,
    description: Option<String>,
    handler: Option<Arc<dyn Handler>>,
    arguments: Vec<Argument>,
    category: Option<String>,
    max_concurrency: Option<usize>,
    hidden: bool,
    checks: Vec<Arc<dyn Check>>,
    aliases: Vec<String>,
    slurp_last_argument: bool,
}

impl CommandBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text_name: None,
            structured_name: None,
            description: None,
            handler: None,
            arguments: Vec::new(),
            category: None,
            max_concurrency: None,
            hidden: false,
            checks: Vec::new(),
            aliases: Vec::new(),
            slurp_last_argument: false,
        }
    }

    /// Hidden structured group whose children are declared as `"name child"`.
    pub fn group(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name)
            .description(description)
            .handler(group_handler)
            .hidden()
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn handler(mut self, handler: impl Handler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn arg(mut self, argument: Argument) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = Some(max);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn check(mut self, check: impl Check + 'static) -> Self {
        self.checks.push(Arc::new(check));
        self
    }

    /// Text-surface alias.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn slurp_last_argument(mut self) -> Self {
        self.slurp_last_argument = true;
        self
    }

    /// Override the name used on the text surface of a mixed command.
    pub fn text_name(mut self, name: impl Into<String>) -> Self {
        self.text_name = Some(name.into());
        self
    }

    /// Override the name used on the structured surface of a mixed command.
    pub fn structured_name(mut self, name: impl Into<String>) -> Self {
        self.structured_name = Some(name.into());
        self
    }

    fn core(&self, name: String) -> Result<CommandCore, CarError> {
        let handler = self
            .handler
            .clone()
            .ok_or_else(|| CarError::configuration(format!("command `{name}` has no handler")))?;
        if self.max_concurrency == Some(0) {
            return Err(CarError::configuration(format!(
                "command `{name}` has a max_concurrency of zero"
            )));
        }

        let mut arguments = IndexMap::new();
        for argument in &self.arguments {
            argument.validate()?;
            if arguments
                .insert(argument.name().to_string(), argument.clone())
                .is_some()
            {
                return Err(CarError::configuration(format!(
                    "command `{name}` declares argument `{}` twice",
                    argument.name()
                )));
            }
        }

        let mut core = CommandCore::new(
            name,
            self.description
                .clone()
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            handler,
            arguments,
            self.category.clone(),
            self.max_concurrency,
            self.hidden,
        );
        for check in &self.checks {
            core.add_check(check.clone());
        }
        Ok(core)
    }

    fn text(&self) -> Result<TextCommand, CarError> {
        let name = self.text_name.clone().unwrap_or_else(|| self.name.clone());
        for n in std::iter::once(&name).chain(&self.aliases) {
            if n.is_empty() || n.contains(char::is_whitespace) {
                return Err(CarError::configuration(format!(
                    "invalid text command name or alias `{n}`"
                )));
            }
        }
        Ok(TextCommand {
            core: self.core(name)?,
            aliases: self.aliases.clone(),
            slurp_last_argument: self.slurp_last_argument,
        })
    }

    fn structured(&self) -> Result<StructuredCommand, CarError> {
        let name = self
            .structured_name
            .clone()
            .unwrap_or_else(|| self.name.clone());
        if !name.split(' ').all(is_option_name) {
            return Err(CarError::configuration(format!(
                "invalid structured command name `{name}`"
            )));
        }
        Ok(StructuredCommand {
            core: self.core(name)?,
        })
    }

    pub fn build_text(&self) -> Result<Declaration, CarError> {
        Ok(Declaration::Text(self.text()?))
    }

    pub fn build_structured(&self) -> Result<Declaration, CarError> {
        Ok(Declaration::Structured(self.structured()?))
    }

    /// Both surfaces from one definition. Aliases only apply to text.
    pub fn build_mixed(&self) -> Result<Declaration, CarError> {
        Ok(Declaration::Mixed {
            text: self.text()?,
            structured: self.structured()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argument::ArgType;
    use crate::check::SpecificGuildOnly;
    use crate::model::GuildId;

    async fn noop(_ctx: Arc<Context>, _args: Args) -> CommandResult {
        Ok(())
    }

    #[test]
    fn test_mixed_names() {
        let decl = CommandBuilder::new("settings")
            .structured_name("config")
            .alias("set")
            .handler(noop)
            .build_mixed()
            .unwrap();
        let Declaration::Mixed { text, structured } = decl else {
            panic!("expected a mixed declaration");
        };
        assert_eq!(text.name(), "settings");
        assert_eq!(text.names().collect::<Vec<_>>(), vec!["settings", "set"]);
        assert_eq!(structured.name(), "config");
        assert_eq!(structured.core.description(), "No description");
    }

    #[test]
    fn test_invalid_declarations() {
        assert!(CommandBuilder::new("x").build_text().is_err());
        assert!(
            CommandBuilder::new("x")
                .handler(noop)
                .arg(Argument::new("a", ArgType::Int))
                .arg(Argument::new("a", ArgType::Str))
                .build_text()
                .is_err()
        );
        assert!(
            CommandBuilder::new("x")
                .handler(noop)
                .arg(Argument::new("a", ArgType::Int).optional())
                .build_structured()
                .is_err()
        );
        assert!(CommandBuilder::new("Bad Name").handler(noop).build_structured().is_err());
        assert!(CommandBuilder::new("two words").handler(noop).build_text().is_err());
        assert!(CommandBuilder::new("x").handler(noop).max_concurrency(0).build_text().is_err());
    }

    #[test]
    fn test_guild_scope_from_builder_check() {
        let Declaration::Structured(cmd) = CommandBuilder::new("secret")
            .handler(noop)
            .check(SpecificGuildOnly::new(GuildId(9)))
            .build_structured()
            .unwrap()
        else {
            panic!("expected a structured declaration");
        };
        assert_eq!(cmd.core.guild_id(), Some(GuildId(9)));
        assert_eq!(cmd.core.checks().len(), 1);
    }
}
