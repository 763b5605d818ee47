use super::CommandCore;

/// Prefix-text command.
#[derive(Debug)]
pub struct TextCommand {
    pub core: CommandCore,
    pub aliases: Vec<String>,
    /// The final argument takes all remaining raw text.
    pub slurp_last_argument: bool,
}

impl TextCommand {
    pub fn name(&self) -> &str {
        self.core.name()
    }

    /// Name followed by every alias.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name()).chain(self.aliases.iter().map(String::as_str))
    }
}
