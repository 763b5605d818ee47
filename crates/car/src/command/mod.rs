//! Command model shared by the structured and text surfaces.
//!
//! A [`CommandCore`] carries everything both surfaces agree on: name,
//! handler, arguments, checks and concurrency accounting. The surfaces wrap
//! it in [`StructuredCommand`] and [`TextCommand`], and [`Command`] is the
//! tagged union the registry and dispatcher pattern-match on.

mod builder;
mod structured;
mod text;

pub use builder::{CommandBuilder, Declaration};
pub use structured::StructuredCommand;
pub use text::TextCommand;

use crate::argument::Argument;
use crate::check::Check;
use crate::context::Context;
use crate::error::{CarError, CommandResult};
use crate::model::GuildId;
use crate::value::Args;
use async_trait::async_trait;
use indexmap::IndexMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Category used when neither the command nor its cog names one.
pub const DEFAULT_CATEGORY: &str = "Uncategorized";

/// Command body.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, ctx: Arc<Context>, args: Args) -> CommandResult;
}

#[async_trait]
impl<F, Fut> Handler for F
where
    F: Fn(Arc<Context>, Args) -> Fut + Send + Sync,
    Fut: Future<Output = CommandResult> + Send + 'static,
{
    async fn handle(&self, ctx: Arc<Context>, args: Args) -> CommandResult {
        (self)(ctx, args).await
    }
}

/// Holds one concurrency slot; released on drop, whatever the exit path.
struct ConcurrencySlot<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> ConcurrencySlot<'a> {
    fn acquire(counter: &'a AtomicUsize, max: Option<usize>) -> Option<Self> {
        counter
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| match max {
                Some(max) if n >= max => None,
                _ => Some(n + 1),
            })
            .ok()
            .map(|_| Self { counter })
    }
}

impl Drop for ConcurrencySlot<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::AcqRel);
    }
}

/// State shared by both command surfaces.
pub struct CommandCore {
    name: String,
    description: String,
    handler: Arc<dyn Handler>,
    arguments: IndexMap<String, Argument>,
    category: Option<String>,
    max_concurrency: Option<usize>,
    concurrency: AtomicUsize,
    hidden: bool,
    checks: Vec<Arc<dyn Check>>,
    guild_id: Option<GuildId>,
    cog: Option<String>,
}

impl CommandCore {
    pub(crate) fn new(
        name: String,
        description: String,
        handler: Arc<dyn Handler>,
        arguments: IndexMap<String, Argument>,
        category: Option<String>,
        max_concurrency: Option<usize>,
        hidden: bool,
    ) -> Self {
        Self {
            name,
            description,
            handler,
            arguments,
            category,
            max_concurrency,
            concurrency: AtomicUsize::new(0),
            hidden,
            checks: Vec::new(),
            guild_id: None,
            cog: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn arguments(&self) -> &IndexMap<String, Argument> {
        &self.arguments
    }

    pub fn category(&self) -> &str {
        self.category.as_deref().unwrap_or(DEFAULT_CATEGORY)
    }

    pub fn max_concurrency(&self) -> Option<usize> {
        self.max_concurrency
    }

    /// Invocations currently holding a slot.
    pub fn concurrency(&self) -> usize {
        self.concurrency.load(Ordering::Acquire)
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn checks(&self) -> &[Arc<dyn Check>] {
        &self.checks
    }

    pub fn guild_id(&self) -> Option<GuildId> {
        self.guild_id
    }

    /// Name of the owning cog, set when the cog is assembled.
    pub fn cog(&self) -> Option<&str> {
        self.cog.as_deref()
    }

    pub(crate) fn set_default_category(&mut self, category: Option<&str>) {
        if self.category.is_none() {
            self.category = category.map(str::to_string);
        }
    }

    pub(crate) fn attach(&mut self, cog: &str) {
        self.cog = Some(cog.to_string());
    }

    /// Append a check. A guild-scoped check also scopes registration.
    pub fn add_check(&mut self, check: Arc<dyn Check>) {
        if let Some(guild_id) = check.guild_scope() {
            self.guild_id = Some(guild_id);
        }
        self.checks.push(check);
    }

    /// Evaluate checks in order; the first failure wins.
    pub async fn run_checks(&self, ctx: &Context) -> Result<(), CarError> {
        for check in &self.checks {
            check.evaluate(ctx).await?;
        }
        Ok(())
    }

    /// Run the handler inside a concurrency slot.
    pub async fn run(&self, ctx: Arc<Context>, args: Args) -> CommandResult {
        let Some(_slot) = ConcurrencySlot::acquire(&self.concurrency, self.max_concurrency) else {
            return Err(CarError::command("Maximum concurrency reached!"));
        };
        if self.cog.is_none() {
            return Err(CarError::configuration(format!(
                "command `{}` has not been initialized properly",
                self.name
            )));
        }
        self.handler.handle(ctx, args).await
    }

    /// One-line usage sketch. Bound values replace labels; `highlight`
    /// points at the offending argument.
    pub fn outline(&self, args: &Args, prefix: &str, highlight: Option<&str>) -> String {
        let mut out = vec!["``".to_string(), prefix.to_string(), self.name.clone()];
        let last = self.arguments.len().saturating_sub(1);

        for (i, arg) in self.arguments.values().enumerate() {
            let mut label = match args.optional(arg.name()) {
                Some(value) => value.to_string(),
                None => arg.label(),
            };
            if label.is_empty() {
                label = " ".to_string();
            }

            if highlight == Some(arg.name()) {
                label = format!("``**__`{label}`__**");
                if i != last {
                    label.push_str("``");
                }
            } else if i == last {
                label.push_str("``");
            }

            out.push(" ".to_string());
            out.push(label);
        }

        if self.arguments.is_empty() {
            out.push("``".to_string());
        }
        out.concat()
    }

    /// Outline followed by one long-form line per argument.
    pub fn usage(&self, prefix: &str) -> String {
        let mut items = vec![self.outline(&Args::new(), prefix, None)];
        items.extend(self.arguments.values().map(Argument::usage_label));
        items.join("\n\n")
    }
}

impl fmt::Debug for CommandCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandCore")
            .field("name", &self.name)
            .field("category", &self.category())
            .field("max_concurrency", &self.max_concurrency)
            .field("hidden", &self.hidden)
            .field("guild_id", &self.guild_id)
            .field("cog", &self.cog)
            .finish()
    }
}

/// A registered command on either surface.
#[derive(Debug, Clone)]
pub enum Command {
    Structured(Arc<StructuredCommand>),
    Text(Arc<TextCommand>),
}

impl Command {
    pub fn core(&self) -> &CommandCore {
        match self {
            Self::Structured(cmd) => &cmd.core,
            Self::Text(cmd) => &cmd.core,
        }
    }

    pub fn name(&self) -> &str {
        self.core().name()
    }

    pub fn outline(&self, args: &Args, prefix: &str, highlight: Option<&str>) -> String {
        self.core().outline(args, prefix, highlight)
    }

    pub fn usage(&self, prefix: &str) -> String {
        self.core().usage(prefix)
    }

    pub async fn run_checks(&self, ctx: &Context) -> Result<(), CarError> {
        self.core().run_checks(ctx).await
    }

    pub async fn run(&self, ctx: Arc<Context>, args: Args) -> CommandResult {
        self.core().run(ctx, args).await
    }

    pub fn surface(&self) -> &'static str {
        match self {
            Self::Structured(_) => "structured",
            Self::Text(_) => "text",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argument::ArgType;
    use crate::check::GuildOnly;
    use crate::test_support::dm_context;
    use crate::value::ArgValue;

    async fn noop(_ctx: Arc<Context>, _args: Args) -> CommandResult {
        Ok(())
    }

    fn repeat() -> CommandCore {
        let Declaration::Text(cmd) = CommandBuilder::new("repeat")
            .handler(noop)
            .arg(Argument::new("times", ArgType::Int))
            .arg(Argument::new("text", ArgType::Str))
            .arg(Argument::new("loud", ArgType::Bool).default(false))
            .build_text()
            .unwrap()
        else {
            panic!("expected a text declaration");
        };
        cmd.core
    }

    #[test]
    fn test_outline_labels() {
        let core = repeat();
        assert_eq!(
            core.outline(&Args::new(), ".", None),
            "``.repeat [times] [text] (loud)``"
        );
    }

    #[test]
    fn test_outline_highlight_and_values() {
        let core = repeat();
        let mut args = Args::new();
        args.insert("times", ArgValue::Int(3));

        assert_eq!(
            core.outline(&args, ".", Some("text")),
            "``.repeat 3 ``**__`[text]`__**`` (loud)``"
        );
        assert_eq!(
            core.outline(&args, ".", Some("loud")),
            "``.repeat 3 [text] ``**__`(loud)`__**"
        );
    }

    #[test]
    fn test_outline_without_arguments() {
        let Declaration::Text(cmd) = CommandBuilder::new("ping").handler(noop).build_text().unwrap() else {
            panic!("expected a text declaration");
        };
        assert_eq!(cmd.core.outline(&Args::new(), ".", None), "``.ping``");
    }

    #[test]
    fn test_usage_lists_arguments() {
        let usage = repeat().usage("!");
        let lines: Vec<&str> = usage.split("\n\n").collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "`[times]`: **an integer**");
        assert_eq!(lines[3], "`(loud)`: **`yes` or `no`** *(default: no)*");
    }

    #[tokio::test]
    async fn test_run_requires_cog() {
        let core = repeat();
        let err = core.run(Arc::new(dm_context()), Args::new()).await.unwrap_err();
        assert!(matches!(err, CarError::Configuration(_)));
        assert_eq!(core.concurrency(), 0);
    }

    #[tokio::test]
    async fn test_checks_short_circuit() {
        let mut core = repeat();
        core.add_check(Arc::new(GuildOnly));
        let err = core.run_checks(&dm_context()).await.unwrap_err();
        assert!(matches!(err, CarError::Check(_)));
    }

    #[test]
    fn test_slot_released_on_drop() {
        let counter = AtomicUsize::new(0);
        let first = ConcurrencySlot::acquire(&counter, Some(1));
        assert!(first.is_some());
        assert!(ConcurrencySlot::acquire(&counter, Some(1)).is_none());
        drop(first);
        assert!(ConcurrencySlot::acquire(&counter, Some(1)).is_some());
        assert_eq!(counter.load(Ordering::Acquire), 0);
    }
}
