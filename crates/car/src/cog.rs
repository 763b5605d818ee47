//! Cogs: loadable bundles of commands and listeners.

use crate::bot::BotHandle;
use crate::check::Check;
use crate::command::{CommandCore, Declaration, StructuredCommand, TextCommand};
use crate::error::CarError;
use crate::listener::Listener;
use std::fmt;
use std::sync::Arc;

/// A group of related commands and listeners.
///
/// A fresh instance is created on every load, so any state it keeps is
/// dropped on unload and reload.
pub trait Cog: Send + Sync + 'static {
    /// Category for commands that do not name one.
    fn category(&self) -> Option<&str> {
        None
    }

    /// Checks appended to every command of the cog.
    fn checks(&self) -> Vec<Arc<dyn Check>> {
        Vec::new()
    }

    fn commands(self: Arc<Self>) -> Result<Vec<Declaration>, CarError>;

    fn listeners(self: Arc<Self>) -> Vec<Listener> {
        Vec::new()
    }
}

type CogFactory = dyn Fn(&BotHandle) -> Arc<dyn Cog> + Send + Sync;

/// Named constructor registered with the registry ahead of loading.
#[derive(Clone)]
pub struct CogClass {
    name: String,
    factory: Arc<CogFactory>,
}

impl CogClass {
    pub fn new<F, C>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&BotHandle) -> C + Send + Sync + 'static,
        C: Cog,
    {
        Self {
            name: name.into(),
            factory: Arc::new(move |handle: &BotHandle| Arc::new(factory(handle)) as Arc<dyn Cog>),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn instantiate(&self, handle: &BotHandle) -> Arc<dyn Cog> {
        (self.factory)(handle)
    }
}

impl fmt::Debug for CogClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CogClass").field("name", &self.name).finish()
    }
}

/// A loaded cog with its commands finalized.
pub struct CogInstance {
    pub name: String,
    pub text: Vec<Arc<TextCommand>>,
    pub structured: Vec<Arc<StructuredCommand>>,
    pub listeners: Vec<Arc<Listener>>,
    _cog: Arc<dyn Cog>,
}

impl CogInstance {
    /// Apply the cog's category and checks to every declaration and take
    /// ownership of the results.
    pub(crate) fn assemble(name: &str, cog: Arc<dyn Cog>) -> Result<Self, CarError> {
        let category = cog.category().map(str::to_string);
        let checks = cog.checks();

        let finish = |core: &mut CommandCore| {
            core.set_default_category(category.as_deref());
            for check in &checks {
                core.add_check(check.clone());
            }
            core.attach(name);
        };

        let mut text = Vec::new();
        let mut structured = Vec::new();
        for decl in cog.clone().commands()? {
            match decl {
                Declaration::Text(mut cmd) => {
                    finish(&mut cmd.core);
                    text.push(Arc::new(cmd));
                }
                Declaration::Structured(mut cmd) => {
                    finish(&mut cmd.core);
                    structured.push(Arc::new(cmd));
                }
                Declaration::Mixed {
                    text: mut t,
                    structured: mut s,
                } => {
                    finish(&mut t.core);
                    finish(&mut s.core);
                    text.push(Arc::new(t));
                    structured.push(Arc::new(s));
                }
            }
        }

        let listeners = cog
            .clone()
            .listeners()
            .into_iter()
            .map(|mut l| {
                l.attach(name);
                Arc::new(l)
            })
            .collect();

        Ok(Self {
            name: name.to_string(),
            text,
            structured,
            listeners,
            _cog: cog,
        })
    }
}

impl fmt::Debug for CogInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CogInstance")
            .field("name", &self.name)
            .field("text", &self.text.len())
            .field("structured", &self.structured.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
