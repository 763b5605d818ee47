//! Live command registry.
//!
//! The `Registry` maps names and aliases to commands, event names to
//! listeners, and tracks which cogs are loaded. Loading is all-or-nothing:
//! every collision is detected before anything is inserted.

use crate::bot::BotHandle;
use crate::cog::{CogClass, CogInstance};
use crate::command::{Command, StructuredCommand, TextCommand};
use crate::error::CarError;
use crate::listener::Listener;
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// Registry of cogs, commands and listeners.
#[derive(Default)]
pub struct Registry {
    cog_classes: IndexMap<String, CogClass>,
    cogs: IndexMap<String, CogInstance>,
    structured: IndexMap<String, Arc<StructuredCommand>>,
    /// Parent path -> child paths, in registration order. Entries outlive
    /// an unloaded parent so a reloaded parent picks its children back up.
    structured_children: HashMap<String, Vec<String>>,
    text: IndexMap<String, Arc<TextCommand>>,
    aliases: HashMap<String, Arc<TextCommand>>,
    listeners: HashMap<String, IndexMap<String, Arc<Listener>>>,
    /// Command usage counters, kept across reloads.
    command_counts: HashMap<String, Arc<AtomicU64>>,
}

/// Counter key of a command; structured paths are shown with a slash.
fn counter_key(command: &Command) -> String {
    match command {
        Command::Structured(cmd) => format!("/{}", cmd.name()),
        Command::Text(cmd) => cmd.name().to_string(),
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cog class under its name.
    pub fn add_cog_class(&mut self, class: CogClass) -> Result<(), CarError> {
        if self.cog_classes.contains_key(class.name()) {
            return Err(CarError::configuration(format!(
                "Cog class {} is already registered!",
                class.name()
            )));
        }
        self.cog_classes.insert(class.name().to_string(), class);
        Ok(())
    }

    /// Forget a cog class. A loaded instance stays loaded.
    pub fn remove_cog_class(&mut self, name: &str) -> Result<CogClass, CarError> {
        self.cog_classes
            .shift_remove(name)
            .ok_or_else(|| CarError::configuration(format!("Unknown cog {name}!")))
    }

    /// Instantiate and register a cog.
    pub fn load(&mut self, name: &str, handle: &BotHandle) -> Result<(), CarError> {
        if self.cogs.contains_key(name) {
            return Err(CarError::configuration(format!(
                "Cog {name} is already loaded!"
            )));
        }
        let class = self
            .cog_classes
            .get(name)
            .ok_or_else(|| CarError::configuration(format!("Unknown cog {name}!")))?;

        let instance = CogInstance::assemble(name, class.instantiate(handle))?;
        self.validate(&instance)?;
        self.insert(instance);

        info!(cog = %name, "Cog loaded");
        Ok(())
    }

    /// Remove every command, alias and listener of a loaded cog.
    pub fn unload(&mut self, name: &str) -> Result<(), CarError> {
        let instance = self
            .cogs
            .shift_remove(name)
            .ok_or_else(|| CarError::configuration(format!("Cog {name} is not loaded!")))?;

        for cmd in &instance.text {
            self.text.shift_remove(cmd.name());
            for alias in &cmd.aliases {
                self.aliases.remove(alias);
            }
        }

        for cmd in &instance.structured {
            self.structured.shift_remove(cmd.name());
            if let Some(parent) = cmd.parent_name()
                && let Some(siblings) = self.structured_children.get_mut(parent)
            {
                siblings.retain(|child| child != cmd.name());
                if siblings.is_empty() {
                    self.structured_children.remove(parent);
                }
            }
        }

        for per_cog in self.listeners.values_mut() {
            per_cog.shift_remove(name);
        }
        self.listeners.retain(|_, per_cog| !per_cog.is_empty());

        info!(cog = %name, "Cog unloaded");
        Ok(())
    }

    /// Unload then load, carrying no state over.
    pub fn reload(&mut self, name: &str, handle: &BotHandle) -> Result<(), CarError> {
        self.unload(name)?;
        self.load(name, handle)
    }

    fn validate(&self, instance: &CogInstance) -> Result<(), CarError> {
        let mut text_names = HashSet::new();
        for cmd in &instance.text {
            for name in cmd.names() {
                if self.text.contains_key(name)
                    || self.aliases.contains_key(name)
                    || !text_names.insert(name)
                {
                    return Err(CarError::configuration(format!(
                        "Text command or alias {name} already exists!"
                    )));
                }
            }
        }

        let mut structured_names = HashSet::new();
        for cmd in &instance.structured {
            if self.structured.contains_key(cmd.name()) || !structured_names.insert(cmd.name()) {
                return Err(CarError::configuration(format!(
                    "Structured command {} already exists!",
                    cmd.name()
                )));
            }
        }
        for cmd in &instance.structured {
            if let Some(parent) = cmd.parent_name()
                && !self.structured.contains_key(parent)
                && !structured_names.contains(parent)
            {
                return Err(CarError::configuration(format!(
                    "Parent command {parent} of {} is not registered!",
                    cmd.name()
                )));
            }
        }

        Ok(())
    }

    fn insert(&mut self, instance: CogInstance) {
        for cmd in &instance.text {
            for alias in &cmd.aliases {
                self.aliases.insert(alias.clone(), cmd.clone());
            }
            self.text.insert(cmd.name().to_string(), cmd.clone());
            self.ensure_counter(&Command::Text(cmd.clone()));
        }

        for cmd in &instance.structured {
            if let Some(parent) = cmd.parent_name() {
                let siblings = self
                    .structured_children
                    .entry(parent.to_string())
                    .or_default();
                if !siblings.iter().any(|child| child == cmd.name()) {
                    siblings.push(cmd.name().to_string());
                }
            }
            self.structured.insert(cmd.name().to_string(), cmd.clone());
            self.ensure_counter(&Command::Structured(cmd.clone()));
        }

        for listener in &instance.listeners {
            self.listeners
                .entry(listener.event().to_string())
                .or_default()
                .insert(instance.name.clone(), listener.clone());
        }

        debug!(
            cog = %instance.name,
            text = instance.text.len(),
            structured = instance.structured.len(),
            listeners = instance.listeners.len(),
            "registered cog members"
        );
        self.cogs.insert(instance.name.clone(), instance);
    }

    fn ensure_counter(&mut self, command: &Command) {
        self.command_counts
            .entry(counter_key(command))
            .or_insert_with(|| Arc::new(AtomicU64::new(0)));
    }

    /// Text command by name or alias.
    pub fn text_command(&self, name: &str) -> Option<Arc<TextCommand>> {
        self.text
            .get(name)
            .or_else(|| self.aliases.get(name))
            .cloned()
    }

    /// Structured command by space-separated path.
    pub fn structured_command(&self, path: &str) -> Option<Arc<StructuredCommand>> {
        self.structured.get(path).cloned()
    }

    /// Registered child paths of a structured command.
    pub fn structured_children(&self, path: &str) -> Vec<Arc<StructuredCommand>> {
        self.structured_children
            .get(path)
            .into_iter()
            .flatten()
            .filter_map(|child| self.structured.get(child).cloned())
            .collect()
    }

    pub fn text_commands(&self) -> impl Iterator<Item = &Arc<TextCommand>> {
        self.text.values()
    }

    pub fn structured_commands(&self) -> impl Iterator<Item = &Arc<StructuredCommand>> {
        self.structured.values()
    }

    /// Listeners for an event, in cog load order.
    pub fn listeners_for(&self, event: &str) -> Vec<Arc<Listener>> {
        self.listeners
            .get(event)
            .map(|per_cog| per_cog.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Names of loaded cogs.
    pub fn cogs(&self) -> impl Iterator<Item = &str> {
        self.cogs.keys().map(String::as_str)
    }

    /// Names of registered cog classes.
    pub fn cog_classes(&self) -> impl Iterator<Item = &str> {
        self.cog_classes.keys().map(String::as_str)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.cogs.contains_key(name)
    }

    /// Count one resolved invocation.
    pub fn record_use(&self, command: &Command) {
        if let Some(counter) = self.command_counts.get(&counter_key(command)) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get command usage statistics.
    ///
    /// Returns used commands sorted by usage count (descending).
    pub fn command_stats(&self) -> Vec<(String, u64)> {
        let mut stats: Vec<_> = self
            .command_counts
            .iter()
            .map(|(cmd, count)| (cmd.clone(), count.load(Ordering::Relaxed)))
            .filter(|(_, count)| *count > 0)
            .collect();

        stats.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        stats
    }

    /// Structured registration array: roots only, children nested.
    /// Children whose parent was unloaded are left out.
    pub fn export(&self) -> Vec<Value> {
        let mut roots = Vec::new();
        for cmd in self.structured.values() {
            match cmd.parent_name() {
                None => roots.push(self.export_one(cmd)),
                Some(parent) if !self.structured.contains_key(parent) => warn!(
                    command = %cmd.name(),
                    parent = %parent,
                    "Skipping structured command whose parent is not loaded"
                ),
                Some(_) => {}
            }
        }
        roots
    }

    fn export_one(&self, cmd: &StructuredCommand) -> Value {
        let children = self
            .structured_children(cmd.name())
            .iter()
            .map(|child| self.export_one(child))
            .collect();
        cmd.json(children)
    }
}
