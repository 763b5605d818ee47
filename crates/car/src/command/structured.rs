use super::CommandCore;
use crate::enums::{CommandType, OptionType};
use serde_json::{Value, json};

/// Slash-style command. Nested commands are named by their space-separated
/// path (`"math add"`); the registry indexes children under their parent.
#[derive(Debug)]
pub struct StructuredCommand {
    pub core: CommandCore,
}

impl StructuredCommand {
    pub fn name(&self) -> &str {
        self.core.name()
    }

    pub fn has_parent(&self) -> bool {
        self.name().contains(' ')
    }

    pub fn parent_name(&self) -> Option<&str> {
        self.name().rsplit_once(' ').map(|(parent, _)| parent)
    }

    pub fn rightmost_name(&self) -> &str {
        self.name().rsplit(' ').next().unwrap_or_default()
    }

    /// Registration schema. `children` are the already-serialized
    /// subcommands; a command without children is a leaf carrying its
    /// arguments as options.
    pub fn json(&self, children: Vec<Value>) -> Value {
        let mut data = serde_json::Map::new();
        data.insert("name".into(), json!(self.rightmost_name()));
        data.insert("description".into(), json!(self.core.description()));

        if self.has_parent() {
            data.insert("type".into(), json!(OptionType::SubCommandGroup as u8));
        } else {
            if let Some(guild_id) = self.core.guild_id() {
                data.insert("guild_id".into(), json!(guild_id));
            }
            data.insert("type".into(), json!(CommandType::ChatInput as u8));
        }

        let options = if children.is_empty() {
            data.insert("type".into(), json!(OptionType::SubCommand as u8));
            self.core.arguments().values().map(|a| a.json()).collect()
        } else {
            children
        };
        data.insert("options".into(), Value::Array(options));

        Value::Object(data)
    }
}
