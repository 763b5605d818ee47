//! Declarative command arguments.
//!
//! Arguments are declared with a small builder and validated when the
//! owning command is built:
//!
//! ```ignore
//! Argument::new("sides", ArgType::Int)
//!     .description("number of sides")
//!     .default(6)
//!     .range(InRange::between(2, 100))
//! ```

use crate::converter::{
    Chain, Converter, FromChoices, InRange, Schema, ToBool, ToEmote, ToFloat, ToInt, ToMember,
    ToRole, ToSeconds, ToText, ToTextChannel, ToUrl, ToVoiceChannel,
};
use crate::error::CarError;
use crate::value::ArgValue;
use serde_json::{Value, json};
use std::fmt;
use std::sync::Arc;

/// Maximum length of a structured option description.
pub const SCHEMA_DESCRIPTION_LIMIT: usize = 100;

/// Semantic type of an argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    Int,
    Float,
    Str,
    Bool,
    /// Duration in seconds, produced as a float.
    Seconds,
    /// URL string, always validated.
    Url,
    Member,
    Role,
    TextChannel,
    VoiceChannel,
    Emote,
}

impl ArgType {
    pub fn default_converter(self) -> Arc<dyn Converter> {
        match self {
            Self::Int => Arc::new(ToInt),
            Self::Float => Arc::new(ToFloat),
            Self::Str => Arc::new(ToText),
            Self::Bool => Arc::new(ToBool),
            Self::Seconds => Arc::new(ToSeconds::default()),
            Self::Url => Arc::new(ToUrl::new()),
            Self::Member => Arc::new(ToMember),
            Self::Role => Arc::new(ToRole),
            Self::TextChannel => Arc::new(ToTextChannel),
            Self::VoiceChannel => Arc::new(ToVoiceChannel),
            Self::Emote => Arc::new(ToEmote),
        }
    }

    /// Whether a structured payload value already has this type and can
    /// skip conversion. Durations and URLs always convert.
    pub fn matches(self, value: &ArgValue) -> bool {
        matches!(
            (self, value),
            (Self::Int, ArgValue::Int(_))
                | (Self::Float, ArgValue::Float(_))
                | (Self::Str, ArgValue::Str(_))
                | (Self::Bool, ArgValue::Bool(_))
                | (Self::Member, ArgValue::Member(_))
                | (Self::Role, ArgValue::Role(_))
                | (Self::TextChannel | Self::VoiceChannel, ArgValue::Channel(_))
                | (Self::Emote, ArgValue::Emote(_))
        )
    }
}

/// A single command parameter.
#[derive(Clone)]
pub struct Argument {
    name: String,
    kind: ArgType,
    text: Option<String>,
    required: bool,
    default: Option<ArgValue>,
    converter: Arc<dyn Converter>,
    choices: Option<FromChoices>,
    range: Option<InRange>,
}

impl Argument {
    /// A required argument using the type's default converter.
    pub fn new(name: impl Into<String>, kind: ArgType) -> Self {
        Self {
            name: name.into(),
            kind,
            text: None,
            required: true,
            default: None,
            converter: kind.default_converter(),
            choices: None,
            range: None,
        }
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Mark the argument optional. A default must still be supplied, use
    /// `ArgValue::Null` for "no value".
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Optional with the given default.
    pub fn default(mut self, value: impl Into<ArgValue>) -> Self {
        self.required = false;
        self.default = Some(value.into());
        self
    }

    /// Replace the type's default converter.
    pub fn converter(mut self, converter: impl Converter + 'static) -> Self {
        self.converter = Arc::new(converter);
        self
    }

    /// Restrict to a fixed set of choices. Replaces the converter.
    pub fn choices(mut self, choices: FromChoices) -> Self {
        self.converter = Arc::new(choices.clone());
        self.choices = Some(choices);
        self
    }

    /// Bound the converted value. Runs after the current converter.
    pub fn range(mut self, range: InRange) -> Self {
        self.converter = Arc::new(Chain::new().then(self.converter).then(Arc::new(range)));
        self.range = Some(range);
        self
    }

    /// Check the declaration invariants.
    pub(crate) fn validate(&self) -> Result<(), CarError> {
        if !is_option_name(&self.name) {
            return Err(CarError::configuration(format!(
                "invalid argument name `{}` (expected 1-32 of a-z, 0-9, `_`, `-`)",
                self.name
            )));
        }
        if !self.required && self.default.is_none() {
            return Err(CarError::configuration(format!(
                "optional argument `{}` has no default",
                self.name
            )));
        }
        if self.choices.as_ref().is_some_and(FromChoices::is_empty) {
            return Err(CarError::configuration(format!(
                "argument `{}` has an empty choice set",
                self.name
            )));
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ArgType {
        self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Default value; the null sentinel for optional arguments without one.
    pub fn default_value(&self) -> ArgValue {
        self.default.clone().unwrap_or(ArgValue::Null)
    }

    pub fn converter_ref(&self) -> &Arc<dyn Converter> {
        &self.converter
    }

    pub fn choice_set(&self) -> Option<&FromChoices> {
        self.choices.as_ref()
    }

    pub fn bounds(&self) -> Option<&InRange> {
        self.range.as_ref()
    }

    /// `[name]` when required, `(name)` when optional.
    pub fn label(&self) -> String {
        if self.required {
            format!("[{}]", self.name)
        } else {
            format!("({})", self.name)
        }
    }

    fn suffix(&self) -> String {
        if self.required {
            return String::new();
        }
        match &self.default {
            Some(v) if !v.is_null() => format!(" *(default: {v})*"),
            _ => " *(optional)*".to_string(),
        }
    }

    /// Long-form markdown description used in usage text.
    pub fn long_description(&self) -> String {
        let head = match &self.text {
            Some(text) => format!("**{}**—{text}", self.converter.describe()),
            None => format!("**{}**", self.converter.describe()),
        };
        head + &self.suffix()
    }

    /// Plain description for the structured schema, at most 100 characters.
    pub fn schema_description(&self) -> String {
        let full = strip_markdown(&self.long_description());
        if full.chars().count() <= SCHEMA_DESCRIPTION_LIMIT {
            return full;
        }

        let short = match &self.text {
            Some(text) => format!("{}—{text}", self.converter.schema_description()),
            None => self.converter.schema_description(),
        };
        truncate(&strip_markdown(&(short + &self.suffix())), SCHEMA_DESCRIPTION_LIMIT)
    }

    /// One usage line: label followed by the long description.
    pub fn usage_label(&self) -> String {
        format!("`{}`: {}", self.label(), self.long_description())
    }

    /// Structured option schema.
    pub fn json(&self) -> Value {
        let mut schema = Schema::new();
        schema.insert("name".into(), json!(self.name));
        schema.insert("description".into(), json!(self.schema_description()));
        schema.insert("required".into(), json!(self.required));
        self.converter.modify_schema(&mut schema);
        Value::Object(schema)
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Argument")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("default", &self.default)
            .finish()
    }
}

/// Valid structured option / command name segment.
pub(crate) fn is_option_name(name: &str) -> bool {
    (1..=32).contains(&name.chars().count())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

fn strip_markdown(text: &str) -> String {
    text.replace("**", "")
        .replace("__", "")
        .replace(['*', '`', '~'], "")
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut out: String = text.chars().take(limit - 3).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(Argument::new("n", ArgType::Int).label(), "[n]");
        assert_eq!(Argument::new("n", ArgType::Int).default(1).label(), "(n)");
    }

    #[test]
    fn test_long_description() {
        let arg = Argument::new("loud", ArgType::Bool)
            .description("shout it")
            .default(true);
        assert_eq!(arg.long_description(), "**`yes` or `no`**—shout it *(default: yes)*");

        let arg = Argument::new("who", ArgType::Member).default(ArgValue::Null);
        assert_eq!(arg.long_description(), "**a member** *(optional)*");
    }

    #[test]
    fn test_schema_description_is_plain_and_bounded() {
        let arg = Argument::new("n", ArgType::Int).description("how many");
        assert_eq!(arg.schema_description(), "an integer—how many");

        let arg = Argument::new("n", ArgType::Int).description("x".repeat(150));
        assert_eq!(arg.schema_description().chars().count(), SCHEMA_DESCRIPTION_LIMIT);
    }

    #[test]
    fn test_range_chains_after_converter() {
        let arg = Argument::new("sides", ArgType::Int).range(InRange::between(2, 100));
        assert_eq!(arg.long_description(), "**an integer ≥ 2 and ≤ 100**");

        let schema = arg.json();
        assert_eq!(schema["type"], 4);
        assert_eq!(schema["min_value"], 2);
        assert_eq!(schema["max_value"], 100);
        assert_eq!(schema["required"], true);
    }

    #[test]
    fn test_choices_replace_converter() {
        let arg = Argument::new("mode", ArgType::Str).choices(FromChoices::labels(["a", "b"]));
        let schema = arg.json();
        assert_eq!(schema["choices"].as_array().map(Vec::len), Some(2));
        assert_eq!(schema["description"], "a, or b");
    }

    #[test]
    fn test_validate() {
        assert!(Argument::new("ok_name-1", ArgType::Str).validate().is_ok());
        assert!(Argument::new("Bad", ArgType::Str).validate().is_err());
        assert!(Argument::new("", ArgType::Str).validate().is_err());
        assert!(Argument::new("n", ArgType::Int).optional().validate().is_err());
        assert!(
            Argument::new("n", ArgType::Int)
                .optional()
                .default(ArgValue::Null)
                .validate()
                .is_ok()
        );
        assert!(
            Argument::new("c", ArgType::Str)
                .choices(FromChoices::labels(Vec::<String>::new()))
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_type_matching() {
        assert!(ArgType::Int.matches(&ArgValue::Int(1)));
        assert!(!ArgType::Float.matches(&ArgValue::Int(1)));
        assert!(!ArgType::Url.matches(&ArgValue::from("a.com")));
        assert!(!ArgType::Member.matches(&ArgValue::from("123")));
    }
}
