//! Resolved argument values handed to command handlers.

use crate::error::CarError;
use crate::model::{Channel, Emote, Member, Role};
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;

/// A converted argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    /// Sentinel for an optional argument left unset.
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Member(Member),
    Role(Role),
    Channel(Channel),
    Emote(Emote),
}

impl ArgValue {
    /// Lift a raw structured payload value.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => Self::Str(s.clone()),
            other => Self::Str(other.to_string()),
        }
    }

    /// JSON form used in schemas (choice values).
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Int(i) => Value::from(*i),
            Self::Float(f) => Value::from(*f),
            Self::Bool(b) => Value::from(*b),
            Self::Str(s) => Value::from(s.as_str()),
            other => Value::from(other.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Short type name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "nothing",
            Self::Int(_) => "an integer",
            Self::Float(_) => "a number",
            Self::Bool(_) => "a boolean",
            Self::Str(_) => "a string",
            Self::Member(_) => "a member",
            Self::Role(_) => "a role",
            Self::Channel(_) => "a channel",
            Self::Emote(_) => "an emote",
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "None"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Bool(true) => write!(f, "yes"),
            Self::Bool(false) => write!(f, "no"),
            Self::Str(s) => write!(f, "{s}"),
            Self::Member(m) => write!(f, "{m}"),
            Self::Role(r) => write!(f, "{r}"),
            Self::Channel(c) => write!(f, "{c}"),
            Self::Emote(e) => write!(f, "{e}"),
        }
    }
}

impl From<i64> for ArgValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ArgValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for ArgValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for ArgValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for ArgValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

/// Resolved arguments of one invocation, in declaration order.
///
/// Accessors fail with an internal error when the handler asks for a type
/// its own declaration does not produce.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args(IndexMap<String, ArgValue>);

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ArgValue) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ArgValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn require(&self, name: &str) -> Result<&ArgValue, CarError> {
        self.0
            .get(name)
            .ok_or_else(|| CarError::Internal(anyhow::anyhow!("argument `{name}` was not resolved")))
    }

    fn mismatch(name: &str, want: &str, got: &ArgValue) -> CarError {
        CarError::Internal(anyhow::anyhow!(
            "argument `{name}` is {}, handler expected {want}",
            got.kind()
        ))
    }

    pub fn int(&self, name: &str) -> Result<i64, CarError> {
        match self.require(name)? {
            ArgValue::Int(i) => Ok(*i),
            other => Err(Self::mismatch(name, "an integer", other)),
        }
    }

    pub fn float(&self, name: &str) -> Result<f64, CarError> {
        let value = self.require(name)?;
        value
            .as_f64()
            .ok_or_else(|| Self::mismatch(name, "a number", value))
    }

    pub fn bool(&self, name: &str) -> Result<bool, CarError> {
        match self.require(name)? {
            ArgValue::Bool(b) => Ok(*b),
            other => Err(Self::mismatch(name, "a boolean", other)),
        }
    }

    pub fn str(&self, name: &str) -> Result<&str, CarError> {
        match self.require(name)? {
            ArgValue::Str(s) => Ok(s),
            other => Err(Self::mismatch(name, "a string", other)),
        }
    }

    pub fn member(&self, name: &str) -> Result<&Member, CarError> {
        match self.require(name)? {
            ArgValue::Member(m) => Ok(m),
            other => Err(Self::mismatch(name, "a member", other)),
        }
    }

    pub fn role(&self, name: &str) -> Result<&Role, CarError> {
        match self.require(name)? {
            ArgValue::Role(r) => Ok(r),
            other => Err(Self::mismatch(name, "a role", other)),
        }
    }

    pub fn channel(&self, name: &str) -> Result<&Channel, CarError> {
        match self.require(name)? {
            ArgValue::Channel(c) => Ok(c),
            other => Err(Self::mismatch(name, "a channel", other)),
        }
    }

    pub fn emote(&self, name: &str) -> Result<&Emote, CarError> {
        match self.require(name)? {
            ArgValue::Emote(e) => Ok(e),
            other => Err(Self::mismatch(name, "an emote", other)),
        }
    }

    /// The value if the argument was given, `None` for the null sentinel.
    pub fn optional(&self, name: &str) -> Option<&ArgValue> {
        self.0.get(name).filter(|v| !v.is_null())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json() {
        assert_eq!(ArgValue::from_json(&json!(3)), ArgValue::Int(3));
        assert_eq!(ArgValue::from_json(&json!(2.5)), ArgValue::Float(2.5));
        assert_eq!(ArgValue::from_json(&json!("x")), ArgValue::from("x"));
        assert_eq!(ArgValue::from_json(&json!(true)), ArgValue::Bool(true));
    }

    #[test]
    fn test_accessors() {
        let mut args = Args::new();
        args.insert("n", ArgValue::Int(4));
        args.insert("label", ArgValue::Null);

        assert_eq!(args.int("n").unwrap(), 4);
        assert_eq!(args.float("n").unwrap(), 4.0);
        assert!(args.str("n").is_err());
        assert!(args.int("missing").is_err());
        assert!(args.optional("label").is_none());
    }

    #[test]
    fn test_display_for_outline() {
        assert_eq!(ArgValue::Bool(true).to_string(), "yes");
        assert_eq!(ArgValue::Float(0.75).to_string(), "0.75");
        assert_eq!(ArgValue::Null.to_string(), "None");
    }
}
