//! Constraint converters that narrow an already-typed value.

use super::{Converter, Schema, join_last, raw_text};
use crate::context::Context;
use crate::enums::OptionType;
use crate::error::CarError;
use crate::value::ArgValue;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::fmt;

/// One end of a numeric range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    Int(i64),
    Float(f64),
}

impl Bound {
    fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }

    fn to_json(self) -> Value {
        match self {
            Self::Int(i) => json!(i),
            Self::Float(f) => json!(f),
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
        }
    }
}

impl From<i64> for Bound {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Bound {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for Bound {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

/// Inclusive numeric range; at least one bound is set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InRange {
    pub lower: Option<Bound>,
    pub upper: Option<Bound>,
}

impl InRange {
    pub fn between(lower: impl Into<Bound>, upper: impl Into<Bound>) -> Self {
        Self {
            lower: Some(lower.into()),
            upper: Some(upper.into()),
        }
    }

    pub fn at_least(lower: impl Into<Bound>) -> Self {
        Self {
            lower: Some(lower.into()),
            upper: None,
        }
    }

    pub fn at_most(upper: impl Into<Bound>) -> Self {
        Self {
            lower: None,
            upper: Some(upper.into()),
        }
    }
}

#[async_trait]
impl Converter for InRange {
    async fn convert(&self, _ctx: &Context, raw: ArgValue) -> Result<ArgValue, CarError> {
        let Some(x) = raw.as_f64() else {
            return Err(CarError::argument("This must be a number!"));
        };

        if let Some(l) = self.lower
            && x < l.as_f64()
        {
            return Err(CarError::argument(format!("This number must be ≥ {l}!")));
        }
        if let Some(u) = self.upper
            && x > u.as_f64()
        {
            return Err(CarError::argument(format!("This number must be ≤ {u}!")));
        }
        Ok(raw)
    }

    fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(l) = self.lower {
            parts.push(format!("≥ {l}"));
        }
        if let Some(u) = self.upper {
            parts.push(format!("≤ {u}"));
        }
        parts.join(" and ")
    }

    fn modify_schema(&self, schema: &mut Schema) {
        if let Some(l) = self.lower {
            schema.insert("min_value".into(), l.to_json());
        }
        if let Some(u) = self.upper {
            schema.insert("max_value".into(), u.to_json());
        }
    }
}

/// Fixed label to value mapping, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct FromChoices {
    choices: Vec<(String, ArgValue)>,
}

impl FromChoices {
    pub fn new<I, L, V>(choices: I) -> Self
    where
        I: IntoIterator<Item = (L, V)>,
        L: Into<String>,
        V: Into<ArgValue>,
    {
        Self {
            choices: choices
                .into_iter()
                .map(|(l, v)| (l.into(), v.into()))
                .collect(),
        }
    }

    /// Choices whose label is also the value.
    pub fn labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(labels.into_iter().map(|l| {
            let l = l.into();
            (l.clone(), ArgValue::Str(l))
        }))
    }

    pub fn choices(&self) -> &[(String, ArgValue)] {
        &self.choices
    }

    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }

    fn option_type(&self) -> OptionType {
        match self.choices.first().map(|(_, v)| v) {
            Some(ArgValue::Int(_)) => OptionType::Integer,
            Some(ArgValue::Float(_)) => OptionType::Number,
            _ => OptionType::String,
        }
    }
}

#[async_trait]
impl Converter for FromChoices {
    async fn convert(&self, _ctx: &Context, raw: ArgValue) -> Result<ArgValue, CarError> {
        let label = raw_text(&raw);
        self.choices
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| CarError::argument(format!("This argument must be {}", self.describe())))
    }

    async fn convert_structured(&self, _ctx: &Context, raw: ArgValue) -> Result<ArgValue, CarError> {
        if self.choices.iter().any(|(_, v)| *v == raw) {
            Ok(raw)
        } else {
            Err(CarError::argument(
                "Invalid choice! (probably because the command list is out of date)",
            ))
        }
    }

    fn describe(&self) -> String {
        let labels: Vec<String> = self.choices.iter().map(|(l, _)| format!("`{l}`")).collect();
        join_last(&labels, "or")
    }

    fn schema_description(&self) -> String {
        "from the list of choices".into()
    }

    fn modify_schema(&self, schema: &mut Schema) {
        schema.insert("type".into(), json!(self.option_type() as u8));
        let choices: Vec<Value> = self
            .choices
            .iter()
            .map(|(name, value)| json!({"name": name, "value": value.to_json()}))
            .collect();
        schema.insert("choices".into(), Value::Array(choices));
    }
}
