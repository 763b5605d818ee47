//! Argument converters.
//!
//! A converter turns a raw argument (a token on the text surface, a typed
//! JSON value on the structured surface) into an [`ArgValue`], validating it
//! along the way. Converters compose left to right through [`Chain`].

mod constraint;
mod entity;
mod primitive;

pub use constraint::{Bound, FromChoices, InRange};
pub use entity::{ToEmote, ToMember, ToRole, ToTextChannel, ToVoiceChannel};
pub use primitive::{ToBool, ToFloat, ToInt, ToSeconds, ToText, ToUrl};

use crate::context::Context;
use crate::error::CarError;
use crate::value::ArgValue;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Schema fragment of a single structured option.
pub type Schema = Map<String, Value>;

#[async_trait]
pub trait Converter: Send + Sync {
    /// Convert a raw value from the text surface (or a chained stage).
    async fn convert(&self, ctx: &Context, raw: ArgValue) -> Result<ArgValue, CarError>;

    /// Convert a value from a structured payload. The platform has already
    /// validated it against the exported schema.
    async fn convert_structured(&self, ctx: &Context, raw: ArgValue) -> Result<ArgValue, CarError> {
        self.convert(ctx, raw).await
    }

    /// Human-readable type description used in usage text.
    fn describe(&self) -> String;

    /// Plain variant of [`describe`](Self::describe) for schema descriptions.
    fn schema_description(&self) -> String {
        self.describe()
    }

    /// Apply this converter's wire type and constraints to an option schema.
    fn modify_schema(&self, schema: &mut Schema);
}

/// Sequential composition of converters.
#[derive(Clone, Default)]
pub struct Chain {
    stages: Vec<Arc<dyn Converter>>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, stage: Arc<dyn Converter>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

#[async_trait]
impl Converter for Chain {
    async fn convert(&self, ctx: &Context, raw: ArgValue) -> Result<ArgValue, CarError> {
        let mut value = raw;
        for stage in &self.stages {
            value = stage.convert(ctx, value).await?;
        }
        Ok(value)
    }

    async fn convert_structured(&self, ctx: &Context, raw: ArgValue) -> Result<ArgValue, CarError> {
        let mut value = raw;
        for stage in &self.stages {
            value = stage.convert_structured(ctx, value).await?;
        }
        Ok(value)
    }

    fn describe(&self) -> String {
        self.stages
            .iter()
            .map(|s| s.describe())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn schema_description(&self) -> String {
        self.stages
            .iter()
            .map(|s| s.schema_description())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn modify_schema(&self, schema: &mut Schema) {
        for stage in &self.stages {
            stage.modify_schema(schema);
        }
    }
}

/// Raw text of a value; the text surface always hands over strings.
pub(crate) fn raw_text(raw: &ArgValue) -> String {
    match raw {
        ArgValue::Str(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `a`, `a, or b`, `a, b, or c`.
pub(crate) fn join_last(items: &[String], last_sep: &str) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{}, {last_sep} {last}", init.join(", ")),
    }
}
