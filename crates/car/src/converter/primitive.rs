//! Scalar converters: numbers, strings, booleans, durations and URLs.

use super::{Converter, Schema, raw_text};
use crate::context::Context;
use crate::enums::OptionType;
use crate::error::CarError;
use crate::value::ArgValue;
use async_trait::async_trait;
use regex::Regex;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::LazyLock;

fn set_type(schema: &mut Schema, kind: OptionType) {
    schema.insert("type".into(), json!(kind as u8));
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ToInt;

#[async_trait]
impl Converter for ToInt {
    async fn convert(&self, _ctx: &Context, raw: ArgValue) -> Result<ArgValue, CarError> {
        if let ArgValue::Int(i) = raw {
            return Ok(ArgValue::Int(i));
        }
        raw_text(&raw)
            .parse::<i64>()
            .map(ArgValue::Int)
            .map_err(|_| CarError::argument(format!("This argument must be {}!", self.describe())))
    }

    fn describe(&self) -> String {
        "an integer".into()
    }

    fn modify_schema(&self, schema: &mut Schema) {
        set_type(schema, OptionType::Integer);
    }
}

/// Reject `nan` and the infinities that `f64::from_str` lets through.
fn finite(x: f64) -> Result<ArgValue, CarError> {
    if x.is_finite() {
        Ok(ArgValue::Float(x))
    } else {
        Err(CarError::argument("This must be a number!"))
    }
}

/// Decimal number, or an `a/b` fraction.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToFloat;

#[async_trait]
impl Converter for ToFloat {
    async fn convert(&self, _ctx: &Context, raw: ArgValue) -> Result<ArgValue, CarError> {
        if let Some(x) = raw.as_f64() {
            return Ok(ArgValue::Float(x));
        }
        let text = raw_text(&raw);
        if let Ok(x) = text.parse::<f64>() {
            return finite(x);
        }

        let parts: Vec<&str> = text.split('/').collect();
        let [num, den] = parts.as_slice() else {
            return Err(CarError::argument("This must be a number!"));
        };
        match (num.parse::<f64>(), den.parse::<f64>()) {
            (Ok(_), Ok(d)) if d == 0.0 => Err(CarError::argument("I can't divide by zero!")),
            (Ok(n), Ok(d)) => finite(n / d),
            _ => Err(CarError::argument(
                "Invalid fraction! (fractions must be in the form a/b, where a and b are numbers)",
            )),
        }
    }

    fn describe(&self) -> String {
        "a number".into()
    }

    fn modify_schema(&self, schema: &mut Schema) {
        set_type(schema, OptionType::Number);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ToText;

#[async_trait]
impl Converter for ToText {
    async fn convert(&self, _ctx: &Context, raw: ArgValue) -> Result<ArgValue, CarError> {
        Ok(ArgValue::Str(raw_text(&raw)))
    }

    fn describe(&self) -> String {
        "a string".into()
    }

    fn modify_schema(&self, schema: &mut Schema) {
        set_type(schema, OptionType::String);
    }
}

/// Duration in seconds: `90`, `1:30`, `1:01:30.5`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToSeconds {
    pub allow_negative: bool,
}

impl ToSeconds {
    pub fn allowing_negative() -> Self {
        Self {
            allow_negative: true,
        }
    }

    fn parse(text: &str) -> Option<f64> {
        if let Ok(x) = text.parse::<f64>() {
            return Some(x);
        }
        let parts: Vec<&str> = text.split(':').collect();
        match parts.as_slice() {
            [m, s] => Some(60.0 * m.parse::<f64>().ok()? + s.parse::<f64>().ok()?),
            [h, m, s] => Some(
                3600.0 * h.parse::<i64>().ok()? as f64
                    + 60.0 * m.parse::<f64>().ok()?
                    + s.parse::<f64>().ok()?,
            ),
            _ => None,
        }
    }
}

#[async_trait]
impl Converter for ToSeconds {
    async fn convert(&self, _ctx: &Context, raw: ArgValue) -> Result<ArgValue, CarError> {
        let seconds = match raw.as_f64() {
            Some(x) => x,
            None => Self::parse(&raw_text(&raw)).ok_or_else(|| {
                CarError::argument(format!("This argument must be {}!", self.describe()))
            })?,
        };

        if !seconds.is_finite() {
            return Err(CarError::argument("This must be a number!"));
        }
        if seconds < 0.0 && !self.allow_negative {
            return Err(CarError::argument("This timestamp must be positive!"));
        }
        Ok(ArgValue::Float(seconds))
    }

    fn describe(&self) -> String {
        "a timestamp/duration (in seconds or HH:MM:SS.ms)".into()
    }

    fn modify_schema(&self, schema: &mut Schema) {
        set_type(schema, OptionType::String);
    }
}

static URL_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9.\-_~:/?#\[\]@!$&'()*+,;%=]+$").expect("URL character class is valid")
});

/// URL with an optional host allow-list. Hosts are compared without `www.`.
#[derive(Debug, Clone, Default)]
pub struct ToUrl {
    allowed: Option<BTreeSet<String>>,
}

impl ToUrl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allowing<I, S>(sites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: Some(sites.into_iter().map(Into::into).collect()),
        }
    }

    fn host(url: &str) -> &str {
        let Some((_, rest)) = url.split_once("://") else {
            return "";
        };
        let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        let host = &rest[..end];
        host.strip_prefix("www.").unwrap_or(host)
    }
}

#[async_trait]
impl Converter for ToUrl {
    async fn convert(&self, _ctx: &Context, raw: ArgValue) -> Result<ArgValue, CarError> {
        let mut url = raw_text(&raw);
        if !URL_CHARS.is_match(&url) || !url.contains('.') {
            return Err(CarError::argument("Invalid URL!"));
        }
        if !url.starts_with("http") {
            url = format!("https://{url}");
        }

        let host = Self::host(&url);
        if host.is_empty() {
            return Err(CarError::argument("Invalid URL!"));
        }
        if let Some(allowed) = &self.allowed
            && !allowed.contains(host)
        {
            return Err(CarError::argument("Disallowed site!"));
        }

        Ok(ArgValue::Str(url))
    }

    fn describe(&self) -> String {
        "a URL".into()
    }

    fn modify_schema(&self, schema: &mut Schema) {
        set_type(schema, OptionType::String);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ToBool;

#[async_trait]
impl Converter for ToBool {
    async fn convert(&self, _ctx: &Context, raw: ArgValue) -> Result<ArgValue, CarError> {
        if let ArgValue::Bool(b) = raw {
            return Ok(ArgValue::Bool(b));
        }
        match raw_text(&raw).to_lowercase().as_str() {
            "y" | "yes" | "true" | "1" => Ok(ArgValue::Bool(true)),
            "n" | "no" | "false" | "0" => Ok(ArgValue::Bool(false)),
            _ => Err(CarError::argument(
                "This must be `yes` or `no`! (alternatively: `true`/`false`, `1`/`0`, or `y`/`n`)",
            )),
        }
    }

    fn describe(&self) -> String {
        "`yes` or `no`".into()
    }

    fn schema_description(&self) -> String {
        "yes or no".into()
    }

    fn modify_schema(&self, schema: &mut Schema) {
        set_type(schema, OptionType::String);
        schema.insert(
            "choices".into(),
            json!([
                {"name": "Yes", "value": "1"},
                {"name": "No", "value": "0"},
            ]),
        );
    }
}
