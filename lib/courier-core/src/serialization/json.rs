//! JSON parse node and serialization writer, backed by `serde_json`.

use std::str::FromStr;

use bytes::Bytes;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeDelta};
use rust_decimal::Decimal;
use serde_json::{Map, Number, Value};
use uuid::Uuid;

use super::{
    ParseHooks, ParseNode, ParseNodeFactory, PrimitiveValue, Serializable, SerializationHooks,
    SerializationWriter, SerializationWriterFactory,
};
use crate::{ContentType, Error, Result};

// ============================================================================
// Parse node
// ============================================================================

/// Parse node over a `serde_json::Value`.
#[derive(Debug, Clone)]
pub struct JsonParseNode {
    value: Value,
    hooks: ParseHooks,
}

impl JsonParseNode {
    /// Creates a node over a JSON value.
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self {
            value,
            hooks: ParseHooks::new(),
        }
    }

    fn child(&self, value: Value) -> Box<dyn ParseNode> {
        Box::new(Self {
            value,
            hooks: self.hooks.clone(),
        })
    }

    fn text(&self, expected: &str) -> Result<Option<&str>> {
        match &self.value {
            Value::Null => Ok(None),
            Value::String(text) => Ok(Some(text)),
            other => Err(mismatch(expected, other)),
        }
    }

    fn parse_text<T>(&self, expected: &str, parse: impl FnOnce(&str) -> Option<T>) -> Result<Option<T>> {
        self.text(expected)?
            .map(|text| {
                parse(text).ok_or_else(|| {
                    Error::deserialization(format!("expected {expected}, found {text:?}"))
                })
            })
            .transpose()
    }

    fn integer<T: TryFrom<i64>>(&self, expected: &str) -> Result<Option<T>> {
        match &self.value {
            Value::Null => Ok(None),
            Value::Number(number) => number
                .as_i64()
                .and_then(|n| T::try_from(n).ok())
                .map(Some)
                .ok_or_else(|| mismatch(expected, &self.value)),
            other => Err(mismatch(expected, other)),
        }
    }
}

fn mismatch(expected: &str, found: &Value) -> Error {
    Error::deserialization(format!("expected {expected}, found {found}"))
}

impl ParseNode for JsonParseNode {
    fn child_node(&self, name: &str) -> Result<Option<Box<dyn ParseNode>>> {
        match &self.value {
            Value::Object(map) => Ok(map.get(name).map(|value| self.child(value.clone()))),
            Value::Null => Ok(None),
            other => Err(mismatch("an object", other)),
        }
    }

    fn collection_of_nodes(&self) -> Result<Vec<Box<dyn ParseNode>>> {
        match &self.value {
            Value::Array(items) => Ok(items.iter().map(|item| self.child(item.clone())).collect()),
            Value::Null => Ok(Vec::new()),
            other => Err(mismatch("an array", other)),
        }
    }

    fn string_value(&self) -> Result<Option<String>> {
        Ok(self.text("a string")?.map(str::to_string))
    }

    fn bool_value(&self) -> Result<Option<bool>> {
        match &self.value {
            Value::Null => Ok(None),
            Value::Bool(value) => Ok(Some(*value)),
            other => Err(mismatch("a boolean", other)),
        }
    }

    fn u8_value(&self) -> Result<Option<u8>> {
        self.integer("a byte")
    }

    fn i8_value(&self) -> Result<Option<i8>> {
        self.integer("a signed byte")
    }

    fn i32_value(&self) -> Result<Option<i32>> {
        self.integer("a 32-bit integer")
    }

    fn i64_value(&self) -> Result<Option<i64>> {
        self.integer("a 64-bit integer")
    }

    #[allow(clippy::cast_possible_truncation)]
    fn f32_value(&self) -> Result<Option<f32>> {
        Ok(self.f64_value()?.map(|value| value as f32))
    }

    fn f64_value(&self) -> Result<Option<f64>> {
        match &self.value {
            Value::Null => Ok(None),
            Value::Number(number) => number
                .as_f64()
                .map(Some)
                .ok_or_else(|| mismatch("a number", &self.value)),
            other => Err(mismatch("a number", other)),
        }
    }

    fn decimal_value(&self) -> Result<Option<Decimal>> {
        let text = match &self.value {
            Value::Null => return Ok(None),
            Value::Number(number) => number.to_string(),
            Value::String(text) => text.clone(),
            other => return Err(mismatch("a decimal", other)),
        };
        Decimal::from_str(&text)
            .or_else(|_| Decimal::from_scientific(&text))
            .map(Some)
            .map_err(|err| Error::deserialization(format!("invalid decimal {text:?}: {err}")))
    }

    fn uuid_value(&self) -> Result<Option<Uuid>> {
        self.parse_text("a GUID", |text| Uuid::parse_str(text).ok())
    }

    fn date_time_value(&self) -> Result<Option<DateTime<FixedOffset>>> {
        self.parse_text("an RFC 3339 date-time", |text| {
            DateTime::parse_from_rfc3339(text).ok()
        })
    }

    fn duration_value(&self) -> Result<Option<TimeDelta>> {
        self.parse_text("an ISO 8601 duration", parse_duration)
    }

    fn date_value(&self) -> Result<Option<NaiveDate>> {
        self.parse_text("a date", |text| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
        })
    }

    fn time_value(&self) -> Result<Option<NaiveTime>> {
        self.parse_text("a time", |text| {
            NaiveTime::parse_from_str(text, "%H:%M:%S%.f").ok()
        })
    }

    fn hooks(&self) -> &ParseHooks {
        &self.hooks
    }

    fn set_hooks(&mut self, hooks: ParseHooks) {
        self.hooks = hooks;
    }
}

/// Creates [`JsonParseNode`]s for `application/json` payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonParseNodeFactory;

impl JsonParseNodeFactory {
    /// Creates the factory.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ParseNodeFactory for JsonParseNodeFactory {
    fn valid_content_type(&self) -> &str {
        ContentType::Json.as_str()
    }

    fn root_parse_node(&self, content_type: &str, content: Bytes) -> Result<Box<dyn ParseNode>> {
        if !content_type.eq_ignore_ascii_case(ContentType::Json.as_str()) {
            return Err(Error::deserialization(format!(
                "expected a {} content type, found {content_type}",
                ContentType::Json
            )));
        }
        let value = if content.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&content)?
        };
        Ok(Box::new(JsonParseNode::new(value)))
    }
}

// ============================================================================
// Serialization writer
// ============================================================================

enum Frame {
    Object(Map<String, Value>),
    Array(Vec<Value>),
}

/// Writes a JSON document value by value.
#[derive(Default)]
pub struct JsonSerializationWriter {
    stack: Vec<Frame>,
    root: Option<Value>,
    hooks: SerializationHooks,
}

impl JsonSerializationWriter {
    /// Creates an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn put(&mut self, key: Option<&str>, value: Value) -> Result<()> {
        match (self.stack.last_mut(), key) {
            (Some(Frame::Object(map)), Some(key)) => {
                map.insert(key.to_string(), value);
                Ok(())
            }
            (Some(Frame::Object(_)), None) => Err(Error::serialization(
                "cannot write a value without a key inside an object",
            )),
            (Some(Frame::Array(items)), _) => {
                items.push(value);
                Ok(())
            }
            (None, _) => {
                self.root = Some(value);
                Ok(())
            }
        }
    }
}

fn to_json(value: &PrimitiveValue) -> Result<Value> {
    let value = match value {
        PrimitiveValue::Bool(value) => Value::Bool(*value),
        PrimitiveValue::Byte(value) => Value::from(*value),
        PrimitiveValue::SignedByte(value) => Value::from(*value),
        PrimitiveValue::String(value) => Value::String(value.clone()),
        PrimitiveValue::Int32(value) => Value::from(*value),
        PrimitiveValue::Int64(value) => Value::from(*value),
        PrimitiveValue::Float32(value) => float(f64::from(*value))?,
        PrimitiveValue::Float64(value) => float(*value)?,
        PrimitiveValue::Decimal(value) => serde_json::from_str(&value.to_string())?,
        PrimitiveValue::Guid(value) => Value::String(value.to_string()),
        PrimitiveValue::DateTime(value) => Value::String(value.to_rfc3339()),
        PrimitiveValue::Duration(value) => Value::String(format_duration(*value)),
        PrimitiveValue::Date(value) => Value::String(value.format("%Y-%m-%d").to_string()),
        PrimitiveValue::Time(value) => Value::String(value.format("%H:%M:%S%.f").to_string()),
    };
    Ok(value)
}

fn float(value: f64) -> Result<Value> {
    Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| Error::serialization(format!("{value} cannot be written as JSON")))
}

impl SerializationWriter for JsonSerializationWriter {
    fn write_primitive_value(&mut self, key: Option<&str>, value: &PrimitiveValue) -> Result<()> {
        let value = to_json(value)?;
        self.put(key, value)
    }

    fn write_null_value(&mut self, key: Option<&str>) -> Result<()> {
        self.put(key, Value::Null)
    }

    fn write_object_value(&mut self, key: Option<&str>, value: Option<&dyn Serializable>) -> Result<()> {
        let Some(value) = value else {
            return Ok(());
        };

        self.hooks.run_before(value);
        self.stack.push(Frame::Object(Map::new()));
        let written = value.serialize(self);
        let frame = self.stack.pop();
        written?;
        self.hooks.run_after(value);

        match frame {
            Some(Frame::Object(map)) => self.put(key, Value::Object(map)),
            _ => Err(Error::serialization("unbalanced object frame")),
        }
    }

    fn write_collection_of_object_values(
        &mut self,
        key: Option<&str>,
        values: &[&dyn Serializable],
    ) -> Result<()> {
        self.stack.push(Frame::Array(Vec::with_capacity(values.len())));
        let written = values
            .iter()
            .try_for_each(|value| self.write_object_value(None, Some(*value)));
        let frame = self.stack.pop();
        written?;

        match frame {
            Some(Frame::Array(items)) => self.put(key, Value::Array(items)),
            _ => Err(Error::serialization("unbalanced array frame")),
        }
    }

    fn write_collection_of_primitive_values(
        &mut self,
        key: Option<&str>,
        values: &[PrimitiveValue],
    ) -> Result<()> {
        let items = values.iter().map(to_json).collect::<Result<Vec<_>>>()?;
        self.put(key, Value::Array(items))
    }

    fn serialized_content(&mut self) -> Result<Bytes> {
        let root = self.root.take().unwrap_or(Value::Null);
        Ok(Bytes::from(serde_json::to_vec(&root)?))
    }

    fn hooks(&self) -> &SerializationHooks {
        &self.hooks
    }

    fn set_hooks(&mut self, hooks: SerializationHooks) {
        self.hooks = hooks;
    }
}

/// Creates [`JsonSerializationWriter`]s for `application/json` payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializationWriterFactory;

impl JsonSerializationWriterFactory {
    /// Creates the factory.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SerializationWriterFactory for JsonSerializationWriterFactory {
    fn valid_content_type(&self) -> &str {
        ContentType::Json.as_str()
    }

    fn serialization_writer(&self, content_type: &str) -> Result<Box<dyn SerializationWriter>> {
        if !content_type.eq_ignore_ascii_case(ContentType::Json.as_str()) {
            return Err(Error::serialization(format!(
                "expected a {} content type, found {content_type}",
                ContentType::Json
            )));
        }
        Ok(Box::new(JsonSerializationWriter::new()))
    }
}

// ============================================================================
// ISO 8601 durations
// ============================================================================

/// Parses `[-]P[nW][nD][T[nH][nM][n[.f]S]]`. Years and months have no fixed
/// length and are rejected.
fn parse_duration(text: &str) -> Option<TimeDelta> {
    let (negative, rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let rest = rest.strip_prefix('P')?;
    let (date, time) = match rest.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (rest, None),
    };

    let mut total = TimeDelta::zero();
    for (amount, unit) in components(date)? {
        let amount = amount.parse::<i64>().ok()?;
        total += match unit {
            'W' => TimeDelta::try_weeks(amount)?,
            'D' => TimeDelta::try_days(amount)?,
            _ => return None,
        };
    }
    if let Some(time) = time {
        if time.is_empty() {
            return None;
        }
        for (amount, unit) in components(time)? {
            total += match unit {
                'H' => TimeDelta::try_hours(amount.parse().ok()?)?,
                'M' => TimeDelta::try_minutes(amount.parse().ok()?)?,
                'S' => seconds(amount)?,
                _ => return None,
            };
        }
    }

    Some(if negative { -total } else { total })
}

fn components(text: &str) -> Option<Vec<(&str, char)>> {
    let mut parts = Vec::new();
    let mut start = 0;
    for (index, c) in text.char_indices() {
        if c.is_ascii_alphabetic() {
            let amount = text.get(start..index)?;
            if amount.is_empty() {
                return None;
            }
            parts.push((amount, c));
            start = index + c.len_utf8();
        }
    }
    (start == text.len()).then_some(parts)
}

fn seconds(amount: &str) -> Option<TimeDelta> {
    let (whole, fraction) = amount.split_once('.').unwrap_or((amount, ""));
    let whole = TimeDelta::try_seconds(whole.parse().ok()?)?;
    if fraction.is_empty() {
        return Some(whole);
    }
    let digits = fraction.get(..fraction.len().min(9))?;
    let scale = 10_i64.checked_pow(u32::try_from(9 - digits.len()).ok()?)?;
    let nanos = digits.parse::<i64>().ok()?.checked_mul(scale)?;
    whole.checked_add(&TimeDelta::nanoseconds(nanos))
}

fn format_duration(duration: TimeDelta) -> String {
    let sign = if duration < TimeDelta::zero() { "-" } else { "" };
    let duration = duration.abs();
    let days = duration.num_days();
    let hours = duration.num_hours() % 24;
    let minutes = duration.num_minutes() % 60;
    let seconds = duration.num_seconds() % 60;
    let nanos = duration.subsec_nanos();

    let mut text = format!("{sign}P");
    if days > 0 {
        text.push_str(&format!("{days}D"));
    }
    if hours > 0 || minutes > 0 || seconds > 0 || nanos > 0 || days == 0 {
        text.push('T');
        if hours > 0 {
            text.push_str(&format!("{hours}H"));
        }
        if minutes > 0 {
            text.push_str(&format!("{minutes}M"));
        }
        if nanos > 0 {
            let fraction = format!("{nanos:09}");
            text.push_str(&format!("{seconds}.{}S", fraction.trim_end_matches('0')));
        } else if seconds > 0 || (days == 0 && hours == 0 && minutes == 0) {
            text.push_str(&format!("{seconds}S"));
        }
    }
    text
}
