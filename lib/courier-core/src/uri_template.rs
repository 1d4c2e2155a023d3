//! RFC 6570 URI template expansion.
//!
//! Supports every level 4 operator (`+`, `#`, `.`, `/`, `;`, `?`, `&`),
//! list values, the explode (`*`) and prefix (`:n`) modifiers.
//! Undefined variables and empty lists are omitted from the output.
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use courier_core::{ParameterValue, expand_template};
//!
//! let mut variables = HashMap::new();
//! variables.insert("baseurl".to_string(), ParameterValue::from("http://localhost"));
//! variables.insert("select".to_string(), ParameterValue::from(vec!["id", "displayName"]));
//!
//! let uri = expand_template("{+baseurl}/me{?select}", &variables).unwrap();
//! assert_eq!(uri, "http://localhost/me?select=id,displayName");
//! ```

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use uuid::Uuid;

use crate::{Error, Result};

/// Characters left as-is by simple expansion: ALPHA / DIGIT / `-` / `.` / `_` / `~`.
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const RESERVED: &str = ":/?#[]@!$&'()*+,;=";

/// A value bound to a template variable.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    /// Plain string.
    String(String),
    /// Boolean, rendered as `true`/`false`.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// GUID.
    Uuid(Uuid),
    /// Date-time with offset, rendered as RFC 3339.
    DateTime(DateTime<FixedOffset>),
    /// Date, rendered as `YYYY-MM-DD`.
    Date(NaiveDate),
    /// Time of day, rendered as `HH:MM:SS`.
    Time(NaiveTime),
    /// List of values.
    List(Vec<ParameterValue>),
}

impl ParameterValue {
    /// Returns `true` for an empty list, which RFC 6570 treats as undefined.
    #[must_use]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::List(items) if items.is_empty())
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(value) => f.write_str(value),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Uuid(value) => write!(f, "{value}"),
            Self::DateTime(value) => f.write_str(&value.to_rfc3339()),
            Self::Date(value) => write!(f, "{}", value.format("%Y-%m-%d")),
            Self::Time(value) => write!(f, "{}", value.format("%H:%M:%S")),
            Self::List(items) => {
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

macro_rules! impl_from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for ParameterValue {
                fn from(value: $ty) -> Self {
                    Self::$variant(value.into())
                }
            }
        )*
    };
}

impl_from_value! {
    String => String,
    bool => Bool,
    i64 => Int,
    i32 => Int,
    u32 => Int,
    f64 => Float,
    f32 => Float,
    Uuid => Uuid,
    DateTime<FixedOffset> => DateTime,
    NaiveDate => Date,
    NaiveTime => Time,
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<DateTime<Utc>> for ParameterValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::DateTime(value.fixed_offset())
    }
}

impl<T: Into<Self>> From<Vec<T>> for ParameterValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

// ============================================================================
// Expansion
// ============================================================================

struct Operator {
    first: &'static str,
    separator: char,
    named: bool,
    if_empty: &'static str,
    allow_reserved: bool,
}

const fn operator(symbol: Option<char>) -> Option<Operator> {
    let (first, separator, named, if_empty, allow_reserved) = match symbol {
        None => ("", ',', false, "", false),
        Some('+') => ("", ',', false, "", true),
        Some('#') => ("#", ',', false, "", true),
        Some('.') => (".", '.', false, "", false),
        Some('/') => ("/", '/', false, "", false),
        Some(';') => (";", ';', true, "", false),
        Some('?') => ("?", '&', true, "=", false),
        Some('&') => ("&", '&', true, "=", false),
        Some(_) => return None,
    };
    Some(Operator {
        first,
        separator,
        named,
        if_empty,
        allow_reserved,
    })
}

enum Modifier {
    None,
    Prefix(usize),
    Explode,
}

/// Expands a URI template with the given variables.
///
/// # Errors
///
/// Returns [`Error::InvalidTemplate`] when an expression is unterminated,
/// uses an unknown operator, or has a malformed modifier.
pub fn expand_template(template: &str, variables: &HashMap<String, ParameterValue>) -> Result<String> {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        let (literal, tail) = rest.split_at(start);
        output.push_str(literal);
        let end = tail
            .find('}')
            .ok_or_else(|| Error::InvalidTemplate(format!("unterminated expression in {template}")))?;
        let expression = tail.get(1..end).unwrap_or_default();
        expand_expression(expression, variables, &mut output)?;
        rest = tail.get(end + 1..).unwrap_or_default();
    }
    output.push_str(rest);

    Ok(output)
}

fn expand_expression(
    expression: &str,
    variables: &HashMap<String, ParameterValue>,
    output: &mut String,
) -> Result<()> {
    let mut chars = expression.chars();
    let symbol = chars.next().filter(|c| !c.is_ascii_alphanumeric() && *c != '_' && *c != '%');
    let op = operator(symbol)
        .ok_or_else(|| Error::InvalidTemplate(format!("unsupported operator in {{{expression}}}")))?;
    let specs = if symbol.is_some() { chars.as_str() } else { expression };

    let mut first = true;
    for spec in specs.split(',') {
        let (name, modifier) = parse_varspec(spec)?;
        let Some(value) = variables.get(name) else {
            continue;
        };
        if value.is_undefined() {
            continue;
        }

        if first {
            output.push_str(op.first);
            first = false;
        } else {
            output.push(op.separator);
        }

        match (value, modifier) {
            (ParameterValue::List(items), Modifier::Explode) => {
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        output.push(op.separator);
                    }
                    push_named(output, &op, name, &item.to_string(), None);
                }
            }
            (ParameterValue::List(items), _) => {
                if op.named {
                    output.push_str(name);
                    output.push('=');
                }
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        output.push(',');
                    }
                    encode_into(output, &item.to_string(), op.allow_reserved);
                }
            }
            (scalar, Modifier::Prefix(length)) => {
                push_named(output, &op, name, &scalar.to_string(), Some(length));
            }
            (scalar, _) => push_named(output, &op, name, &scalar.to_string(), None),
        }
    }

    Ok(())
}

fn push_named(output: &mut String, op: &Operator, name: &str, value: &str, prefix: Option<usize>) {
    if op.named {
        output.push_str(name);
        if value.is_empty() {
            output.push_str(op.if_empty);
            return;
        }
        output.push('=');
    }
    match prefix {
        Some(length) => {
            let truncated: String = value.chars().take(length).collect();
            encode_into(output, &truncated, op.allow_reserved);
        }
        None => encode_into(output, value, op.allow_reserved),
    }
}

fn parse_varspec(spec: &str) -> Result<(&str, Modifier)> {
    let invalid = || Error::InvalidTemplate(format!("invalid variable specification {spec:?}"));

    let (name, modifier) = if let Some(name) = spec.strip_suffix('*') {
        (name, Modifier::Explode)
    } else if let Some((name, length)) = spec.split_once(':') {
        let length = length.parse::<usize>().map_err(|_| invalid())?;
        (name, Modifier::Prefix(length))
    } else {
        (spec, Modifier::None)
    };

    let valid_name = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '%'));
    if valid_name { Ok((name, modifier)) } else { Err(invalid()) }
}

fn encode_into(output: &mut String, value: &str, allow_reserved: bool) {
    if !allow_reserved {
        output.extend(utf8_percent_encode(value, UNRESERVED));
        return;
    }

    let bytes = value.as_bytes();
    let mut buf = [0_u8; 4];
    for (index, c) in value.char_indices() {
        let pct_triplet = c == '%'
            && bytes
                .get(index + 1..index + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
        if pct_triplet || RESERVED.contains(c) {
            output.push(c);
        } else {
            output.extend(utf8_percent_encode(c.encode_utf8(&mut buf), UNRESERVED));
        }
    }
}
