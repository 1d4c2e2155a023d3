//! Scalar values read from or written to a payload.
//!
//! Scalar dispatch goes through a lookup table from [`PrimitiveKind`] to an
//! extraction function, so an unsupported kind has exactly one error path.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeDelta};
use derive_more::Display;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::ParseNode;
use crate::{Error, Result};

/// Supported scalar kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum PrimitiveKind {
    /// `bool`.
    #[display("bool")]
    Bool,
    /// `u8`.
    #[display("byte")]
    Byte,
    /// `i8`.
    #[display("sbyte")]
    SignedByte,
    /// `String`.
    #[display("string")]
    String,
    /// `i32`.
    #[display("int32")]
    Int32,
    /// `f32`.
    #[display("float32")]
    Float32,
    /// `i64`.
    #[display("int64")]
    Int64,
    /// `f64`.
    #[display("float64")]
    Float64,
    /// [`Decimal`].
    #[display("decimal")]
    Decimal,
    /// [`Uuid`].
    #[display("guid")]
    Guid,
    /// Date-time with offset.
    #[display("date-time")]
    DateTime,
    /// [`TimeDelta`].
    #[display("duration")]
    Duration,
    /// [`NaiveDate`].
    #[display("date")]
    Date,
    /// [`NaiveTime`].
    #[display("time")]
    Time,
}

/// A scalar value tagged with its kind.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveValue {
    /// `bool`.
    Bool(bool),
    /// `u8`.
    Byte(u8),
    /// `i8`.
    SignedByte(i8),
    /// `String`.
    String(String),
    /// `i32`.
    Int32(i32),
    /// `f32`.
    Float32(f32),
    /// `i64`.
    Int64(i64),
    /// `f64`.
    Float64(f64),
    /// [`Decimal`].
    Decimal(Decimal),
    /// [`Uuid`].
    Guid(Uuid),
    /// Date-time with offset.
    DateTime(DateTime<FixedOffset>),
    /// [`TimeDelta`].
    Duration(TimeDelta),
    /// [`NaiveDate`].
    Date(NaiveDate),
    /// [`NaiveTime`].
    Time(NaiveTime),
}

impl PrimitiveValue {
    /// Kind of this value.
    #[must_use]
    pub const fn kind(&self) -> PrimitiveKind {
        match self {
            Self::Bool(_) => PrimitiveKind::Bool,
            Self::Byte(_) => PrimitiveKind::Byte,
            Self::SignedByte(_) => PrimitiveKind::SignedByte,
            Self::String(_) => PrimitiveKind::String,
            Self::Int32(_) => PrimitiveKind::Int32,
            Self::Float32(_) => PrimitiveKind::Float32,
            Self::Int64(_) => PrimitiveKind::Int64,
            Self::Float64(_) => PrimitiveKind::Float64,
            Self::Decimal(_) => PrimitiveKind::Decimal,
            Self::Guid(_) => PrimitiveKind::Guid,
            Self::DateTime(_) => PrimitiveKind::DateTime,
            Self::Duration(_) => PrimitiveKind::Duration,
            Self::Date(_) => PrimitiveKind::Date,
            Self::Time(_) => PrimitiveKind::Time,
        }
    }
}

/// A Rust type a scalar can be read into.
pub trait Primitive: Sized + Send + 'static {
    /// Kind requested from the parse node.
    const KIND: PrimitiveKind;

    /// Unwraps a value of the matching kind.
    fn from_value(value: PrimitiveValue) -> Option<Self>;

    /// Wraps the value for writing.
    fn into_value(self) -> PrimitiveValue;
}

macro_rules! impl_primitive {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Primitive for $ty {
                const KIND: PrimitiveKind = PrimitiveKind::$variant;

                fn from_value(value: PrimitiveValue) -> Option<Self> {
                    match value {
                        PrimitiveValue::$variant(value) => Some(value),
                        _ => None,
                    }
                }

                fn into_value(self) -> PrimitiveValue {
                    PrimitiveValue::$variant(self)
                }
            }
        )*
    };
}

impl_primitive! {
    bool => Bool,
    u8 => Byte,
    i8 => SignedByte,
    String => String,
    i32 => Int32,
    f32 => Float32,
    i64 => Int64,
    f64 => Float64,
    Decimal => Decimal,
    Uuid => Guid,
    DateTime<FixedOffset> => DateTime,
    TimeDelta => Duration,
    NaiveDate => Date,
    NaiveTime => Time,
}

type Extractor = fn(&dyn ParseNode) -> Result<Option<PrimitiveValue>>;

/// Scalar kinds a response body can be read into.
///
/// [`PrimitiveKind::Time`] is intentionally absent: it can be written and
/// read field by field, but not requested as a whole response.
const EXTRACTORS: &[(PrimitiveKind, Extractor)] = &[
    (PrimitiveKind::Bool, |node| Ok(node.bool_value()?.map(PrimitiveValue::Bool))),
    (PrimitiveKind::Byte, |node| Ok(node.u8_value()?.map(PrimitiveValue::Byte))),
    (PrimitiveKind::SignedByte, |node| {
        Ok(node.i8_value()?.map(PrimitiveValue::SignedByte))
    }),
    (PrimitiveKind::String, |node| {
        Ok(node.string_value()?.map(PrimitiveValue::String))
    }),
    (PrimitiveKind::Int32, |node| Ok(node.i32_value()?.map(PrimitiveValue::Int32))),
    (PrimitiveKind::Float32, |node| {
        Ok(node.f32_value()?.map(PrimitiveValue::Float32))
    }),
    (PrimitiveKind::Int64, |node| Ok(node.i64_value()?.map(PrimitiveValue::Int64))),
    (PrimitiveKind::Float64, |node| {
        Ok(node.f64_value()?.map(PrimitiveValue::Float64))
    }),
    (PrimitiveKind::Decimal, |node| {
        Ok(node.decimal_value()?.map(PrimitiveValue::Decimal))
    }),
    (PrimitiveKind::Guid, |node| Ok(node.uuid_value()?.map(PrimitiveValue::Guid))),
    (PrimitiveKind::DateTime, |node| {
        Ok(node.date_time_value()?.map(PrimitiveValue::DateTime))
    }),
    (PrimitiveKind::Duration, |node| {
        Ok(node.duration_value()?.map(PrimitiveValue::Duration))
    }),
    (PrimitiveKind::Date, |node| Ok(node.date_value()?.map(PrimitiveValue::Date))),
];

/// Reads a scalar of the given kind from a parse node.
///
/// # Errors
///
/// Returns [`Error::UnsupportedPrimitive`] for a kind without an extractor,
/// or the parse node's error when the value does not have the expected shape.
pub fn read_primitive(node: &dyn ParseNode, kind: PrimitiveKind) -> Result<Option<PrimitiveValue>> {
    let (_, extract) = EXTRACTORS
        .iter()
        .find(|(candidate, _)| *candidate == kind)
        .ok_or(Error::UnsupportedPrimitive { kind })?;
    extract(node)
}

/// Reads a scalar into a Rust type.
///
/// # Errors
///
/// See [`read_primitive`].
pub fn primitive_value<T: Primitive>(node: &dyn ParseNode) -> Result<Option<T>> {
    Ok(read_primitive(node, T::KIND)?.and_then(T::from_value))
}

/// Reads a collection of scalars.
///
/// Null elements are skipped.
///
/// # Errors
///
/// See [`read_primitive`].
pub fn collection_of_primitive_values<T: Primitive>(node: &dyn ParseNode) -> Result<Vec<T>> {
    let mut values = Vec::new();
    for item in node.collection_of_nodes()? {
        if let Some(value) = primitive_value::<T>(item.as_ref())? {
            values.push(value);
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::serialization::{JsonParseNodeFactory, ParseNodeFactory};

    fn node(json: &'static str) -> Box<dyn ParseNode> {
        JsonParseNodeFactory::new()
            .root_parse_node("application/json", Bytes::from_static(json.as_bytes()))
            .expect("valid JSON")
    }

    #[test]
    fn every_response_kind_but_time_has_an_extractor() {
        for kind in [
            PrimitiveKind::Bool,
            PrimitiveKind::Byte,
            PrimitiveKind::SignedByte,
            PrimitiveKind::String,
            PrimitiveKind::Int32,
            PrimitiveKind::Float32,
            PrimitiveKind::Int64,
            PrimitiveKind::Float64,
            PrimitiveKind::Decimal,
            PrimitiveKind::Guid,
            PrimitiveKind::DateTime,
            PrimitiveKind::Duration,
            PrimitiveKind::Date,
        ] {
            assert!(EXTRACTORS.iter().any(|(candidate, _)| *candidate == kind), "{kind}");
        }
    }

    #[test]
    fn unsupported_kind() {
        let err = read_primitive(node(r#""10:00:00""#).as_ref(), PrimitiveKind::Time)
            .expect_err("time is not a response kind");
        assert!(matches!(
            err,
            Error::UnsupportedPrimitive {
                kind: PrimitiveKind::Time
            }
        ));
    }

    #[test]
    fn typed_extraction() {
        assert_eq!(primitive_value::<bool>(node("true").as_ref()).expect("bool"), Some(true));
        assert_eq!(primitive_value::<i64>(node("42").as_ref()).expect("i64"), Some(42));
        assert_eq!(
            primitive_value::<String>(node(r#""hi""#).as_ref()).expect("string"),
            Some("hi".to_string())
        );
        assert_eq!(primitive_value::<i32>(node("null").as_ref()).expect("null"), None);
    }

    #[test]
    fn collection_extraction() {
        let values = collection_of_primitive_values::<i32>(node("[1, null, 3]").as_ref())
            .expect("collection");
        assert_eq!(values, vec![1, 3]);
    }

    #[test]
    fn value_kind() {
        assert_eq!(PrimitiveValue::Int32(1).kind(), PrimitiveKind::Int32);
        assert_eq!(42_i64.into_value(), PrimitiveValue::Int64(42));
    }
}
