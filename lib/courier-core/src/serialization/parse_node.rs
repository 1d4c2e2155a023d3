//! Format-agnostic payload reader.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeDelta};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::store::BackingStore;
use crate::{BoxError, Result};

/// A model that can be read from a [`ParseNode`].
pub trait Parsable: Send + Sync + 'static {
    /// Change-tracking store backing this model, if any.
    fn backing_store(&self) -> Option<&dyn BackingStore> {
        None
    }

    /// Converts an error model into an error value.
    ///
    /// Models registered in [`ErrorMappings`] return `Some`; anything else
    /// returns `None`, which makes the response a malformed error.
    fn into_error(self: Box<Self>) -> Option<BoxError> {
        None
    }
}

impl Parsable for Box<dyn Parsable> {
    fn backing_store(&self) -> Option<&dyn BackingStore> {
        (**self).backing_store()
    }

    fn into_error(self: Box<Self>) -> Option<BoxError> {
        <dyn Parsable>::into_error(*self)
    }
}

/// Creates a model from a parse node.
pub type ParsableFactory<T> = fn(&dyn ParseNode) -> Result<T>;

/// Error factories keyed by status code (`"404"`) or class (`"4XX"`, `"5XX"`).
pub type ErrorMappings = HashMap<String, ParsableFactory<Box<dyn Parsable>>>;

/// Callback run on a model once all its fields are assigned.
pub type ParsableHook = Arc<dyn Fn(&dyn Parsable) + Send + Sync>;

/// Hooks a parse node runs around model construction.
#[derive(Clone, Default)]
pub struct ParseHooks {
    after_assign: Option<ParsableHook>,
}

impl ParseHooks {
    /// Creates empty hooks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a callback run after fields are assigned, after any existing one.
    #[must_use]
    pub fn after_assign(mut self, hook: ParsableHook) -> Self {
        self.after_assign = Some(match self.after_assign.take() {
            Some(existing) => Arc::new(move |value: &dyn Parsable| {
                existing(value);
                hook(value);
            }),
            None => hook,
        });
        self
    }

    /// Runs the after-assign callback.
    pub fn run_after_assign(&self, value: &dyn Parsable) {
        if let Some(hook) = &self.after_assign {
            hook(value);
        }
    }
}

impl fmt::Debug for ParseHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseHooks")
            .field("after_assign", &self.after_assign.is_some())
            .finish()
    }
}

/// Node of a parsed payload.
///
/// Scalar getters return `Ok(None)` for a null value and an error when the
/// value has another shape.
pub trait ParseNode: Send + Sync {
    /// Child node of an object, `None` when the property is absent.
    fn child_node(&self, name: &str) -> Result<Option<Box<dyn ParseNode>>>;

    /// Elements of an array; a null value yields no element.
    fn collection_of_nodes(&self) -> Result<Vec<Box<dyn ParseNode>>>;

    /// String value.
    fn string_value(&self) -> Result<Option<String>>;
    /// Boolean value.
    fn bool_value(&self) -> Result<Option<bool>>;
    /// Unsigned byte value.
    fn u8_value(&self) -> Result<Option<u8>>;
    /// Signed byte value.
    fn i8_value(&self) -> Result<Option<i8>>;
    /// 32-bit integer value.
    fn i32_value(&self) -> Result<Option<i32>>;
    /// 64-bit integer value.
    fn i64_value(&self) -> Result<Option<i64>>;
    /// 32-bit float value.
    fn f32_value(&self) -> Result<Option<f32>>;
    /// 64-bit float value.
    fn f64_value(&self) -> Result<Option<f64>>;
    /// Decimal value.
    fn decimal_value(&self) -> Result<Option<Decimal>>;
    /// GUID value.
    fn uuid_value(&self) -> Result<Option<Uuid>>;
    /// Date-time with offset value.
    fn date_time_value(&self) -> Result<Option<DateTime<FixedOffset>>>;
    /// ISO 8601 duration value.
    fn duration_value(&self) -> Result<Option<TimeDelta>>;
    /// Date value.
    fn date_value(&self) -> Result<Option<NaiveDate>>;
    /// Time of day value.
    fn time_value(&self) -> Result<Option<NaiveTime>>;

    /// Hooks run around model construction.
    fn hooks(&self) -> &ParseHooks;

    /// Replaces the hooks; child nodes inherit them.
    fn set_hooks(&mut self, hooks: ParseHooks);
}

/// Creates root parse nodes for a content type.
pub trait ParseNodeFactory: Send + Sync + fmt::Debug {
    /// Content type handled by this factory.
    fn valid_content_type(&self) -> &str;

    /// Parses a payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the content type is not handled or the payload
    /// is not well-formed.
    fn root_parse_node(&self, content_type: &str, content: Bytes) -> Result<Box<dyn ParseNode>>;
}

/// Reads a model from a node and runs the node's after-assign hook.
///
/// # Errors
///
/// Returns the factory's error.
pub fn object_value<T: Parsable>(node: &dyn ParseNode, factory: ParsableFactory<T>) -> Result<T> {
    let value = factory(node)?;
    node.hooks().run_after_assign(&value);
    Ok(value)
}

/// Reads a collection of models.
///
/// # Errors
///
/// Returns the first factory error.
pub fn collection_of_object_values<T: Parsable>(
    node: &dyn ParseNode,
    factory: ParsableFactory<T>,
) -> Result<Vec<T>> {
    node.collection_of_nodes()?
        .iter()
        .map(|item| object_value(item.as_ref(), factory))
        .collect()
}
