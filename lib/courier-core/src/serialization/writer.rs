//! Format-agnostic payload writer.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use super::PrimitiveValue;
use crate::Result;
use crate::store::BackingStore;

/// A model that can be written by a [`SerializationWriter`].
pub trait Serializable: Send + Sync {
    /// Writes every field of the model.
    ///
    /// # Errors
    ///
    /// Returns the writer's error.
    fn serialize(&self, writer: &mut dyn SerializationWriter) -> Result<()>;

    /// Change-tracking store backing this model, if any.
    fn backing_store(&self) -> Option<&dyn BackingStore> {
        None
    }
}

/// Callback run around the serialization of a model.
pub type SerializableHook = Arc<dyn Fn(&dyn Serializable) + Send + Sync>;

/// Hooks a writer runs around each model it writes.
#[derive(Clone, Default)]
pub struct SerializationHooks {
    before_object: Option<SerializableHook>,
    after_object: Option<SerializableHook>,
}

impl SerializationHooks {
    /// Creates empty hooks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a callback run before a model is written.
    #[must_use]
    pub fn before_object(mut self, hook: SerializableHook) -> Self {
        self.before_object = Some(chain(self.before_object.take(), hook));
        self
    }

    /// Adds a callback run after a model is written.
    #[must_use]
    pub fn after_object(mut self, hook: SerializableHook) -> Self {
        self.after_object = Some(chain(self.after_object.take(), hook));
        self
    }

    /// Runs the before-object callback.
    pub fn run_before(&self, value: &dyn Serializable) {
        if let Some(hook) = &self.before_object {
            hook(value);
        }
    }

    /// Runs the after-object callback.
    pub fn run_after(&self, value: &dyn Serializable) {
        if let Some(hook) = &self.after_object {
            hook(value);
        }
    }
}

fn chain(existing: Option<SerializableHook>, hook: SerializableHook) -> SerializableHook {
    match existing {
        Some(existing) => Arc::new(move |value: &dyn Serializable| {
            existing(value);
            hook(value);
        }),
        None => hook,
    }
}

impl fmt::Debug for SerializationHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializationHooks")
            .field("before_object", &self.before_object.is_some())
            .field("after_object", &self.after_object.is_some())
            .finish()
    }
}

/// Writes a payload value by value.
///
/// A `None` key writes a root value or a collection element.
pub trait SerializationWriter: Send {
    /// Writes a scalar.
    fn write_primitive_value(&mut self, key: Option<&str>, value: &PrimitiveValue) -> Result<()>;

    /// Writes an explicit null.
    fn write_null_value(&mut self, key: Option<&str>) -> Result<()>;

    /// Writes a model; `None` writes nothing.
    fn write_object_value(&mut self, key: Option<&str>, value: Option<&dyn Serializable>) -> Result<()>;

    /// Writes a collection of models.
    fn write_collection_of_object_values(
        &mut self,
        key: Option<&str>,
        values: &[&dyn Serializable],
    ) -> Result<()>;

    /// Writes a collection of scalars.
    fn write_collection_of_primitive_values(
        &mut self,
        key: Option<&str>,
        values: &[PrimitiveValue],
    ) -> Result<()>;

    /// Writes an optional string; `None` writes nothing.
    fn write_string_value(&mut self, key: Option<&str>, value: Option<&str>) -> Result<()> {
        match value {
            Some(value) => self.write_primitive_value(key, &PrimitiveValue::String(value.to_string())),
            None => Ok(()),
        }
    }

    /// Writes an optional scalar; `None` writes nothing.
    fn write_optional_value(&mut self, key: Option<&str>, value: Option<PrimitiveValue>) -> Result<()> {
        match value {
            Some(value) => self.write_primitive_value(key, &value),
            None => Ok(()),
        }
    }

    /// Returns the payload written so far.
    fn serialized_content(&mut self) -> Result<Bytes>;

    /// Hooks run around each model.
    fn hooks(&self) -> &SerializationHooks;

    /// Replaces the hooks.
    fn set_hooks(&mut self, hooks: SerializationHooks);
}

/// Creates serialization writers for a content type.
pub trait SerializationWriterFactory: Send + Sync + fmt::Debug {
    /// Content type handled by this factory.
    fn valid_content_type(&self) -> &str;

    /// Creates a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if the content type is not handled.
    fn serialization_writer(&self, content_type: &str) -> Result<Box<dyn SerializationWriter>>;
}
