//! Backing store: change tracking for models.
//!
//! A model backed by a [`BackingStore`] keeps its field values in the store,
//! which records which values changed since initialisation. Enabling the
//! backing store on an adapter wraps its factories with
//! [`BackingStoreParseNodeFactory`] and [`BackingStoreSerializationWriterFactory`],
//! so that deserialized models start clean and only changed values are
//! written back.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use bytes::Bytes;

use crate::Result;
use crate::serialization::{
    ParseNode, ParseNodeFactory, Parsable, Serializable, SerializationWriter,
    SerializationWriterFactory,
};

/// Value held by a backing store.
pub type StoredValue = Arc<dyn Any + Send + Sync>;

/// Change-tracking key/value store.
pub trait BackingStore: Send + Sync + fmt::Debug {
    /// Value of a key; `None` when absent, or unchanged while only changed
    /// values are returned.
    fn get(&self, key: &str) -> Option<StoredValue>;

    /// Sets a value, marking it changed once initialisation is completed.
    fn set(&self, key: &str, value: Option<StoredValue>);

    /// Entries, honouring [`Self::return_only_changed_values`].
    fn enumerate(&self) -> Vec<(String, Option<StoredValue>)>;

    /// Keys whose value changed to `None`.
    fn keys_changed_to_none(&self) -> Vec<String>;

    /// Removes every entry.
    fn clear(&self);

    /// Returns `true` once the model is fully initialised.
    fn is_initialization_completed(&self) -> bool;

    /// Marks initialisation as completed; completing resets change flags.
    fn set_initialization_completed(&self, completed: bool);

    /// Returns `true` when reads only see changed values.
    fn return_only_changed_values(&self) -> bool;

    /// Restricts reads to changed values.
    fn set_return_only_changed_values(&self, only_changed: bool);
}

impl dyn BackingStore + '_ {
    /// Typed read of a value.
    #[must_use]
    pub fn get_as<T: Any + Send + Sync + Clone>(&self, key: &str) -> Option<T> {
        self.get(key)?.downcast_ref::<T>().cloned()
    }

    /// Typed write of a value.
    pub fn set_value<T: Any + Send + Sync>(&self, key: &str, value: Option<T>) {
        self.set(key, value.map(|value| Arc::new(value) as StoredValue));
    }
}

#[derive(Debug)]
struct Entry {
    changed: bool,
    value: Option<StoredValue>,
}

/// In-memory [`BackingStore`].
#[derive(Debug, Default)]
pub struct InMemoryBackingStore {
    entries: Mutex<HashMap<String, Entry>>,
    initialization_completed: AtomicBool,
    return_only_changed_values: AtomicBool,
}

impl InMemoryBackingStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entries<R>(&self, f: impl FnOnce(&mut HashMap<String, Entry>) -> R) -> R {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut entries)
    }
}

impl BackingStore for InMemoryBackingStore {
    fn get(&self, key: &str) -> Option<StoredValue> {
        let only_changed = self.return_only_changed_values();
        self.with_entries(|entries| {
            let entry = entries.get(key)?;
            if only_changed && !entry.changed {
                return None;
            }
            entry.value.clone()
        })
    }

    fn set(&self, key: &str, value: Option<StoredValue>) {
        let changed = self.is_initialization_completed();
        self.with_entries(|entries| {
            entries.insert(key.to_string(), Entry { changed, value });
        });
    }

    fn enumerate(&self) -> Vec<(String, Option<StoredValue>)> {
        let only_changed = self.return_only_changed_values();
        self.with_entries(|entries| {
            entries
                .iter()
                .filter(|(_, entry)| !only_changed || entry.changed)
                .map(|(key, entry)| (key.clone(), entry.value.clone()))
                .collect()
        })
    }

    fn keys_changed_to_none(&self) -> Vec<String> {
        self.with_entries(|entries| {
            entries
                .iter()
                .filter(|(_, entry)| entry.changed && entry.value.is_none())
                .map(|(key, _)| key.clone())
                .collect()
        })
    }

    fn clear(&self) {
        self.with_entries(HashMap::clear);
    }

    fn is_initialization_completed(&self) -> bool {
        self.initialization_completed.load(Ordering::Acquire)
    }

    fn set_initialization_completed(&self, completed: bool) {
        self.initialization_completed
            .store(completed, Ordering::Release);
        if completed {
            self.with_entries(|entries| {
                for entry in entries.values_mut() {
                    entry.changed = false;
                }
            });
        }
    }

    fn return_only_changed_values(&self) -> bool {
        self.return_only_changed_values.load(Ordering::Acquire)
    }

    fn set_return_only_changed_values(&self, only_changed: bool) {
        self.return_only_changed_values
            .store(only_changed, Ordering::Release);
    }
}

/// Creates backing stores for new models.
pub trait BackingStoreFactory: Send + Sync + fmt::Debug {
    /// Creates an empty store.
    fn create_backing_store(&self) -> Box<dyn BackingStore>;
}

/// Creates [`InMemoryBackingStore`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct InMemoryBackingStoreFactory;

impl BackingStoreFactory for InMemoryBackingStoreFactory {
    fn create_backing_store(&self) -> Box<dyn BackingStore> {
        Box::new(InMemoryBackingStore::new())
    }
}

/// Shared, replaceable backing-store factory.
///
/// Starts with the in-memory factory. Clones share the same slot, so a
/// replacement is seen by every holder.
#[derive(Clone)]
pub struct BackingStoreFactorySlot {
    inner: Arc<ArcSwap<Arc<dyn BackingStoreFactory>>>,
}

impl BackingStoreFactorySlot {
    /// Creates a slot holding the in-memory factory.
    #[must_use]
    pub fn new() -> Self {
        Self::with_factory(Arc::new(InMemoryBackingStoreFactory))
    }

    /// Creates a slot holding the given factory.
    #[must_use]
    pub fn with_factory(factory: Arc<dyn BackingStoreFactory>) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(factory)),
        }
    }

    /// Current factory.
    #[must_use]
    pub fn current(&self) -> Arc<dyn BackingStoreFactory> {
        Arc::clone(&**self.inner.load())
    }

    /// Replaces the factory for every holder of the slot.
    pub fn replace(&self, factory: Arc<dyn BackingStoreFactory>) {
        self.inner.store(Arc::new(factory));
    }

    /// Creates a store with the current factory.
    #[must_use]
    pub fn create_backing_store(&self) -> Box<dyn BackingStore> {
        self.current().create_backing_store()
    }
}

impl Default for BackingStoreFactorySlot {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BackingStoreFactorySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BackingStoreFactorySlot")
            .field(&self.current())
            .finish()
    }
}

// ============================================================================
// Backing-store aware factories
// ============================================================================

/// Parse-node factory marking backed models initialised once parsed.
#[derive(Debug, Clone)]
pub struct BackingStoreParseNodeFactory {
    inner: Arc<dyn ParseNodeFactory>,
}

impl BackingStoreParseNodeFactory {
    /// Wraps a factory.
    #[must_use]
    pub fn new(inner: Arc<dyn ParseNodeFactory>) -> Self {
        Self { inner }
    }
}

impl ParseNodeFactory for BackingStoreParseNodeFactory {
    fn valid_content_type(&self) -> &str {
        self.inner.valid_content_type()
    }

    fn root_parse_node(&self, content_type: &str, content: Bytes) -> Result<Box<dyn ParseNode>> {
        let mut node = self.inner.root_parse_node(content_type, content)?;
        let hooks = node.hooks().clone().after_assign(Arc::new(mark_initialized));
        node.set_hooks(hooks);
        Ok(node)
    }
}

/// Writer factory serializing only the changed values of backed models.
#[derive(Debug, Clone)]
pub struct BackingStoreSerializationWriterFactory {
    inner: Arc<dyn SerializationWriterFactory>,
}

impl BackingStoreSerializationWriterFactory {
    /// Wraps a factory.
    #[must_use]
    pub fn new(inner: Arc<dyn SerializationWriterFactory>) -> Self {
        Self { inner }
    }
}

impl SerializationWriterFactory for BackingStoreSerializationWriterFactory {
    fn valid_content_type(&self) -> &str {
        self.inner.valid_content_type()
    }

    fn serialization_writer(&self, content_type: &str) -> Result<Box<dyn SerializationWriter>> {
        let mut writer = self.inner.serialization_writer(content_type)?;
        let hooks = writer
            .hooks()
            .clone()
            .before_object(Arc::new(write_changed_only))
            .after_object(Arc::new(mark_written));
        writer.set_hooks(hooks);
        Ok(writer)
    }
}

fn mark_initialized(value: &dyn Parsable) {
    if let Some(store) = value.backing_store() {
        store.set_initialization_completed(true);
    }
}

fn write_changed_only(value: &dyn Serializable) {
    if let Some(store) = value.backing_store() {
        store.set_return_only_changed_values(true);
    }
}

fn mark_written(value: &dyn Serializable) {
    if let Some(store) = value.backing_store() {
        store.set_return_only_changed_values(false);
        store.set_initialization_completed(true);
    }
}
