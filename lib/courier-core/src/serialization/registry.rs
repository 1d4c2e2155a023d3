//! Factory registries keyed by content type.
//!
//! Vendor-specific types are normalised to their base type before lookup:
//! `application/vnd.github.v3+json` is served by the `application/json`
//! factory.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use bytes::Bytes;
use regex::Regex;

use super::{
    JsonParseNodeFactory, JsonSerializationWriterFactory, ParseNode, ParseNodeFactory,
    SerializationWriter, SerializationWriterFactory,
};
use crate::{Error, Result};

static VENDOR_PREFIX: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"[^/]+\+").ok());

/// Lowercases a content type, drops its parameters and vendor prefix.
#[must_use]
pub fn normalize_content_type(content_type: &str) -> String {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match VENDOR_PREFIX.as_ref() {
        Some(vendor) => vendor.replace(&media_type, "").into_owned(),
        None => media_type,
    }
}

/// Parse-node factories keyed by content type.
#[derive(Debug, Clone, Default)]
pub struct ParseNodeFactoryRegistry {
    factories: HashMap<String, Arc<dyn ParseNodeFactory>>,
}

impl ParseNodeFactoryRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory under its content type.
    pub fn register(&mut self, factory: Arc<dyn ParseNodeFactory>) -> &mut Self {
        self.factories
            .insert(factory.valid_content_type().to_ascii_lowercase(), factory);
        self
    }

    /// Returns `true` if a factory serves this content type.
    #[must_use]
    pub fn contains(&self, content_type: &str) -> bool {
        self.factories
            .contains_key(&normalize_content_type(content_type))
    }
}

impl ParseNodeFactory for ParseNodeFactoryRegistry {
    fn valid_content_type(&self) -> &str {
        ""
    }

    fn root_parse_node(&self, content_type: &str, content: Bytes) -> Result<Box<dyn ParseNode>> {
        let normalized = normalize_content_type(content_type);
        let factory = self.factories.get(&normalized).ok_or_else(|| {
            Error::deserialization(format!(
                "content type {normalized} does not have a factory registered to be parsed"
            ))
        })?;
        factory.root_parse_node(&normalized, content)
    }
}

/// Serialization-writer factories keyed by content type.
#[derive(Debug, Clone, Default)]
pub struct SerializationWriterFactoryRegistry {
    factories: HashMap<String, Arc<dyn SerializationWriterFactory>>,
}

impl SerializationWriterFactoryRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory under its content type.
    pub fn register(&mut self, factory: Arc<dyn SerializationWriterFactory>) -> &mut Self {
        self.factories
            .insert(factory.valid_content_type().to_ascii_lowercase(), factory);
        self
    }
}

impl SerializationWriterFactory for SerializationWriterFactoryRegistry {
    fn valid_content_type(&self) -> &str {
        ""
    }

    fn serialization_writer(&self, content_type: &str) -> Result<Box<dyn SerializationWriter>> {
        let normalized = normalize_content_type(content_type);
        let factory = self.factories.get(&normalized).ok_or_else(|| {
            Error::serialization(format!(
                "content type {normalized} does not have a factory registered to be serialized"
            ))
        })?;
        factory.serialization_writer(&normalized)
    }
}

/// Parse-node registry with the JSON factory registered.
#[must_use]
pub fn default_parse_node_factory() -> ParseNodeFactoryRegistry {
    let mut registry = ParseNodeFactoryRegistry::new();
    registry.register(Arc::new(JsonParseNodeFactory::new()));
    registry
}

/// Writer registry with the JSON factory registered.
#[must_use]
pub fn default_serialization_writer_factory() -> SerializationWriterFactoryRegistry {
    let mut registry = SerializationWriterFactoryRegistry::new();
    registry.register(Arc::new(JsonSerializationWriterFactory::new()));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_types_are_normalized() {
        assert_eq!(
            normalize_content_type("application/vnd.github.v3+json"),
            "application/json"
        );
        assert_eq!(
            normalize_content_type("Application/JSON; charset=utf-8"),
            "application/json"
        );
        assert_eq!(normalize_content_type("text/plain"), "text/plain");
    }

    #[test]
    fn registry_dispatches_by_content_type() {
        let registry = default_parse_node_factory();
        assert!(registry.contains("application/vnd.api+json"));
        assert!(!registry.contains("text/csv"));

        let node = registry
            .root_parse_node("application/vnd.api+json", Bytes::from_static(b"12"))
            .expect("json factory");
        assert_eq!(node.i32_value().expect("int"), Some(12));
    }

    #[test]
    fn unknown_content_type_fails() {
        let registry = default_parse_node_factory();
        let err = registry
            .root_parse_node("text/csv", Bytes::from_static(b"a,b"))
            .err()
            .expect("no csv factory");
        assert!(matches!(err, Error::Deserialization(_)));

        let writers = default_serialization_writer_factory();
        assert!(writers.serialization_writer("text/csv").is_err());
        assert!(writers.serialization_writer("application/json").is_ok());
    }
}
