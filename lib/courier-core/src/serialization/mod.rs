//! Serialization contracts.
//!
//! The adapter only sees [`ParseNodeFactory`] and
//! [`SerializationWriterFactory`]; formats plug in behind them. A JSON
//! implementation over `serde_json` is provided.

mod json;
mod parse_node;
mod primitive;
mod registry;
mod writer;

pub use json::{
    JsonParseNode, JsonParseNodeFactory, JsonSerializationWriter, JsonSerializationWriterFactory,
};
pub use parse_node::{
    ErrorMappings, ParseHooks, ParseNode, ParseNodeFactory, Parsable, ParsableFactory,
    ParsableHook, collection_of_object_values, object_value,
};
pub use primitive::{
    Primitive, PrimitiveKind, PrimitiveValue, collection_of_primitive_values, primitive_value,
    read_primitive,
};
pub use registry::{
    ParseNodeFactoryRegistry, SerializationWriterFactoryRegistry, default_parse_node_factory,
    default_serialization_writer_factory, normalize_content_type,
};
pub use writer::{
    Serializable, SerializableHook, SerializationHooks, SerializationWriter,
    SerializationWriterFactory,
};
