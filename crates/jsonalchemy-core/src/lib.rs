//! Core contracts for jsonalchemy.
//!
//! This crate defines the schema document view (`SchemaNode`), RFC 6901
//! positions, `$ref` lookup, and the error taxonomy shared by the generator
//! and the CLI.

pub mod error;
pub mod node;
pub mod pointer;
pub mod resolver;

pub use error::{Result, SchemaError};
pub use node::SchemaNode;
pub use pointer::JsonPointer;
pub use resolver::ReferenceResolver;
