//! livemirror Core - Shared types for the livemirror workspace.
//!
//! This crate provides the foundational types used by every other crate:
//!
//! - `Document`: Trait for items that can be mirrored (stable key + merge)
//! - `Doc`: A schemaless document with an id and named fields
//! - `Value`: Dynamic values stored in document fields and reactive properties
//! - `Error`: Error types for materialization and subscription operations
//!
//! # Example
//!
//! ```rust
//! use livemirror_core::{Doc, Document, Value};
//!
//! let mut doc = Doc::new("u1").with("name", "Alice").with("age", 30i64);
//! doc.merge_from(&Doc::new("u1").with("age", 31i64));
//!
//! assert_eq!(doc.key(), "u1");
//! assert_eq!(doc.get("age"), Some(&Value::Int64(31)));
//! assert_eq!(doc.get("name"), Some(&Value::from("Alice")));
//! ```

#![no_std]

extern crate alloc;

mod document;
mod error;
mod value;

pub use document::{Doc, DocId, Document};
pub use error::{Error, Result};
pub use value::Value;
