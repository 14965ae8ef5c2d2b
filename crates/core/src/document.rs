//! Documents mirrored from a live query.
//!
//! A materialized collection is generic over [`Document`]; [`Doc`] is the
//! schemaless document type used by the in-memory source and most tests.

use crate::value::Value;
use alloc::collections::BTreeMap;
use alloc::string::String;
use core::fmt::Debug;

/// Identifier of a [`Doc`].
pub type DocId = String;

/// An item that can be mirrored by a materialized collection.
///
/// The key identifies the same logical document across updates. When a source
/// reports a change at an index whose current item has the same key, the
/// update is merged into the existing item; otherwise the item is replaced.
pub trait Document: Clone {
    /// Stable identity of the document.
    type Key: PartialEq + Debug;

    /// Returns the identity of this document.
    fn key(&self) -> Self::Key;

    /// Merges the fields of a newer revision of the same document into `self`.
    fn merge_from(&mut self, newer: &Self);
}

/// A schemaless document with an id and named fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Doc {
    id: DocId,
    fields: BTreeMap<String, Value>,
}

impl Doc {
    /// Creates an empty document with the given id.
    pub fn new(id: impl Into<DocId>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Returns the document with `name` set to `value`.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Returns the document id.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Gets a field value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Sets a field value, returning the previous one.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }

    /// Removes a field, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    /// Iterates over fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of fields.
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the document has no fields.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Document for Doc {
    type Key = DocId;

    fn key(&self) -> DocId {
        self.id.clone()
    }

    fn merge_from(&mut self, newer: &Self) {
        for (name, value) in &newer.fields {
            self.fields.insert(name.clone(), value.clone());
        }
    }
}

/// Plain strings are their own key; merging replaces the value.
impl Document for String {
    type Key = String;

    fn key(&self) -> String {
        self.clone()
    }

    fn merge_from(&mut self, newer: &Self) {
        self.clone_from(newer);
    }
}
