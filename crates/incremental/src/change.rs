//! Structural change records.
//!
//! A `ChangeRecord` is the minimal operation a downstream mirror applies to
//! move from its prior state to the next one. Every index refers to the list
//! as it is immediately before that record is applied.

use alloc::vec::Vec;

/// A structural diff operation on an ordered collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChangeRecord<D> {
    /// `item` was inserted at `index`; later items shift up.
    Add { index: usize, item: D },
    /// The item at `from` was taken out and reinserted at `to`.
    Move { from: usize, to: usize },
    /// The item at `index` was removed; later items shift down.
    Remove { index: usize },
}

/// Discriminant of a [`ChangeRecord`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Add,
    Move,
    Remove,
}

/// An ordered group of change records flushed together.
pub type Batch<D> = Vec<ChangeRecord<D>>;

impl<D> ChangeRecord<D> {
    /// Creates an add record.
    #[inline]
    pub fn add(index: usize, item: D) -> Self {
        ChangeRecord::Add { index, item }
    }

    /// Creates a move record.
    #[inline]
    pub fn moved(from: usize, to: usize) -> Self {
        ChangeRecord::Move { from, to }
    }

    /// Creates a remove record.
    #[inline]
    pub fn remove(index: usize) -> Self {
        ChangeRecord::Remove { index }
    }

    /// Returns the kind of this record.
    pub fn kind(&self) -> ChangeKind {
        match self {
            ChangeRecord::Add { .. } => ChangeKind::Add,
            ChangeRecord::Move { .. } => ChangeKind::Move,
            ChangeRecord::Remove { .. } => ChangeKind::Remove,
        }
    }

    /// Returns the index the record acts on (the source index for moves).
    pub fn index(&self) -> usize {
        match self {
            ChangeRecord::Add { index, .. } => *index,
            ChangeRecord::Move { from, .. } => *from,
            ChangeRecord::Remove { index } => *index,
        }
    }

    /// Returns the inserted item for add records.
    pub fn item(&self) -> Option<&D> {
        match self {
            ChangeRecord::Add { item, .. } => Some(item),
            _ => None,
        }
    }

    /// Maps the carried item to a new type.
    pub fn map<U, F>(self, f: F) -> ChangeRecord<U>
    where
        F: FnOnce(D) -> U,
    {
        match self {
            ChangeRecord::Add { index, item } => ChangeRecord::Add {
                index,
                item: f(item),
            },
            ChangeRecord::Move { from, to } => ChangeRecord::Move { from, to },
            ChangeRecord::Remove { index } => ChangeRecord::Remove { index },
        }
    }
}
