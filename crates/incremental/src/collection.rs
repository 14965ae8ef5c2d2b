//! Materialized collection.
//!
//! An ordered, index-addressable mirror of a live query's result. It is
//! mutated only through structural operations, each of which has a matching
//! [`ChangeRecord`], so replaying every record emitted since creation onto an
//! empty collection reproduces the current contents.

use crate::change::{Batch, ChangeRecord};
use alloc::vec::Vec;
use livemirror_core::{Document, Error, Result};

/// Ordered mirror of a live query result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaterializedCollection<D> {
    items: Vec<D>,
}

impl<D> Default for MaterializedCollection<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> MaterializedCollection<D> {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Creates a collection from existing items.
    pub fn from_items(items: Vec<D>) -> Self {
        Self { items }
    }

    /// Returns the number of items.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the collection is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the item at `index`.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&D> {
        self.items.get(index)
    }

    /// Returns the items in order.
    #[inline]
    pub fn as_slice(&self) -> &[D] {
        &self.items
    }

    /// Iterates over the items in order.
    pub fn iter(&self) -> core::slice::Iter<'_, D> {
        self.items.iter()
    }

    /// Inserts `item` at `index`, shifting later items up.
    pub fn insert_at(&mut self, index: usize, item: D) -> Result<()> {
        if index > self.items.len() {
            return Err(Error::index_out_of_bounds(index, self.items.len()));
        }
        self.items.insert(index, item);
        Ok(())
    }

    /// Moves the item at `from` so that it ends up at `to`.
    ///
    /// `to` is interpreted after the item has been taken out.
    pub fn move_to(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.items.len();
        if from >= len {
            return Err(Error::index_out_of_bounds(from, len));
        }
        if to >= len {
            return Err(Error::index_out_of_bounds(to, len));
        }
        let item = self.items.remove(from);
        self.items.insert(to, item);
        Ok(())
    }

    /// Removes and returns the item at `index`, shifting later items down.
    pub fn remove_at(&mut self, index: usize) -> Result<D> {
        if index >= self.items.len() {
            return Err(Error::index_out_of_bounds(index, self.items.len()));
        }
        Ok(self.items.remove(index))
    }

    /// Replaces the item at `index`, returning the previous one.
    pub fn replace_at(&mut self, index: usize, item: D) -> Result<D> {
        let len = self.items.len();
        match self.items.get_mut(index) {
            Some(slot) => Ok(core::mem::replace(slot, item)),
            None => Err(Error::index_out_of_bounds(index, len)),
        }
    }

    /// Removes every item and returns one remove record per item, highest
    /// index first.
    ///
    /// Applying the returned records to a mirror of this collection leaves
    /// the mirror empty.
    pub fn drain_descending(&mut self) -> Batch<D> {
        let len = self.items.len();
        self.items.clear();
        (0..len).rev().map(ChangeRecord::remove).collect()
    }

    /// Removes every item without producing records.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<D: Document> MaterializedCollection<D> {
    /// Applies a newer revision of the item at `index`.
    ///
    /// If the current item has the same key, the revision is merged into it;
    /// otherwise the item is replaced.
    pub fn update_at(&mut self, index: usize, newer: &D) -> Result<()> {
        let len = self.items.len();
        let Some(current) = self.items.get_mut(index) else {
            return Err(Error::index_out_of_bounds(index, len));
        };
        if current.key() == newer.key() {
            current.merge_from(newer);
        } else {
            *current = newer.clone();
        }
        Ok(())
    }
}

impl<D: Clone> MaterializedCollection<D> {
    /// Returns a copy of the items.
    pub fn to_vec(&self) -> Vec<D> {
        self.items.clone()
    }

    /// Applies a single change record.
    pub fn apply(&mut self, record: &ChangeRecord<D>) -> Result<()> {
        match record {
            ChangeRecord::Add { index, item } => self.insert_at(*index, item.clone()),
            ChangeRecord::Move { from, to } => self.move_to(*from, *to),
            ChangeRecord::Remove { index } => self.remove_at(*index).map(|_| ()),
        }
    }

    /// Applies records in order, stopping at the first one that does not fit.
    pub fn replay<'a>(&mut self, records: impl IntoIterator<Item = &'a ChangeRecord<D>>) -> Result<()>
    where
        D: 'a,
    {
        for record in records {
            self.apply(record)?;
        }
        Ok(())
    }
}

impl<D> From<Vec<D>> for MaterializedCollection<D> {
    fn from(items: Vec<D>) -> Self {
        Self::from_items(items)
    }
}
