//! Pending change log.
//!
//! Records accumulate between flushes and are taken out as one batch with a
//! single swap, so a record is handed out exactly once.

use crate::change::{Batch, ChangeRecord};

/// Ordered buffer of change records not yet flushed.
#[derive(Clone, Debug)]
pub struct PendingChangeLog<D> {
    records: Batch<D>,
}

impl<D> Default for PendingChangeLog<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> PendingChangeLog<D> {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self {
            records: Batch::new(),
        }
    }

    /// Appends a record.
    #[inline]
    pub fn push(&mut self, record: ChangeRecord<D>) {
        self.records.push(record);
    }

    /// Appends several records in order.
    pub fn extend(&mut self, records: impl IntoIterator<Item = ChangeRecord<D>>) {
        self.records.extend(records);
    }

    /// Swaps the log for an empty one and returns its contents.
    #[inline]
    pub fn take(&mut self) -> Batch<D> {
        core::mem::take(&mut self.records)
    }

    /// Returns the number of pending records.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if nothing is pending.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Discards every pending record.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Iterates over pending records in append order.
    pub fn iter(&self) -> core::slice::Iter<'_, ChangeRecord<D>> {
        self.records.iter()
    }
}
