//! Observer adapter.
//!
//! `QueryObserver` receives a live query's structural callbacks, applies each
//! one to its materialized collection and appends the matching change record
//! to its pending log. Both are owned by the adapter and only touched from
//! callbacks and flushes running inside the scheduler.

use crate::live_query::{LiveQuery, ObserveCallbacks, ObserveHandle};
use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use livemirror_core::{Document, Result};
use livemirror_incremental::{Batch, ChangeRecord, MaterializedCollection, PendingChangeLog};

struct AdapterState<D> {
    docs: MaterializedCollection<D>,
    log: PendingChangeLog<D>,
}

/// Mirrors one live query registration into a collection and a change log.
pub struct QueryObserver<D> {
    state: RefCell<AdapterState<D>>,
    registration: RefCell<Option<Box<dyn ObserveHandle>>>,
    stopped: Cell<bool>,
}

impl<D: Document + 'static> QueryObserver<D> {
    /// Creates an adapter that is not yet registered with any query.
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            state: RefCell::new(AdapterState {
                docs: MaterializedCollection::new(),
                log: PendingChangeLog::new(),
            }),
            registration: RefCell::new(None),
            stopped: Cell::new(false),
        })
    }

    /// Registers this adapter's callbacks with `query`.
    ///
    /// The query's current result arrives as `added_at` calls before this
    /// returns. On error nothing is registered and the adapter should be
    /// discarded.
    pub fn attach(self: &Rc<Self>, query: &dyn LiveQuery<D>) -> Result<()> {
        let callbacks: Rc<dyn ObserveCallbacks<D>> = self.clone();
        let handle = query.observe(callbacks)?;
        let previous = self.registration.borrow_mut().replace(handle);
        if let Some(mut previous) = previous {
            previous.stop();
        }
        Ok(())
    }
}

impl<D> QueryObserver<D> {
    /// Unregisters from the live query. Later callbacks are ignored.
    ///
    /// Idempotent.
    pub fn stop(&self) {
        if self.stopped.replace(true) {
            return;
        }
        let registration = self.registration.borrow_mut().take();
        if let Some(mut handle) = registration {
            handle.stop();
        }
    }

    /// Returns true once [`stop`](Self::stop) has been called.
    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.stopped.get()
    }

    /// Swaps the pending log for an empty one and returns its records.
    pub fn take_pending(&self) -> Batch<D> {
        self.state.borrow_mut().log.take()
    }

    /// Returns the number of records waiting to be flushed.
    pub fn pending_len(&self) -> usize {
        self.state.borrow().log.len()
    }

    /// Empties the collection.
    ///
    /// Returns every record not yet flushed, followed by one remove record
    /// per materialized item in descending index order.
    pub fn teardown(&self) -> Batch<D> {
        let mut state = self.state.borrow_mut();
        let mut batch = state.log.take();
        batch.extend(state.docs.drain_descending());
        batch
    }

    /// Empties the collection and the log without producing records.
    pub fn clear(&self) {
        let mut state = self.state.borrow_mut();
        state.docs.clear();
        state.log.clear();
    }

    /// Returns the number of materialized items.
    pub fn len(&self) -> usize {
        self.state.borrow().docs.len()
    }

    /// Returns true if nothing is materialized.
    pub fn is_empty(&self) -> bool {
        self.state.borrow().docs.is_empty()
    }

    /// Runs `f` against the materialized collection.
    pub fn with_docs<R>(&self, f: impl FnOnce(&MaterializedCollection<D>) -> R) -> R {
        f(&self.state.borrow().docs)
    }
}

impl<D: Clone> QueryObserver<D> {
    /// Returns a copy of the materialized items.
    pub fn docs(&self) -> Vec<D> {
        self.state.borrow().docs.to_vec()
    }
}

impl<D: Document> ObserveCallbacks<D> for QueryObserver<D> {
    fn added_at(&self, doc: &D, index: usize) {
        if self.stopped.get() {
            return;
        }
        let mut state = self.state.borrow_mut();
        match state.docs.insert_at(index, doc.clone()) {
            Ok(()) => {
                tracing::trace!(index, "added");
                state.log.push(ChangeRecord::add(index, doc.clone()));
            }
            Err(err) => tracing::warn!(%err, "ignoring added_at"),
        }
    }

    fn changed_at(&self, new_doc: &D, _old_doc: &D, index: usize) {
        if self.stopped.get() {
            return;
        }
        // Content updates are applied in place and carry no structural record.
        match self.state.borrow_mut().docs.update_at(index, new_doc) {
            Ok(()) => tracing::trace!(index, "changed"),
            Err(err) => tracing::warn!(%err, "ignoring changed_at"),
        }
    }

    fn moved_to(&self, _doc: &D, from: usize, to: usize) {
        if self.stopped.get() {
            return;
        }
        let mut state = self.state.borrow_mut();
        match state.docs.move_to(from, to) {
            Ok(()) => {
                tracing::trace!(from, to, "moved");
                state.log.push(ChangeRecord::moved(from, to));
            }
            Err(err) => tracing::warn!(%err, "ignoring moved_to"),
        }
    }

    fn removed_at(&self, _doc: &D, index: usize) {
        if self.stopped.get() {
            return;
        }
        let mut state = self.state.borrow_mut();
        match state.docs.remove_at(index) {
            Ok(_) => {
                tracing::trace!(index, "removed");
                state.log.push(ChangeRecord::remove(index));
            }
            Err(err) => tracing::warn!(%err, "ignoring removed_at"),
        }
    }
}
