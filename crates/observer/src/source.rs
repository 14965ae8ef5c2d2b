//! In-memory live query source.
//!
//! `LocalCollection` is an ordered collection that can be observed like any
//! other live query. Every mutation is reported to registered observers and
//! then marks the collection's dependency as changed, which is what lets a
//! flush computation that called `fetch()` re-run.

use crate::live_query::{LiveQuery, ObserveCallbacks, ObserveHandle};
use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::RefCell;
use livemirror_core::{Error, Result};
use livemirror_reactive::{Dependency, Scheduler};

type ObserverId = u64;

struct SourceState<D> {
    docs: Vec<D>,
    observers: Vec<(ObserverId, Rc<dyn ObserveCallbacks<D>>)>,
    next_observer: ObserverId,
}

/// An ordered in-memory collection that acts as a live query.
pub struct LocalCollection<D> {
    state: Rc<RefCell<SourceState<D>>>,
    dependency: Dependency,
}

impl<D> Clone for LocalCollection<D> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            dependency: self.dependency.clone(),
        }
    }
}

impl<D: Clone + 'static> LocalCollection<D> {
    /// Creates an empty collection whose changes are tracked by `scheduler`.
    pub fn new(scheduler: &dyn Scheduler) -> Self {
        Self {
            state: Rc::new(RefCell::new(SourceState {
                docs: Vec::new(),
                observers: Vec::new(),
                next_observer: 1,
            })),
            dependency: scheduler.dependency(),
        }
    }

    /// Creates a collection pre-filled with `docs`.
    pub fn from_docs(scheduler: &dyn Scheduler, docs: Vec<D>) -> Self {
        let collection = Self::new(scheduler);
        collection.state.borrow_mut().docs = docs;
        collection
    }

    /// Returns a live query over the whole collection.
    pub fn cursor(&self) -> Box<dyn LiveQuery<D>> {
        Box::new(LocalCursor {
            source: self.clone(),
        })
    }

    /// Returns a copy of the current contents.
    pub fn docs(&self) -> Vec<D> {
        self.state.borrow().docs.clone()
    }

    /// Returns the number of documents.
    pub fn len(&self) -> usize {
        self.state.borrow().docs.len()
    }

    /// Returns true if the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.state.borrow().docs.is_empty()
    }

    /// Returns the number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.state.borrow().observers.len()
    }

    fn observers(&self) -> Vec<Rc<dyn ObserveCallbacks<D>>> {
        self.state
            .borrow()
            .observers
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect()
    }

    /// Inserts `doc` at `index`.
    pub fn insert_at(&self, index: usize, doc: D) -> Result<()> {
        {
            let mut state = self.state.borrow_mut();
            let len = state.docs.len();
            if index > len {
                return Err(Error::index_out_of_bounds(index, len));
            }
            state.docs.insert(index, doc.clone());
        }
        for observer in self.observers() {
            observer.added_at(&doc, index);
        }
        self.dependency.changed();
        Ok(())
    }

    /// Appends `doc` at the end.
    pub fn push(&self, doc: D) {
        let index = self.len();
        // Appending at `len` is always in range.
        let _ = self.insert_at(index, doc);
    }

    /// Replaces the document at `index` with a newer revision.
    pub fn update_at(&self, index: usize, doc: D) -> Result<()> {
        let old = {
            let mut state = self.state.borrow_mut();
            let len = state.docs.len();
            match state.docs.get_mut(index) {
                Some(slot) => core::mem::replace(slot, doc.clone()),
                None => return Err(Error::index_out_of_bounds(index, len)),
            }
        };
        for observer in self.observers() {
            observer.changed_at(&doc, &old, index);
        }
        self.dependency.changed();
        Ok(())
    }

    /// Moves the document at `from` to `to` (interpreted after removal).
    pub fn move_to(&self, from: usize, to: usize) -> Result<()> {
        let doc = {
            let mut state = self.state.borrow_mut();
            let len = state.docs.len();
            if from >= len {
                return Err(Error::index_out_of_bounds(from, len));
            }
            if to >= len {
                return Err(Error::index_out_of_bounds(to, len));
            }
            let doc = state.docs.remove(from);
            state.docs.insert(to, doc.clone());
            doc
        };
        for observer in self.observers() {
            observer.moved_to(&doc, from, to);
        }
        self.dependency.changed();
        Ok(())
    }

    /// Removes and returns the document at `index`.
    pub fn remove_at(&self, index: usize) -> Result<D> {
        let doc = {
            let mut state = self.state.borrow_mut();
            let len = state.docs.len();
            if index >= len {
                return Err(Error::index_out_of_bounds(index, len));
            }
            state.docs.remove(index)
        };
        for observer in self.observers() {
            observer.removed_at(&doc, index);
        }
        self.dependency.changed();
        Ok(doc)
    }
}

struct LocalCursor<D> {
    source: LocalCollection<D>,
}

impl<D: Clone + 'static> LiveQuery<D> for LocalCursor<D> {
    fn observe(&self, callbacks: Rc<dyn ObserveCallbacks<D>>) -> Result<Box<dyn ObserveHandle>> {
        let initial = self.source.docs();
        for (index, doc) in initial.iter().enumerate() {
            callbacks.added_at(doc, index);
        }

        let id = {
            let mut state = self.source.state.borrow_mut();
            let id = state.next_observer;
            state.next_observer += 1;
            state.observers.push((id, callbacks));
            id
        };
        Ok(Box::new(LocalObserveHandle {
            state: Rc::downgrade(&self.source.state),
            id,
        }))
    }

    fn fetch(&self) -> Vec<D> {
        self.source.dependency.depend();
        self.source.docs()
    }
}

struct LocalObserveHandle<D> {
    state: Weak<RefCell<SourceState<D>>>,
    id: ObserverId,
}

impl<D> ObserveHandle for LocalObserveHandle<D> {
    fn stop(&mut self) {
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let removed = {
            let mut state = state.borrow_mut();
            let position = state.observers.iter().position(|(id, _)| *id == self.id);
            position.map(|i| state.observers.remove(i))
        };
        drop(removed);
    }
}
