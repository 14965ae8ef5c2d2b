//! Outgoing notifications.
//!
//! The observer does not own an emitter. It is handed an [`EventSink`] and
//! publishes through it; [`Listeners`] is the registry used when the caller
//! does not bring its own sink.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use livemirror_core::Result;
use livemirror_incremental::{Batch, ChangeRecord};

/// A notification published by a collection observer.
#[derive(Debug, PartialEq, Eq)]
pub enum MirrorEvent<'a, D> {
    /// A (re)subscription finished and is now active.
    NewSubscription,
    /// A non-empty batch of change records was flushed.
    Batch(&'a [ChangeRecord<D>]),
}

impl<D> MirrorEvent<'_, D> {
    /// Returns the event name.
    pub fn name(&self) -> &'static str {
        match self {
            MirrorEvent::NewSubscription => "newSubscription",
            MirrorEvent::Batch(_) => "batch",
        }
    }
}

/// Capability to publish events.
pub trait EventSink<D> {
    /// Delivers `event`. An error is returned to whoever triggered the event.
    fn emit(&self, event: MirrorEvent<'_, D>) -> Result<()>;
}

/// Unique identifier for a registered listener.
pub type ListenerId = u64;

/// Callback invoked with every flushed batch.
pub type BatchCallback<D> = Box<dyn Fn(&[ChangeRecord<D>]) -> Result<()>>;

/// Callback invoked after every (re)subscription.
pub type SubscriptionCallback = Box<dyn Fn() -> Result<()>>;

enum Listener<D> {
    Batch(BatchCallback<D>),
    NewSubscription(SubscriptionCallback),
}

/// Registry of event listeners.
///
/// Listeners run in registration order. The first failing listener stops
/// delivery of that event and its error is returned.
pub struct Listeners<D> {
    listeners: RefCell<Vec<(ListenerId, Rc<Listener<D>>)>>,
    next_id: Cell<ListenerId>,
}

impl<D> Default for Listeners<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> Listeners<D> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            listeners: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
        }
    }

    fn register(&self, listener: Listener<D>) -> ListenerId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.listeners.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    /// Registers a batch listener.
    pub fn on_batch<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&[ChangeRecord<D>]) -> Result<()> + 'static,
    {
        self.register(Listener::Batch(Box::new(callback)))
    }

    /// Registers a new-subscription listener.
    pub fn on_new_subscription<F>(&self, callback: F) -> ListenerId
    where
        F: Fn() -> Result<()> + 'static,
    {
        self.register(Listener::NewSubscription(Box::new(callback)))
    }

    /// Unregisters a listener.
    ///
    /// Returns true if the listener was found and removed.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    /// Returns the number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Returns true if no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.borrow().is_empty()
    }

    /// Removes every listener.
    pub fn clear(&self) {
        let listeners = core::mem::take(&mut *self.listeners.borrow_mut());
        drop(listeners);
    }
}

impl<D> EventSink<D> for Listeners<D> {
    fn emit(&self, event: MirrorEvent<'_, D>) -> Result<()> {
        // Snapshot so listeners may register or unregister while running
        let snapshot: Vec<Rc<Listener<D>>> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| l.clone())
            .collect();

        for listener in snapshot {
            match (&event, &*listener) {
                (MirrorEvent::Batch(records), Listener::Batch(cb)) => cb(*records)?,
                (MirrorEvent::NewSubscription, Listener::NewSubscription(cb)) => cb()?,
                _ => {}
            }
        }
        Ok(())
    }
}

/// Publishes batches and remembers the most recent one.
pub(crate) struct BatchOutlet<D> {
    sink: Rc<dyn EventSink<D>>,
    last_batch: RefCell<Rc<Batch<D>>>,
}

impl<D> BatchOutlet<D> {
    pub(crate) fn new(sink: Rc<dyn EventSink<D>>) -> Self {
        Self {
            sink,
            last_batch: RefCell::new(Rc::new(Batch::new())),
        }
    }

    /// Records `batch` as the last batch and emits it if non-empty.
    ///
    /// The last batch is updated before emission, so it reflects the batch
    /// even when a listener fails.
    pub(crate) fn publish(&self, batch: Batch<D>) -> Result<()> {
        let batch = Rc::new(batch);
        *self.last_batch.borrow_mut() = batch.clone();
        if batch.is_empty() {
            return Ok(());
        }
        tracing::debug!(records = batch.len(), "flushing batch");
        self.sink.emit(MirrorEvent::Batch(batch.as_slice()))
    }

    pub(crate) fn notify_new_subscription(&self) -> Result<()> {
        self.sink.emit(MirrorEvent::NewSubscription)
    }

    pub(crate) fn last_batch(&self) -> Rc<Batch<D>> {
        self.last_batch.borrow().clone()
    }

    pub(crate) fn reset(&self) {
        *self.last_batch.borrow_mut() = Rc::new(Batch::new());
    }
}
