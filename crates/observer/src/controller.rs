//! Re-subscription controller.
//!
//! `CollectionObserver` evaluates a query definition inside a reactive
//! computation. Whenever a value read by the definition changes, the current
//! subscription is torn down (flush computation and registration stopped,
//! every mirrored item removed) and a new one is built from a fresh
//! evaluation of the definition.
//!
//! # Example
//!
//! ```
//! use livemirror_observer::{CollectionObserver, LocalCollection};
//! use livemirror_reactive::Tracker;
//! use std::rc::Rc;
//!
//! let tracker = Rc::new(Tracker::new());
//! let source: LocalCollection<String> = LocalCollection::new(&*tracker);
//! source.push("a".to_string());
//!
//! let cursor_source = source.clone();
//! let observer = CollectionObserver::builder(move |_props| Ok(cursor_source.cursor()))
//!     .scheduler(tracker.clone())
//!     .build()
//!     .unwrap();
//!
//! source.push("b".to_string());
//! tracker.flush().unwrap();
//! assert_eq!(observer.docs(), vec!["a".to_string(), "b".to_string()]);
//! assert_eq!(observer.last_batch().len(), 1);
//! ```

use crate::adapter::QueryObserver;
use crate::events::{BatchOutlet, EventSink, ListenerId, Listeners};
use crate::flush::BatchFlusher;
use crate::live_query::{LiveQuery, QueryDefinition};
use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use livemirror_core::{Document, Error, Result, Value};
use livemirror_incremental::{Batch, ChangeRecord};
use livemirror_reactive::{autorun, Computation, Properties, Scheduler, Tracker};

/// One active live query registration: its adapter and its flush computation.
pub struct SubscriptionHandle<D> {
    query: Rc<dyn LiveQuery<D>>,
    observer: Rc<QueryObserver<D>>,
    flusher: BatchFlusher,
    generation: u64,
}

impl<D> SubscriptionHandle<D> {
    /// Stops the flush computation, then the observer registration.
    pub fn stop(&self) {
        self.flusher.stop();
        self.observer.stop();
    }

    /// Returns the sequence number of this subscription, starting at 1.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns the adapter mirroring this subscription.
    #[inline]
    pub fn observer(&self) -> &Rc<QueryObserver<D>> {
        &self.observer
    }

    /// Returns the live query this subscription observes.
    #[inline]
    pub fn query(&self) -> &Rc<dyn LiveQuery<D>> {
        &self.query
    }
}

struct Inner<D> {
    label: String,
    scheduler: Rc<dyn Scheduler>,
    definition: QueryDefinition<D>,
    properties: Rc<Properties>,
    outlet: Rc<BatchOutlet<D>>,
    listeners: Option<Rc<Listeners<D>>>,
    current: RefCell<Option<SubscriptionHandle<D>>>,
    computation: RefCell<Option<Computation>>,
    generation: Cell<u64>,
    destroyed: Cell<bool>,
}

impl<D: Document + 'static> Inner<D> {
    /// Body of the controller computation.
    fn resubscribe(&self) -> Result<()> {
        if self.destroyed.get() {
            return Ok(());
        }
        // A rejected final batch is lost, but the next subscription still
        // starts so the definition's inputs stay tracked.
        let teardown_error = self.teardown().err();
        if let Some(err) = &teardown_error {
            tracing::debug!(label = %self.label, %err, "final batch consumer failed");
        }
        if self.destroyed.get() {
            // A listener of the final batch destroyed the observer.
            return teardown_error.map_or(Ok(()), Err);
        }

        let query: Rc<dyn LiveQuery<D>> = Rc::from((self.definition)(&*self.properties)?);

        // Initial events land in a fresh adapter; if attaching fails it is
        // dropped and nothing was applied.
        let observer = QueryObserver::new();
        observer.attach(&*query)?;

        let flusher = match BatchFlusher::start(
            &*self.scheduler,
            query.clone(),
            observer.clone(),
            self.outlet.clone(),
        ) {
            Ok(flusher) => flusher,
            Err(err) => {
                observer.stop();
                return Err(err);
            }
        };

        let mut flusher = flusher;
        let initial_error = flusher.take_initial_error();
        if self.destroyed.get() {
            // A listener of the initial batch destroyed the observer.
            flusher.stop();
            observer.stop();
            return Ok(());
        }

        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        *self.current.borrow_mut() = Some(SubscriptionHandle {
            query,
            observer,
            flusher,
            generation,
        });
        tracing::debug!(label = %self.label, generation, "subscription started");

        let notified = self.outlet.notify_new_subscription();
        match teardown_error.or(initial_error) {
            Some(err) => Err(err),
            None => notified,
        }
    }

    /// Stops the current subscription and publishes its final batch.
    fn teardown(&self) -> Result<()> {
        let Some(handle) = self.current.borrow_mut().take() else {
            return Ok(());
        };
        handle.stop();
        let batch = handle.observer.teardown();
        tracing::debug!(
            label = %self.label,
            generation = handle.generation,
            records = batch.len(),
            "subscription torn down"
        );
        drop(handle);
        self.outlet.publish(batch)
    }
}

/// Mirrors a redefinable live query and publishes ordered change batches.
pub struct CollectionObserver<D> {
    inner: Rc<Inner<D>>,
}

impl<D: Document + 'static> CollectionObserver<D> {
    /// Starts configuring an observer for `definition`.
    pub fn builder<F>(definition: F) -> CollectionObserverBuilder<D>
    where
        F: Fn(&Properties) -> Result<Box<dyn LiveQuery<D>>> + 'static,
    {
        CollectionObserverBuilder::new(definition)
    }

    /// Returns a copy of the mirrored documents.
    pub fn docs(&self) -> Vec<D> {
        match self.inner.current.borrow().as_ref() {
            Some(handle) => handle.observer.docs(),
            None => Vec::new(),
        }
    }

    /// Returns the number of mirrored documents.
    pub fn len(&self) -> usize {
        self.inner
            .current
            .borrow()
            .as_ref()
            .map_or(0, |handle| handle.observer.len())
    }

    /// Returns true if nothing is mirrored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the most recently flushed batch.
    ///
    /// Empty if the latest flush found nothing to publish.
    pub fn last_batch(&self) -> Rc<Batch<D>> {
        self.inner.outlet.last_batch()
    }

    /// Returns the reactive properties the query definition can read.
    pub fn properties(&self) -> &Rc<Properties> {
        &self.inner.properties
    }

    /// Reads a reactive property.
    pub fn get(&self, name: &str) -> Result<Value> {
        self.ensure_alive()?;
        Ok(self.inner.properties.get(name))
    }

    /// Writes a reactive property. If the query definition read it, the
    /// subscription is rebuilt on the next scheduler tick.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.ensure_alive()?;
        self.inner.properties.set(name, value);
        Ok(())
    }

    /// Returns the number of subscriptions started so far.
    pub fn subscription_count(&self) -> u64 {
        self.inner.generation.get()
    }

    /// Returns true while a subscription is active.
    pub fn is_subscribed(&self) -> bool {
        self.inner.current.borrow().is_some()
    }

    /// Returns true once [`destroy`](Self::destroy) has been called.
    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.get()
    }

    /// Registers a batch listener on the built-in listener registry.
    pub fn on_batch<F>(&self, callback: F) -> Result<ListenerId>
    where
        F: Fn(&[ChangeRecord<D>]) -> Result<()> + 'static,
    {
        Ok(self.listeners()?.on_batch(callback))
    }

    /// Registers a new-subscription listener on the built-in listener registry.
    pub fn on_new_subscription<F>(&self, callback: F) -> Result<ListenerId>
    where
        F: Fn() -> Result<()> + 'static,
    {
        Ok(self.listeners()?.on_new_subscription(callback))
    }

    /// Unregisters a listener from the built-in listener registry.
    pub fn off(&self, id: ListenerId) -> bool {
        match &self.inner.listeners {
            Some(listeners) => listeners.off(id),
            None => false,
        }
    }

    fn listeners(&self) -> Result<&Rc<Listeners<D>>> {
        self.ensure_alive()?;
        self.inner.listeners.as_ref().ok_or_else(|| {
            Error::configuration("observer was built with an external event sink")
        })
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.inner.destroyed.get() {
            tracing::warn!(label = %self.inner.label, "observer used after destroy");
            return Err(Error::Destroyed);
        }
        Ok(())
    }

    /// Stops the controller and the current subscription and clears all
    /// state. No records are published. Calling it again does nothing.
    pub fn destroy(&self) {
        let inner = &self.inner;
        if inner.destroyed.replace(true) {
            return;
        }

        let computation = inner.computation.borrow_mut().take();
        if let Some(computation) = computation {
            computation.stop();
        }
        let handle = inner.current.borrow_mut().take();
        if let Some(handle) = handle {
            handle.stop();
            handle.observer.clear();
        }

        inner.properties.clear();
        if let Some(listeners) = &inner.listeners {
            listeners.clear();
        }
        inner.outlet.reset();
        tracing::debug!(label = %inner.label, "observer destroyed");
    }
}

impl<D> Drop for CollectionObserver<D> {
    fn drop(&mut self) {
        // The controller computation only holds a weak reference, but it
        // must not linger in the scheduler either.
        if let Some(computation) = self.inner.computation.borrow_mut().take() {
            computation.stop();
        }
        if let Some(handle) = self.inner.current.borrow_mut().take() {
            handle.stop();
        }
    }
}

/// Configures and starts a [`CollectionObserver`].
pub struct CollectionObserverBuilder<D> {
    definition: QueryDefinition<D>,
    scheduler: Option<Rc<dyn Scheduler>>,
    sink: Option<Rc<dyn EventSink<D>>>,
    listeners: Rc<Listeners<D>>,
    label: String,
}

impl<D: Document + 'static> CollectionObserverBuilder<D> {
    /// Creates a builder for `definition`.
    pub fn new<F>(definition: F) -> Self
    where
        F: Fn(&Properties) -> Result<Box<dyn LiveQuery<D>>> + 'static,
    {
        Self {
            definition: Box::new(definition),
            scheduler: None,
            sink: None,
            listeners: Rc::new(Listeners::new()),
            label: String::from("collection"),
        }
    }

    /// Sets the scheduler. Defaults to a private [`Tracker`].
    pub fn scheduler(mut self, scheduler: Rc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Publishes events to `sink` instead of the built-in listener registry.
    pub fn sink(mut self, sink: Rc<dyn EventSink<D>>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Sets the label used in log output.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Registers a batch listener before the first subscription starts.
    pub fn on_batch<F>(self, callback: F) -> Self
    where
        F: Fn(&[ChangeRecord<D>]) -> Result<()> + 'static,
    {
        self.listeners.on_batch(callback);
        self
    }

    /// Registers a new-subscription listener before the first subscription
    /// starts.
    pub fn on_new_subscription<F>(self, callback: F) -> Self
    where
        F: Fn() -> Result<()> + 'static,
    {
        self.listeners.on_new_subscription(callback);
        self
    }

    /// Evaluates the definition and starts the first subscription.
    ///
    /// Fails before any state is created if the definition fails or its
    /// live query cannot be observed.
    pub fn build(self) -> Result<CollectionObserver<D>> {
        let scheduler: Rc<dyn Scheduler> = match self.scheduler {
            Some(scheduler) => scheduler,
            None => Rc::new(Tracker::new()),
        };
        let listeners = match self.sink {
            Some(_) => None,
            None => Some(self.listeners.clone()),
        };
        let sink: Rc<dyn EventSink<D>> = match self.sink {
            Some(sink) => sink,
            None => self.listeners,
        };

        let inner = Rc::new(Inner {
            label: self.label,
            properties: Rc::new(Properties::new(scheduler.clone())),
            scheduler,
            definition: self.definition,
            outlet: Rc::new(BatchOutlet::new(sink)),
            listeners,
            current: RefCell::new(None),
            computation: RefCell::new(None),
            generation: Cell::new(0),
            destroyed: Cell::new(false),
        });

        let weak: Weak<Inner<D>> = Rc::downgrade(&inner);
        let computation = autorun(&*inner.scheduler, move |_| match weak.upgrade() {
            Some(inner) => inner.resubscribe(),
            None => Ok(()),
        });
        let computation = match computation {
            Ok(computation) => computation,
            Err(err) => {
                tracing::debug!(label = %inner.label, %err, "initial subscription failed");
                if let Some(handle) = inner.current.borrow_mut().take() {
                    handle.stop();
                }
                return Err(err);
            }
        };
        *inner.computation.borrow_mut() = Some(computation);

        Ok(CollectionObserver { inner })
    }
}
