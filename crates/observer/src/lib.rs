//! livemirror Observer - Incremental view materializer for live queries.
//!
//! This crate turns a redefinable live query into a locally materialized,
//! ordered mirror. Structural callbacks from the query are applied to the
//! mirror and recorded as change records; a flush computation publishes the
//! records once per scheduler tick; and a controller rebuilds the whole
//! subscription whenever a reactive input of the query definition changes.
//!
//! # Core Concepts
//!
//! - `LiveQuery` / `ObserveCallbacks`: The contract a live query source fulfils
//! - `QueryObserver`: Applies callbacks to a `MaterializedCollection` and logs `ChangeRecord`s
//! - `BatchFlusher`: Reactive unit that drains the log and publishes a batch
//! - `CollectionObserver`: Re-subscription controller and public entry point
//! - `EventSink` / `Listeners`: Where `NewSubscription` and `Batch` events go
//! - `LocalCollection`: In-memory live query source
//!
//! # Example
//!
//! ```
//! use livemirror_core::{Doc, Error};
//! use livemirror_incremental::ChangeRecord;
//! use livemirror_observer::{CollectionObserver, LocalCollection};
//! use livemirror_reactive::Tracker;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let tracker = Rc::new(Tracker::new());
//! let active = LocalCollection::new(&*tracker);
//! let archived = LocalCollection::new(&*tracker);
//! archived.push(Doc::new("old"));
//!
//! let batches = Rc::new(RefCell::new(Vec::new()));
//! let log = batches.clone();
//! let (a, b) = (active.clone(), archived.clone());
//! let observer = CollectionObserver::builder(move |props| {
//!     match props.get("archived").as_bool() {
//!         Some(true) => Ok(b.cursor()),
//!         _ => Ok(a.cursor()),
//!     }
//! })
//! .scheduler(tracker.clone())
//! .on_batch(move |records| {
//!     log.borrow_mut().push(records.to_vec());
//!     Ok::<(), Error>(())
//! })
//! .build()
//! .unwrap();
//!
//! active.push(Doc::new("new"));
//! tracker.flush().unwrap();
//! assert_eq!(observer.docs(), vec![Doc::new("new")]);
//!
//! observer.set("archived", true).unwrap();
//! tracker.flush().unwrap();
//! assert_eq!(observer.docs(), vec![Doc::new("old")]);
//! assert_eq!(batches.borrow()[1], vec![ChangeRecord::remove(0)]);
//! assert_eq!(batches.borrow()[2], vec![ChangeRecord::add(0, Doc::new("old"))]);
//! ```

#![no_std]

extern crate alloc;

pub mod adapter;
pub mod controller;
pub mod events;
pub mod flush;
pub mod live_query;
pub mod source;

pub use adapter::QueryObserver;
pub use controller::{CollectionObserver, CollectionObserverBuilder, SubscriptionHandle};
pub use events::{BatchCallback, EventSink, ListenerId, Listeners, MirrorEvent, SubscriptionCallback};
pub use flush::BatchFlusher;
pub use live_query::{LiveQuery, ObserveCallbacks, ObserveHandle, QueryDefinition};
pub use source::LocalCollection;

// Re-export commonly used types from dependencies
pub use livemirror_incremental::{Batch, ChangeKind, ChangeRecord, MaterializedCollection};
pub use livemirror_reactive::{Properties, Scheduler, Tracker};
