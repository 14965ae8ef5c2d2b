//! livemirror Reactive - Reactive scheduling primitives for livemirror.
//!
//! Materialization code never depends on a global scheduler. It receives a
//! [`Scheduler`] capability and works with the handles it returns.
//!
//! # Core Concepts
//!
//! - `Scheduler`: Runs computations (`autorun`) and creates dependencies
//! - `Computation`: A reactive unit that re-runs when what it read changes
//! - `Dependency`: `depend()` registers a reader, `changed()` invalidates readers
//! - `Tracker`: Deterministic single-threaded scheduler with explicit `flush()` ticks
//! - `ReactiveCell` / `Properties`: Values (and named values) that readers can depend on
//!
//! # Example
//!
//! ```
//! use livemirror_reactive::{autorun, Properties, Tracker};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let tracker = Rc::new(Tracker::new());
//! let props = Rc::new(Properties::new(tracker.clone()));
//! let seen = Rc::new(RefCell::new(Vec::new()));
//!
//! let (reader, log) = (props.clone(), seen.clone());
//! let _comp = autorun(&*tracker, move |_| {
//!     log.borrow_mut().push(reader.get("page"));
//!     Ok(())
//! })
//! .unwrap();
//!
//! props.set("page", 2i64);
//! tracker.flush().unwrap();
//! assert_eq!(seen.borrow().len(), 2);
//! ```

#![no_std]

extern crate alloc;

pub mod cell;
pub mod scheduler;
pub mod tracker;

pub use cell::{Properties, ReactiveCell};
pub use scheduler::{
    autorun, Computation, ComputationControl, ComputationId, Dependency, DependencyControl,
    DependencyId, RunFn, Scheduler,
};
pub use tracker::{Tracker, MAX_FLUSH_RUNS};
