//! livemirror Incremental - Structural diffs over ordered collections.
//!
//! This crate holds the data side of materialization: the primitive diff
//! operations, the buffer they accumulate in between flushes, and the ordered
//! collection they describe.
//!
//! # Core Concepts
//!
//! - `ChangeRecord<D>`: Add / Move / Remove, indexed against the state right before it
//! - `PendingChangeLog<D>`: Append-only buffer, emptied by a single swap at flush time
//! - `MaterializedCollection<D>`: Ordered mirror that can apply and replay records
//!
//! # Example
//!
//! ```
//! use livemirror_incremental::{ChangeRecord, MaterializedCollection};
//!
//! let mut mirror = MaterializedCollection::new();
//! mirror
//!     .replay(&[
//!         ChangeRecord::add(0, "a"),
//!         ChangeRecord::add(1, "b"),
//!         ChangeRecord::moved(0, 1),
//!     ])
//!     .unwrap();
//!
//! assert_eq!(mirror.as_slice(), &["b", "a"]);
//! ```

#![no_std]

extern crate alloc;

pub mod change;
pub mod collection;
pub mod log;

pub use change::{Batch, ChangeKind, ChangeRecord};
pub use collection::MaterializedCollection;
pub use log::PendingChangeLog;
