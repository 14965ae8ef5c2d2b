//! Live query contract.
//!
//! A live query reports incremental membership and order changes through
//! [`ObserveCallbacks`] and takes part in the reactive graph through
//! [`LiveQuery::fetch`]. The query itself is supplied from outside; this
//! crate only observes it.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use livemirror_core::Result;
use livemirror_reactive::Properties;

/// Structural notifications delivered by a live query.
///
/// Indices refer to the query result immediately before the notification.
pub trait ObserveCallbacks<D> {
    /// `doc` entered the result at `index`.
    fn added_at(&self, doc: &D, index: usize);

    /// The document at `index` changed from `old_doc` to `new_doc`.
    fn changed_at(&self, new_doc: &D, old_doc: &D, index: usize);

    /// `doc` moved from `from` to `to`.
    fn moved_to(&self, doc: &D, from: usize, to: usize);

    /// `doc` left the result at `index`.
    fn removed_at(&self, doc: &D, index: usize);
}

/// Registration returned by [`LiveQuery::observe`].
pub trait ObserveHandle {
    /// Unregisters the callbacks. Must be idempotent.
    fn stop(&mut self);
}

/// A query whose result can be observed incrementally.
pub trait LiveQuery<D> {
    /// Registers `callbacks`.
    ///
    /// The current result is delivered synchronously as `added_at` calls
    /// before this returns.
    fn observe(&self, callbacks: Rc<dyn ObserveCallbacks<D>>) -> Result<Box<dyn ObserveHandle>>;

    /// Returns the current result and registers the running computation as
    /// a dependent of the query's changes.
    fn fetch(&self) -> Vec<D>;
}

/// Zero-argument (apart from the reactive properties) query definition.
///
/// Every reactive value read while the definition runs becomes an input of
/// the subscription: when one changes, the subscription is rebuilt.
pub type QueryDefinition<D> = Box<dyn Fn(&Properties) -> Result<Box<dyn LiveQuery<D>>>>;
