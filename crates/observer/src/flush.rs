//! Batch flush computation.
//!
//! A reactive unit that reads the live query (so any mutation of the query
//! invalidates it), drains the adapter's pending log with one swap and
//! publishes the drained records as a batch.

use crate::adapter::QueryObserver;
use crate::events::BatchOutlet;
use crate::live_query::LiveQuery;
use alloc::rc::Rc;
use core::cell::RefCell;
use livemirror_core::{Document, Error, Result};
use livemirror_reactive::{autorun, Computation, Scheduler};

/// Handle to a running flush computation.
pub struct BatchFlusher {
    computation: Computation,
    initial_error: Option<Error>,
}

impl BatchFlusher {
    /// Starts the flush computation. Its first run happens immediately and
    /// flushes whatever the adapter has accumulated so far.
    ///
    /// A listener failure during that first run does not stop the
    /// computation; it is kept and returned by
    /// [`take_initial_error`](Self::take_initial_error). Later failures
    /// surface from the scheduler tick that ran the flush.
    pub(crate) fn start<D: Document + 'static>(
        scheduler: &dyn Scheduler,
        query: Rc<dyn LiveQuery<D>>,
        observer: Rc<QueryObserver<D>>,
        outlet: Rc<BatchOutlet<D>>,
    ) -> Result<Self> {
        let first_failure: Rc<RefCell<Option<Error>>> = Rc::new(RefCell::new(None));
        let stash = first_failure.clone();

        let computation = autorun(scheduler, move |computation| {
            // Registers the mutation dependency of the query.
            query.fetch();
            let batch = observer.take_pending();
            let published = outlet.publish(batch);
            match published {
                Err(err) if computation.is_first_run() => {
                    *stash.borrow_mut() = Some(err);
                    Ok(())
                }
                other => other,
            }
        })?;

        let initial_error = first_failure.borrow_mut().take();
        Ok(Self {
            computation,
            initial_error,
        })
    }

    /// Returns the listener error raised by the first flush, if any.
    pub fn take_initial_error(&mut self) -> Option<Error> {
        self.initial_error.take()
    }

    /// Stops the computation. Records still pending stay in the adapter.
    pub fn stop(&self) {
        self.computation.stop();
    }

    /// Returns true if the computation has been stopped.
    pub fn is_stopped(&self) -> bool {
        self.computation.is_stopped()
    }
}
