//! Deterministic single-threaded scheduler.
//!
//! `Tracker` implements [`Scheduler`] with explicit ticks: invalidated
//! computations are queued in invalidation order and re-run by
//! [`Tracker::flush`]. Nothing runs concurrently and a computation
//! invalidated while another one runs waits until that run completes.

use crate::scheduler::{
    Computation, ComputationControl, ComputationId, Dependency, DependencyControl, DependencyId,
    RunFn, Scheduler,
};
use alloc::collections::VecDeque;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::RefCell;
use hashbrown::HashMap;
use livemirror_core::{Error, Result};

/// Upper bound on computation runs within a single flush.
///
/// A computation that invalidates itself on every run would otherwise keep
/// the flush loop alive forever.
pub const MAX_FLUSH_RUNS: usize = 10_000;

struct Slot {
    /// `None` while the body is executing.
    body: Option<RunFn>,
    invalidated: bool,
    runs: u64,
    deps: Vec<DependencyId>,
}

#[derive(Default)]
struct TrackerState {
    slots: HashMap<ComputationId, Slot>,
    dependents: HashMap<DependencyId, Vec<ComputationId>>,
    queue: VecDeque<ComputationId>,
    current: Option<ComputationId>,
    flushing: bool,
    next_computation: ComputationId,
    next_dependency: DependencyId,
}

impl TrackerState {
    fn detach(&mut self, id: ComputationId) {
        let deps = match self.slots.get_mut(&id) {
            Some(slot) => core::mem::take(&mut slot.deps),
            None => return,
        };
        for dep in deps {
            if let Some(list) = self.dependents.get_mut(&dep) {
                list.retain(|c| *c != id);
            }
        }
    }

    fn invalidate(&mut self, id: ComputationId) {
        let newly = match self.slots.get_mut(&id) {
            Some(slot) if !slot.invalidated => {
                slot.invalidated = true;
                true
            }
            _ => false,
        };
        if newly {
            self.detach(id);
            self.queue.push_back(id);
            tracing::trace!(computation = id, "invalidated");
        }
    }
}

/// Control object shared by every handle the tracker hands out.
struct TrackerHandle {
    state: Weak<RefCell<TrackerState>>,
}

impl ComputationControl for TrackerHandle {
    fn stop(&self, id: ComputationId) {
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let removed = {
            let mut st = state.borrow_mut();
            st.detach(id);
            st.slots.remove(&id)
        };
        if removed.is_some() {
            tracing::debug!(computation = id, "computation stopped");
        }
        // The body may own handles whose drop re-enters the tracker.
        drop(removed);
    }

    fn invalidate(&self, id: ComputationId) {
        if let Some(state) = self.state.upgrade() {
            state.borrow_mut().invalidate(id);
        }
    }

    fn is_stopped(&self, id: ComputationId) -> bool {
        match self.state.upgrade() {
            Some(state) => !state.borrow().slots.contains_key(&id),
            None => true,
        }
    }

    fn is_first_run(&self, id: ComputationId) -> bool {
        match self.state.upgrade() {
            Some(state) => state.borrow().slots.get(&id).map_or(false, |s| s.runs == 0),
            None => false,
        }
    }
}

impl DependencyControl for TrackerHandle {
    fn depend(&self, id: DependencyId) -> bool {
        let Some(state) = self.state.upgrade() else {
            return false;
        };
        let mut st = state.borrow_mut();
        let Some(current) = st.current else {
            return false;
        };
        let list = st.dependents.entry(id).or_default();
        if list.contains(&current) {
            return false;
        }
        list.push(current);
        if let Some(slot) = st.slots.get_mut(&current) {
            slot.deps.push(id);
        }
        true
    }

    fn changed(&self, id: DependencyId) {
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let mut st = state.borrow_mut();
        let dependents = st.dependents.remove(&id).unwrap_or_default();
        for computation in dependents {
            st.invalidate(computation);
        }
    }

    fn has_dependents(&self, id: DependencyId) -> bool {
        match self.state.upgrade() {
            Some(state) => state
                .borrow()
                .dependents
                .get(&id)
                .map_or(false, |list| !list.is_empty()),
            None => false,
        }
    }
}

/// A deterministic, synchronous reactive scheduler.
///
/// # Example
///
/// ```
/// use livemirror_reactive::{autorun, Scheduler, Tracker};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let tracker = Tracker::new();
/// let dep = tracker.dependency();
/// let runs = Rc::new(Cell::new(0));
///
/// let counter = runs.clone();
/// let dep_clone = dep.clone();
/// autorun(&tracker, move |_| {
///     dep_clone.depend();
///     counter.set(counter.get() + 1);
///     Ok(())
/// })
/// .unwrap();
///
/// dep.changed();
/// assert_eq!(runs.get(), 1);
/// tracker.flush().unwrap();
/// assert_eq!(runs.get(), 2);
/// ```
#[derive(Clone)]
pub struct Tracker {
    state: Rc<RefCell<TrackerState>>,
    handle: Rc<TrackerHandle>,
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracker {
    /// Creates a new tracker with no computations.
    pub fn new() -> Self {
        let state = Rc::new(RefCell::new(TrackerState::default()));
        let handle = Rc::new(TrackerHandle {
            state: Rc::downgrade(&state),
        });
        Self { state, handle }
    }

    /// Re-runs invalidated computations until none are pending.
    ///
    /// Nested calls made from inside a running computation return
    /// immediately; the outermost flush picks up anything they would have
    /// run. The first error raised by a computation aborts the flush and is
    /// returned; computations still queued run on the next flush.
    pub fn flush(&self) -> Result<()> {
        {
            let mut st = self.state.borrow_mut();
            if st.flushing {
                return Ok(());
            }
            st.flushing = true;
        }

        let result = self.drain_queue();
        self.state.borrow_mut().flushing = false;
        result
    }

    fn drain_queue(&self) -> Result<()> {
        let mut runs = 0usize;
        loop {
            let next = {
                let mut st = self.state.borrow_mut();
                let mut next = None;
                while let Some(id) = st.queue.pop_front() {
                    if st.slots.get(&id).map_or(false, |s| s.invalidated) {
                        next = Some(id);
                        break;
                    }
                }
                next
            };
            let Some(id) = next else {
                return Ok(());
            };

            runs += 1;
            if runs > MAX_FLUSH_RUNS {
                tracing::warn!(limit = MAX_FLUSH_RUNS, "flush did not settle");
                self.state.borrow_mut().queue.push_front(id);
                return Err(Error::scheduler("flush did not settle"));
            }
            self.run(id)?;
        }
    }

    fn run(&self, id: ComputationId) -> Result<()> {
        let (body, previous) = {
            let mut st = self.state.borrow_mut();
            st.detach(id);
            let Some(slot) = st.slots.get_mut(&id) else {
                return Ok(());
            };
            slot.invalidated = false;
            let Some(body) = slot.body.take() else {
                // Already executing further up the stack.
                return Ok(());
            };
            let previous = st.current.replace(id);
            (body, previous)
        };

        let mut body = body;
        let computation = Computation::new(id, self.handle.clone());
        let result = body(&computation);

        let discarded = {
            let mut st = self.state.borrow_mut();
            st.current = previous;
            match st.slots.get_mut(&id) {
                Some(slot) => {
                    slot.runs += 1;
                    slot.body = Some(body);
                    None
                }
                None => Some(body),
            }
        };
        drop(discarded);
        result
    }

    /// Returns the number of computations waiting to re-run.
    pub fn pending(&self) -> usize {
        let st = self.state.borrow();
        st.queue
            .iter()
            .filter(|&&id| st.slots.get(&id).map_or(false, |s| s.invalidated))
            .count()
    }

    /// Returns true while a flush is in progress.
    pub fn is_flushing(&self) -> bool {
        self.state.borrow().flushing
    }

    /// Returns true while a computation body is executing.
    pub fn is_active(&self) -> bool {
        self.state.borrow().current.is_some()
    }

    /// Returns the number of live (not stopped) computations.
    pub fn computation_count(&self) -> usize {
        self.state.borrow().slots.len()
    }
}

impl Scheduler for Tracker {
    fn autorun(&self, body: RunFn) -> Result<Computation> {
        let id = {
            let mut st = self.state.borrow_mut();
            st.next_computation += 1;
            let id = st.next_computation;
            st.slots.insert(
                id,
                Slot {
                    body: Some(body),
                    invalidated: false,
                    runs: 0,
                    deps: Vec::new(),
                },
            );
            id
        };
        tracing::debug!(computation = id, "autorun started");

        let computation = Computation::new(id, self.handle.clone());
        if let Err(err) = self.run(id) {
            computation.stop();
            return Err(err);
        }
        Ok(computation)
    }

    fn dependency(&self) -> Dependency {
        let id = {
            let mut st = self.state.borrow_mut();
            st.next_dependency += 1;
            st.next_dependency
        };
        Dependency::new(id, self.handle.clone())
    }
}
