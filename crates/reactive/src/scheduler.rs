//! Reactive scheduler capability.
//!
//! Consumers never talk to a concrete scheduler. They receive a
//! `Rc<dyn Scheduler>` and work with the [`Computation`] and [`Dependency`]
//! handles it hands out, so a deterministic scheduler such as
//! [`Tracker`](crate::Tracker) can drive the same code in tests.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::fmt;
use livemirror_core::Result;

/// Unique identifier for a computation.
pub type ComputationId = u64;

/// Unique identifier for a dependency.
pub type DependencyId = u64;

/// Body of a reactive computation.
///
/// The body is re-executed whenever a dependency it read during its previous
/// run reports a change.
pub type RunFn = Box<dyn FnMut(&Computation) -> Result<()>>;

/// Scheduler-side operations on computations.
pub trait ComputationControl {
    /// Stops the computation. Idempotent.
    fn stop(&self, id: ComputationId);
    /// Schedules the computation to re-run.
    fn invalidate(&self, id: ComputationId);
    /// Returns true if the computation has been stopped.
    fn is_stopped(&self, id: ComputationId) -> bool;
    /// Returns true while the computation is executing its first run.
    fn is_first_run(&self, id: ComputationId) -> bool;
}

/// Scheduler-side operations on dependencies.
pub trait DependencyControl {
    /// Registers the running computation as a dependent.
    fn depend(&self, id: DependencyId) -> bool;
    /// Invalidates every dependent computation.
    fn changed(&self, id: DependencyId);
    /// Returns true if any computation depends on this dependency.
    fn has_dependents(&self, id: DependencyId) -> bool;
}

/// A reactive capability: runs computations and tracks what they read.
pub trait Scheduler {
    /// Runs `body` immediately and re-runs it whenever a dependency read
    /// during its latest run changes.
    ///
    /// If the first run fails, the computation is stopped and the error is
    /// returned.
    fn autorun(&self, body: RunFn) -> Result<Computation>;

    /// Creates a new dependency tracked by this scheduler.
    fn dependency(&self) -> Dependency;
}

/// Handle to a running reactive computation.
#[derive(Clone)]
pub struct Computation {
    id: ComputationId,
    control: Rc<dyn ComputationControl>,
}

impl Computation {
    /// Creates a handle. Called by scheduler implementations.
    pub fn new(id: ComputationId, control: Rc<dyn ComputationControl>) -> Self {
        Self { id, control }
    }

    /// Returns the computation ID.
    #[inline]
    pub fn id(&self) -> ComputationId {
        self.id
    }

    /// Stops the computation. It will never run again.
    ///
    /// Safe to call repeatedly and from inside the computation's own body.
    pub fn stop(&self) {
        self.control.stop(self.id);
    }

    /// Schedules the computation to re-run.
    pub fn invalidate(&self) {
        self.control.invalidate(self.id);
    }

    /// Returns true if the computation has been stopped.
    pub fn is_stopped(&self) -> bool {
        self.control.is_stopped(self.id)
    }

    /// Returns true while the body is executing for the first time.
    pub fn is_first_run(&self) -> bool {
        self.control.is_first_run(self.id)
    }
}

impl fmt::Debug for Computation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computation").field("id", &self.id).finish()
    }
}

/// A source of change that computations can depend on.
#[derive(Clone)]
pub struct Dependency {
    id: DependencyId,
    control: Rc<dyn DependencyControl>,
}

impl Dependency {
    /// Creates a handle. Called by scheduler implementations.
    pub fn new(id: DependencyId, control: Rc<dyn DependencyControl>) -> Self {
        Self { id, control }
    }

    /// Returns the dependency ID.
    #[inline]
    pub fn id(&self) -> DependencyId {
        self.id
    }

    /// Registers the currently running computation as a dependent.
    ///
    /// Returns true if a new dependent was added. Outside a computation this
    /// does nothing.
    pub fn depend(&self) -> bool {
        self.control.depend(self.id)
    }

    /// Invalidates every computation that depends on this dependency.
    pub fn changed(&self) {
        self.control.changed(self.id);
    }

    /// Returns true if any computation currently depends on this dependency.
    pub fn has_dependents(&self) -> bool {
        self.control.has_dependents(self.id)
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependency").field("id", &self.id).finish()
    }
}

/// Runs `body` as a computation of `scheduler`.
///
/// Convenience over [`Scheduler::autorun`] that boxes the closure.
pub fn autorun<S, F>(scheduler: &S, body: F) -> Result<Computation>
where
    S: Scheduler + ?Sized,
    F: FnMut(&Computation) -> Result<()> + 'static,
{
    scheduler.autorun(Box::new(body))
}
