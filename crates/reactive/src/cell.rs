//! Reactive cells and named reactive properties.
//!
//! `Properties` is an explicit name → cell map. A property is defined the
//! first time it is read or written; reads register the running computation
//! as a dependent and writes invalidate every dependent.

use crate::scheduler::{Dependency, Scheduler};
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;
use hashbrown::HashMap;
use livemirror_core::Value;

/// A value paired with the dependency that tracks its readers.
pub struct ReactiveCell<T> {
    value: RefCell<T>,
    dependency: Dependency,
}

impl<T: Clone> ReactiveCell<T> {
    /// Creates a cell holding `value`.
    pub fn new(value: T, dependency: Dependency) -> Self {
        Self {
            value: RefCell::new(value),
            dependency,
        }
    }

    /// Returns the value and registers the running computation as a reader.
    pub fn get(&self) -> T {
        self.dependency.depend();
        self.value.borrow().clone()
    }

    /// Returns the value without registering a dependency.
    pub fn peek(&self) -> T {
        self.value.borrow().clone()
    }

    /// Replaces the value and notifies every reader.
    pub fn set(&self, value: T) {
        *self.value.borrow_mut() = value;
        self.dependency.changed();
    }

    /// Returns the dependency backing this cell.
    #[inline]
    pub fn dependency(&self) -> &Dependency {
        &self.dependency
    }
}

impl<T: Clone + PartialEq> ReactiveCell<T> {
    /// Replaces the value and notifies readers only if it differs.
    ///
    /// Returns true if readers were notified.
    pub fn set_if_changed(&self, value: T) -> bool {
        if *self.value.borrow() == value {
            return false;
        }
        self.set(value);
        true
    }
}

impl<T: fmt::Debug> fmt::Debug for ReactiveCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveCell")
            .field("value", &self.value)
            .field("dependency", &self.dependency)
            .finish()
    }
}

/// Named reactive properties, defined lazily on first access.
///
/// # Example
///
/// ```
/// use livemirror_reactive::{autorun, Properties, Tracker};
/// use livemirror_core::Value;
/// use std::rc::Rc;
///
/// let tracker = Rc::new(Tracker::new());
/// let props = Rc::new(Properties::new(tracker.clone()));
///
/// let reader = props.clone();
/// let comp = autorun(&*tracker, move |_| {
///     let _limit = reader.get("limit");
///     Ok(())
/// })
/// .unwrap();
///
/// props.set("limit", 10i64);
/// assert_eq!(tracker.pending(), 1);
/// assert_eq!(props.peek("limit"), Value::Int64(10));
/// # comp.stop();
/// ```
pub struct Properties {
    scheduler: Rc<dyn Scheduler>,
    cells: RefCell<HashMap<String, Rc<ReactiveCell<Value>>>>,
}

impl Properties {
    /// Creates an empty property map whose cells are tracked by `scheduler`.
    pub fn new(scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            scheduler,
            cells: RefCell::new(HashMap::new()),
        }
    }

    fn cell(&self, name: &str) -> Rc<ReactiveCell<Value>> {
        if let Some(cell) = self.cells.borrow().get(name) {
            return cell.clone();
        }
        let cell = Rc::new(ReactiveCell::new(Value::Null, self.scheduler.dependency()));
        self.cells.borrow_mut().insert(name.into(), cell.clone());
        tracing::trace!(property = name, "property defined");
        cell
    }

    /// Reads a property, registering the running computation as a reader.
    ///
    /// An undefined property is defined as `Value::Null`.
    pub fn get(&self, name: &str) -> Value {
        self.cell(name).get()
    }

    /// Reads a property without registering a dependency.
    pub fn peek(&self, name: &str) -> Value {
        self.cells
            .borrow()
            .get(name)
            .map(|cell| cell.peek())
            .unwrap_or_default()
    }

    /// Writes a property and notifies its readers.
    pub fn set(&self, name: &str, value: impl Into<Value>) {
        // Cell handle is cloned out so readers can re-enter the map.
        let cell = self.cell(name);
        cell.set(value.into());
    }

    /// Returns true if the property has been defined.
    pub fn contains(&self, name: &str) -> bool {
        self.cells.borrow().contains_key(name)
    }

    /// Returns the names of all defined properties.
    pub fn names(&self) -> Vec<String> {
        self.cells.borrow().keys().cloned().collect()
    }

    /// Returns the number of defined properties.
    pub fn len(&self) -> usize {
        self.cells.borrow().len()
    }

    /// Returns true if no property has been defined.
    pub fn is_empty(&self) -> bool {
        self.cells.borrow().is_empty()
    }

    /// Removes every property. Existing readers are not notified.
    pub fn clear(&self) {
        let cells = core::mem::take(&mut *self.cells.borrow_mut());
        drop(cells);
    }
}

impl fmt::Debug for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Properties")
            .field("cells", &self.cells.borrow().len())
            .finish()
    }
}
