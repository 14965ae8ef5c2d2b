//! Error types for livemirror.

use alloc::string::String;
use core::fmt;

/// Result type alias for livemirror operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for materialization and subscription operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The query definition failed or returned a live query that cannot be observed.
    Configuration {
        message: String,
    },
    /// A consumer of an emitted notification failed while handling it.
    Callback {
        event: &'static str,
        message: String,
    },
    /// The observer has been destroyed.
    Destroyed,
    /// A structural operation referenced an index outside the collection.
    IndexOutOfBounds {
        index: usize,
        len: usize,
    },
    /// The reactive scheduler is unavailable or was misused.
    Scheduler {
        message: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Configuration { message } => {
                write!(f, "Invalid query definition: {}", message)
            }
            Error::Callback { event, message } => {
                write!(f, "Listener for '{}' failed: {}", event, message)
            }
            Error::Destroyed => write!(f, "Observer has been destroyed"),
            Error::IndexOutOfBounds { index, len } => {
                write!(f, "Index {} out of bounds for collection of length {}", index, len)
            }
            Error::Scheduler { message } => {
                write!(f, "Scheduler error: {}", message)
            }
        }
    }
}

impl Error {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Creates a callback error for the given event name.
    pub fn callback(event: &'static str, message: impl Into<String>) -> Self {
        Error::Callback {
            event,
            message: message.into(),
        }
    }

    /// Creates an index out of bounds error.
    pub fn index_out_of_bounds(index: usize, len: usize) -> Self {
        Error::IndexOutOfBounds { index, len }
    }

    /// Creates a scheduler error.
    pub fn scheduler(message: impl Into<String>) -> Self {
        Error::Scheduler {
            message: message.into(),
        }
    }

    /// Returns true if this is a configuration error.
    #[inline]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration { .. })
    }

    /// Returns true if this is a callback error.
    #[inline]
    pub fn is_callback(&self) -> bool {
        matches!(self, Error::Callback { .. })
    }
}
