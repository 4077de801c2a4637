//! Error type shared by every ordering operation.

use thiserror::Error;

/// Boxed error raised by an upstream source or a key selector.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for ordering operations.
pub type Result<T> = std::result::Result<T, OrderError>;

/// Error type for ordering operations.
///
/// Running out of elements is never an error: `first`, `last` and `element_at`
/// report it with `Ok(None)`.
#[derive(Error, Debug)]
pub enum OrderError {
    /// Invalid argument or configuration value
    #[error("Invalid argument '{argument}': {reason}")]
    InvalidArgument {
        /// The argument name
        argument: &'static str,
        /// Explanation of why it's invalid
        reason: String,
    },

    /// The upstream sequence failed while it was being buffered
    #[error("Source sequence failed: {0}")]
    Source(#[source] BoxError),

    /// A key selector or comparer failed
    #[error("Key selector failed: {0}")]
    Selector(#[source] BoxError),

    /// The evaluation observed a cancellation request
    #[error("Operation was cancelled")]
    Cancelled,
}

impl OrderError {
    /// Wraps an upstream failure.
    pub fn from_source<E: Into<BoxError>>(error: E) -> Self {
        OrderError::Source(error.into())
    }

    /// Wraps a key selector failure.
    pub fn from_selector<E: Into<BoxError>>(error: E) -> Self {
        OrderError::Selector(error.into())
    }

    /// `true` when this error is the cancellation signal rather than a failure.
    #[inline(always)]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, OrderError::Cancelled)
    }
}
