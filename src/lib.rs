//! Ordering operators for pull-based asynchronous sequences.
//!
//! `order_by`/`then_by` declare a chain of sort keys over a [`Sequence`]; nothing is pulled until
//! a terminal operation or a cursor runs. Each evaluation buffers the source once, computes every
//! key once per element, and then sorts a permutation of the buffer without suspending.
//! `first`/`last` skip the buffer entirely and find the extreme element in one streaming pass;
//! `element_at` and `skip`/`take` windows use quickselect and partial quicksort instead of a full
//! sort.
//!
//! ```ignore
//! let people = from_vec(vec![("bo", 31), ("al", 27), ("al", 19)]);
//! let ordered = people.order_by(|p| p.0).then_by_descending(|p| p.1);
//! assert_eq!(ordered.take(2).to_vec(&cancel).await?, vec![("al", 27), ("al", 19)]);
//! ```

use std::time::{Duration, Instant};

pub mod bounded;
pub mod config;
pub mod cursor;
pub mod error;
pub mod keys;
pub mod ordered;
pub mod seq;
pub mod sort;

pub use bounded::{BoundedView, Bounds, OrderedPartition};
pub use config::{Args, Mode};
pub use cursor::{OrderedCursor, Phase};
pub use error::{OrderError, Result};
pub use keys::{AsyncKey, CancellableKey, Comparer, KeyProducer, KeySpec, NaturalOrder, SyncKey};
pub use ordered::{OrderedSequence, SequenceExt};
pub use seq::{from_fn, from_slice, from_vec, FnSource, Sequence, SliceSource};

pub mod prelude {
    pub use crate::{
        from_fn, from_slice, from_vec, OrderError, OrderedPartition, Result, Sequence,
        SequenceExt,
    };
    pub use tokio_util::sync::CancellationToken;
}

/// Profiler scope, compiled out unless the `profile` feature is enabled.
#[macro_export]
#[doc(hidden)]
macro_rules! scope {
    ($name:expr) => {
        #[cfg(feature = "profile")]
        profiling::scope!($name);
    };
}

/// Profiler scope that also logs its duration at debug level with the `scope_print` feature.
#[macro_export]
#[doc(hidden)]
macro_rules! scope_print {
    ($name:expr) => {
        $crate::scope!($name);
        #[cfg(feature = "scope_print")]
        let _scope_timer = $crate::ScopeTimer::new($name);
    };
}

/// Like [`scope_print!`], enabled by `scope_print_major` alone for the coarse phases.
#[macro_export]
#[doc(hidden)]
macro_rules! scope_print_major {
    ($name:expr) => {
        $crate::scope!($name);
        #[cfg(feature = "scope_print_major")]
        let _scope_timer = $crate::ScopeTimer::new($name);
    };
}

/// Logs the time between its creation and drop.
#[doc(hidden)]
pub struct ScopeTimer {
    label: &'static str,
    start: Instant,
}

impl ScopeTimer {
    #[inline(always)]
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            start: Instant::now(),
        }
    }
}

impl Drop for ScopeTimer {
    fn drop(&mut self) {
        log::debug!("{:>12} {}", PrettyDuration(self.start.elapsed()), self.label);
    }
}

/// A wrapper struct for `std::time::Duration` to provide pretty-printing of durations.
#[doc(hidden)]
pub struct PrettyDuration(pub Duration);

impl std::fmt::Display for PrettyDuration {
    /// Durations are formatted as follows:
    /// - At least 1 second: seconds (s), two decimal places.
    /// - At least 1 millisecond: milliseconds (ms), two decimal places.
    /// - Otherwise: whole microseconds (µs).
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let duration = self.0;
        let text = if duration.as_secs() > 0 {
            format!("{:.2}s", duration.as_secs_f64())
        } else if duration.subsec_millis() > 0 {
            format!("{:.2}ms", duration.as_secs_f64() * 1_000.0)
        } else {
            format!("{}µs", duration.as_micros())
        };
        // Padding so the timer log lines up.
        f.pad(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn test_pretty_duration() {
        assert_eq!(PrettyDuration(Duration::from_millis(2500)).to_string(), "2.50s");
        assert_eq!(PrettyDuration(Duration::from_micros(1250)).to_string(), "1.25ms");
        assert_eq!(PrettyDuration(Duration::from_nanos(999_999)).to_string(), "999µs");
        assert_eq!(format!("{:>6}", PrettyDuration(Duration::from_micros(7))), "   7µs");
    }
}
