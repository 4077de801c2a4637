use std::{
    str::FromStr,
    sync::atomic::{AtomicUsize, Ordering},
};

use argh::FromArgs;

use crate::error::{OrderError, Result};

pub const DEFAULT_SMALL_SORT_THRESHOLD: usize = 16;

static SMALL_SORT_THRESHOLD: AtomicUsize = AtomicUsize::new(DEFAULT_SMALL_SORT_THRESHOLD);

/// Partitions of at most this many entries are finished with a direct comparison sort
/// instead of being partitioned further.
#[inline(always)]
pub fn small_sort_threshold() -> usize {
    SMALL_SORT_THRESHOLD.load(Ordering::Relaxed)
}

pub fn set_small_sort_threshold(threshold: usize) -> Result<()> {
    if threshold == 0 {
        return Err(OrderError::InvalidArgument {
            argument: "small_sort_threshold",
            reason: "must be >= 1".to_string(),
        });
    }
    SMALL_SORT_THRESHOLD.store(threshold, Ordering::Relaxed);
    Ok(())
}

/// Which evaluation path a demo run drives.
#[derive(PartialEq, Eq, Default, Clone, Copy, Debug)]
pub enum Mode {
    /// Buffer, fully sort and enumerate.
    #[default]
    Full,
    /// Skip/take through a bounded view (partial quicksort).
    Partial,
    /// A single `element_at` (quickselect).
    Select,
    /// `first`/`last` through the streaming comparer.
    Streaming,
}

impl FromStr for Mode {
    type Err = String;

    #[inline(always)]
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "full" => Ok(Self::Full),
            "partial" => Ok(Self::Partial),
            "select" => Ok(Self::Select),
            "streaming" => Ok(Self::Streaming),
            _ => Err(format!(
                "Unknown mode: '{s}', valid modes: 'full', 'partial', 'select', 'streaming'"
            )),
        }
    }
}

#[derive(FromArgs, Debug)]
/// Ordering demo configuration.
pub struct Args {
    /// number of elements to generate
    #[argh(option, default = "1_000_000")]
    pub len: usize,

    /// seed for the element generator
    #[argh(option, default = "0")]
    pub seed: u64,

    /// elements to skip before taking (partial mode)
    #[argh(option, default = "0")]
    pub skip: usize,

    /// elements to take (partial mode) or rank to select (select mode)
    #[argh(option, default = "10")]
    pub take: usize,

    /// evaluation path: 'full', 'partial', 'select', 'streaming'
    #[argh(option, default = "Mode::Full")]
    pub mode: Mode,

    /// partition size below which partial quicksort falls back to a comparison sort
    #[argh(option, default = "DEFAULT_SMALL_SORT_THRESHOLD")]
    pub small_sort_threshold: usize,
}

impl Args {
    /// Installs the process-wide settings carried by these arguments.
    pub fn apply(&self) -> Result<()> {
        set_small_sort_threshold(self.small_sort_threshold)
    }
}
