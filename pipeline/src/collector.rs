//! Draining the channel into the working buffer.

use channel::BoundedChannel;
use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::types::{IndexedVector, Vec3};

/// Counters for one collector run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CollectStats {
    /// Items popped from the channel.
    pub received: usize,
    /// Result slots written.
    pub written: usize,
}

/// What the collector hands back once the channel is closed and drained.
#[derive(Debug)]
pub struct CollectOutcome {
    /// The working buffer, returned even on fault so it can be pooled.
    pub buffer: Vec<Vec3>,
    pub stats: CollectStats,
    /// First fault seen, or `Incomplete` if slots were left unwritten.
    pub fault: Option<PipelineError>,
}

/// Drains `channel` until it is closed and empty, writing each item into
/// `buffer` at its index.
///
/// Out-of-range and repeated indices are recorded as faults but draining
/// continues, so producers are never left blocked on a full channel.
pub fn collect(channel: &BoundedChannel<IndexedVector>, mut buffer: Vec<Vec3>) -> CollectOutcome {
    let len = buffer.len();
    let mut written = vec![false; len];
    let mut stats = CollectStats::default();
    let mut fault = None;

    for item in channel.drain() {
        stats.received += 1;
        let Some(seen) = written.get_mut(item.index) else {
            warn!(index = item.index, len, "collector received out-of-range index");
            fault.get_or_insert(PipelineError::IndexOutOfRange {
                index: item.index,
                len,
            });
            continue;
        };
        if *seen {
            warn!(index = item.index, "collector received duplicate index");
            fault.get_or_insert(PipelineError::DuplicateIndex { index: item.index });
            continue;
        }
        *seen = true;
        buffer[item.index] = item.vector;
        stats.written += 1;
    }

    if fault.is_none() && stats.written < len {
        fault = Some(PipelineError::Incomplete {
            missing: len - stats.written,
        });
    }
    debug!(
        received = stats.received,
        written = stats.written,
        "collector drained"
    );
    CollectOutcome {
        buffer,
        stats,
        fault,
    }
}
