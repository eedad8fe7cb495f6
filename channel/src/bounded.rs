//! The bounded, closable channel.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use crossbeam_channel::{
    bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender, TryRecvError, TrySendError,
};

use crate::error::{ChannelError, ChannelResult, Closed, PopError, PushError};

/// Upper bound on how long a blocked push or pop sleeps before re-checking
/// the closed flag.
const WAIT_SLICE: Duration = Duration::from_millis(1);

/// Counters describing a channel's traffic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelStats {
    /// Configured capacity.
    pub capacity: usize,
    /// Items successfully pushed.
    pub pushed: usize,
    /// Items popped.
    pub popped: usize,
    /// Largest queue depth observed right after a push.
    pub high_water: usize,
}

impl ChannelStats {
    /// Items pushed but not yet popped.
    #[must_use]
    pub const fn in_flight(&self) -> usize {
        self.pushed.saturating_sub(self.popped)
    }
}

/// A fixed-capacity FIFO shared between producers and consumers.
///
/// Producers block in [`push`](Self::push) while the channel is full.
/// [`close`](Self::close) stops all further pushes; items already queued stay
/// available until drained. Once `close` has returned, every push that
/// succeeded is visible to consumers, so a consumer that observes the channel
/// closed and empty has seen every item.
pub struct BoundedChannel<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
    // Pushes hold the read side; `close` takes the write side so it waits for
    // in-progress pushes and no push can start after the flag flips.
    gate: RwLock<()>,
    closed: AtomicBool,
    capacity: usize,
    pushed: AtomicUsize,
    popped: AtomicUsize,
    high_water: AtomicUsize,
}

impl<T> BoundedChannel<T> {
    /// Creates an open channel holding at most `capacity` items.
    pub fn with_capacity(capacity: usize) -> ChannelResult<Self> {
        if capacity == 0 {
            return Err(ChannelError::ZeroCapacity);
        }
        let (tx, rx) = bounded(capacity);
        Ok(Self {
            tx,
            rx,
            gate: RwLock::new(()),
            closed: AtomicBool::new(false),
            capacity,
            pushed: AtomicUsize::new(0),
            popped: AtomicUsize::new(0),
            high_water: AtomicUsize::new(0),
        })
    }

    /// Enqueues `item`, blocking while the channel is full.
    ///
    /// Returns the item back inside [`PushError::Closed`] if the channel is or
    /// becomes closed before the item could be enqueued.
    pub fn push(&self, item: T) -> Result<(), PushError<T>> {
        let mut item = item;
        loop {
            let _gate = self.gate.read().unwrap_or_else(PoisonError::into_inner);
            if self.closed.load(Ordering::Acquire) {
                return Err(PushError::Closed(item));
            }
            match self.tx.send_timeout(item, WAIT_SLICE) {
                Ok(()) => {
                    self.record_push();
                    return Ok(());
                }
                Err(SendTimeoutError::Timeout(rejected)) => item = rejected,
                Err(SendTimeoutError::Disconnected(rejected)) => {
                    return Err(PushError::Closed(rejected));
                }
            }
        }
    }

    /// Enqueues `item` without blocking.
    pub fn try_push(&self, item: T) -> Result<(), PushError<T>> {
        let _gate = self.gate.read().unwrap_or_else(PoisonError::into_inner);
        if self.closed.load(Ordering::Acquire) {
            return Err(PushError::Closed(item));
        }
        match self.tx.try_send(item) {
            Ok(()) => {
                self.record_push();
                Ok(())
            }
            Err(TrySendError::Full(item)) => Err(PushError::Full(item)),
            Err(TrySendError::Disconnected(item)) => Err(PushError::Closed(item)),
        }
    }

    /// Removes the oldest item if one is available.
    pub fn try_pop(&self) -> Option<T> {
        let item = self.rx.try_recv().ok()?;
        self.record_pop();
        Some(item)
    }

    /// Removes the oldest item, blocking until one arrives.
    ///
    /// Returns [`Closed`] once the channel is closed and every queued item has
    /// been popped.
    pub fn pop(&self) -> Result<T, Closed> {
        loop {
            match self.pop_timeout(WAIT_SLICE) {
                Ok(item) => return Ok(item),
                Err(PopError::Closed) => return Err(Closed),
                Err(PopError::Timeout) => {}
            }
        }
    }

    /// Like [`pop`](Self::pop), but gives up after `timeout`.
    pub fn pop_timeout(&self, timeout: Duration) -> Result<T, PopError> {
        let deadline = Instant::now().checked_add(timeout);
        loop {
            // Read the flag before looking at the queue: if it was already set,
            // no push can land after the emptiness check below.
            let closed = self.closed.load(Ordering::Acquire);
            match self.rx.try_recv() {
                Ok(item) => {
                    self.record_pop();
                    return Ok(item);
                }
                Err(TryRecvError::Empty) if closed => return Err(PopError::Closed),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => return Err(PopError::Closed),
            }

            let wait = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(PopError::Timeout);
                    }
                    (deadline - now).min(WAIT_SLICE)
                }
                None => WAIT_SLICE,
            };
            match self.rx.recv_timeout(wait) {
                Ok(item) => {
                    self.record_pop();
                    return Ok(item);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return Err(PopError::Closed),
            }
        }
    }

    /// Returns a blocking iterator that pops until the channel is closed and
    /// drained.
    pub fn drain(&self) -> Drain<'_, T> {
        Drain { channel: self }
    }

    /// Closes the channel. Idempotent.
    ///
    /// Waits for pushes already in progress to finish. Returns `true` for the
    /// call that actually closed the channel.
    pub fn close(&self) -> bool {
        let _gate = self.gate.write().unwrap_or_else(PoisonError::into_inner);
        !self.closed.swap(true, Ordering::AcqRel)
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of items currently queued.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Returns `true` if no items are queued.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Maximum number of queued items.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot of the traffic counters.
    pub fn stats(&self) -> ChannelStats {
        ChannelStats {
            capacity: self.capacity,
            pushed: self.pushed.load(Ordering::Acquire),
            popped: self.popped.load(Ordering::Acquire),
            high_water: self.high_water.load(Ordering::Acquire),
        }
    }

    fn record_push(&self) {
        self.pushed.fetch_add(1, Ordering::AcqRel);
        self.high_water.fetch_max(self.tx.len(), Ordering::AcqRel);
    }

    fn record_pop(&self) {
        self.popped.fetch_add(1, Ordering::AcqRel);
    }
}

impl<T> fmt::Debug for BoundedChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedChannel")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Blocking iterator returned by [`BoundedChannel::drain`].
#[derive(Debug)]
pub struct Drain<'a, T> {
    channel: &'a BoundedChannel<T>,
}

impl<T> Iterator for Drain<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.channel.pop().ok()
    }
}
