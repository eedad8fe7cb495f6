//! Error types for channel operations.

use std::fmt;

/// Result type for channel construction.
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Errors that can occur while constructing a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    /// A bounded channel must be able to hold at least one item.
    ZeroCapacity,
}

/// A push that did not enqueue its item.
///
/// The rejected item is handed back to the caller; a failed push never drops
/// data silently.
#[derive(Clone, PartialEq, Eq)]
pub enum PushError<T> {
    /// The channel is at capacity (non-blocking pushes only).
    Full(T),
    /// The channel has been closed.
    Closed(T),
}

/// A pop that returned no item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopError {
    /// No item arrived before the timeout elapsed.
    Timeout,
    /// The channel is closed and fully drained.
    Closed,
}

/// The channel is closed and fully drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Closed;

impl<T> PushError<T> {
    /// Returns the rejected item.
    pub fn into_inner(self) -> T {
        match self {
            Self::Full(item) | Self::Closed(item) => item,
        }
    }

    /// Returns `true` if the push failed because the channel is closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed(_))
    }

    /// Returns `true` if the push failed because the channel is full.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        matches!(self, Self::Full(_))
    }
}

impl<T> fmt::Debug for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(_) => f.write_str("Full(..)"),
            Self::Closed(_) => f.write_str("Closed(..)"),
        }
    }
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroCapacity => write!(f, "channel capacity must be at least 1"),
        }
    }
}

impl<T> fmt::Display for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(_) => write!(f, "push rejected: channel is full"),
            Self::Closed(_) => write!(f, "push rejected: channel is closed"),
        }
    }
}

impl fmt::Display for PopError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "pop timed out waiting for an item"),
            Self::Closed => write!(f, "channel is closed and drained"),
        }
    }
}

impl fmt::Display for Closed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel is closed and drained")
    }
}

impl std::error::Error for ChannelError {}
impl<T> std::error::Error for PushError<T> {}
impl std::error::Error for PopError {}
impl std::error::Error for Closed {}

impl From<Closed> for PopError {
    fn from(_: Closed) -> Self {
        Self::Closed
    }
}
