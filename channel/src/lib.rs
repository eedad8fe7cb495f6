//! Bounded, closable channel for the fanpipe pipeline.
//!
//! [`BoundedChannel`] carries items from many producers to one or more
//! consumers through a fixed-capacity queue:
//!
//! - **Backpressure** - [`push`](BoundedChannel::push) blocks while the queue is full.
//! - **Explicit closure** - after [`close`](BoundedChannel::close), pushes fail and
//!   hand their item back; queued items remain drainable.
//! - **Clean termination** - [`pop`](BoundedChannel::pop) and
//!   [`drain`](BoundedChannel::drain) end once the channel is closed and empty.
//!
//! The crate knows nothing about what flows through it.
//!
//! # Example
//!
//! ```
//! use channel::BoundedChannel;
//!
//! let channel = BoundedChannel::with_capacity(4).unwrap();
//! channel.push(1).unwrap();
//! channel.push(2).unwrap();
//! channel.close();
//!
//! assert!(channel.push(3).unwrap_err().is_closed());
//! let drained: Vec<_> = channel.drain().collect();
//! assert_eq!(drained, vec![1, 2]);
//! ```

mod bounded;
mod error;

pub use bounded::{BoundedChannel, ChannelStats, Drain};
pub use error::{ChannelError, ChannelResult, Closed, PopError, PushError};
