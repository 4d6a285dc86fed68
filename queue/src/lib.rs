//! Message queue abstraction for the anchor relay.
//!
//! The worker talks to its broker through the [`MessageQueue`] trait:
//! publish a message to a topic, subscribe a handler to a topic, and signal
//! per-delivery completion through a [`Delivery`] handle. Redelivery on
//! negative acknowledgement (or on a crashed consumer) is the broker's
//! responsibility and the sole retry mechanism the worker relies on.
//!
//! [`MemoryQueue`] is the provided in-process broker for standalone
//! operation and tests; production deployments substitute a durable
//! broker-backed implementation behind the same trait.

pub mod delivery;
pub mod error;
pub mod memory;
pub mod queue;

pub use delivery::{Delivery, Disposition};
pub use error::QueueError;
pub use memory::MemoryQueue;
pub use queue::{MessageHandler, MessageQueue, Subscription};
