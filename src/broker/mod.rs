//! The `broker` module defines the contract the HTTP adapter delegates to
//! and ships an in-memory implementation of it.
//!
//! A [`Broker`] accepts opaque payloads for a topic and hands out
//! [`Subscription`]s, explicit message streams that the caller drains at
//! its own pace.

pub mod engine;
pub mod message;
pub mod subscription;
pub mod topic;

pub use engine::InMemoryBroker;
pub use message::Message;
pub use subscription::Subscription;

use crate::utils::error::BrokerError;

/// Publish/subscribe messaging as seen by the transport layer.
pub trait Broker: Send + Sync {
    /// Hands `payload` to every current subscriber of `topic`.
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), BrokerError>;

    /// Registers a new subscriber on `topic`. Messages arrive on the
    /// returned stream until it is dropped.
    fn subscribe(&self, topic: &str) -> Result<Subscription, BrokerError>;
}

#[cfg(test)]
mod tests;
