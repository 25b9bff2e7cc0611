//! The `error` module defines the error types used within `senkyou`.
//!
//! Each layer owns one enum: the broker, its persistence store and the
//! HTTP server. The HTTP adapter renders `BrokerError` as the plain text
//! body of a `400 Bad Request`, so the `Display` output is user facing.

use std::io;

/// Errors returned by a [`Broker`](crate::broker::Broker) implementation.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("topic name must not be empty")]
    InvalidTopic,

    #[error("topic '{topic}' already has the maximum of {limit} subscribers")]
    SubscriberLimit { topic: String, limit: usize },

    #[error("broker state is unavailable: a previous operation panicked")]
    Poisoned,

    #[error("persistence: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Errors raised by the sled backed message store.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("sled: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialize: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors that stop the server from starting or keep it from serving.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("config: {0}")]
    Config(#[from] config::ConfigError),

    #[error("bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("serve: {0}")]
    Serve(#[source] io::Error),

    #[error("persistence: {0}")]
    Persistence(#[from] PersistenceError),
}
