//! # Senkyou
//!
//! `senkyou` is a small publish/subscribe service reachable over plain HTTP.
//!
//! ## Core Modules
//!
//! - `broker`: the `Broker` contract and an in-memory implementation with
//!   optional replay from disk.
//! - `config`: loads server, broker and logging settings.
//! - `persistence`: sled backed message history.
//! - `transport`: the HTTP routes `/`, `/pub/{topic}/` and `/sub/{topic}/`.
//! - `utils`: error types and tracing setup.

pub mod broker;
pub mod config;
pub mod persistence;
pub mod transport;
pub mod utils;
