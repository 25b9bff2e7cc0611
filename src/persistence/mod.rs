//! The `persistence` module stores published messages so that a new
//! subscriber can be replayed the recent history of its topic.
//!
//! It uses `sled` as an embedded key-value store with one tree per topic.

pub mod sled_store;

pub use sled_store::Persistence;
