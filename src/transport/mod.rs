//! The `transport` module exposes the broker over HTTP.
//!
//! It maps three routes onto broker calls: a liveness check, publishing a
//! request body to a topic and registering a subscriber that logs what it
//! receives.

pub mod http;

pub use http::{LIVENESS_BODY, MessageSink, SenkyouServer};
