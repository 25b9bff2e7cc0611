//! The `utils` module provides a collection of utility functions and common
//! definitions used across the `senkyou` application.
//!
//! It holds the error types shared by every layer and the tracing setup
//! used by the binary.

pub mod error;
pub mod logging;
