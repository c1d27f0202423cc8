//! Middleware for observability.
//!
//! Request logging with latency tracking; access-control middleware lives
//! with the auth module.

pub mod logging;

pub use logging::request_logging;
