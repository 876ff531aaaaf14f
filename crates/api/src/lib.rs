//! Imagine proxy server library.
//!
//! Exposes the building blocks (config, state, error handling, routes,
//! job store, background tasks) so integration tests and the binary
//! entrypoint can both access them.

pub mod background;
pub mod config;
pub mod error;
pub mod handlers;
pub mod job_store;
pub mod router;
pub mod routes;
pub mod state;
