//! Client-side job tracking for the imagine proxy.
//!
//! [`JobTracker`] submits prompts through a [`GenerationBackend`], polls
//! each returned handle until it reaches a terminal state, and manages
//! upscale/variation jobs derived from finished grids. [`HttpBackend`]
//! talks to the `/api/*` proxy endpoints served by `imagine-api`.

pub mod backend;
pub mod config;
pub mod error;
pub mod events;
pub mod http;
pub mod tracker;

pub use backend::{BackendError, GenerationBackend};
pub use config::TrackerConfig;
pub use error::TrackerError;
pub use events::TrackerEvent;
pub use http::HttpBackend;
pub use tracker::{ActionKey, JobTracker};
