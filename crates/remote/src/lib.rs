//! HTTP client for the remote image-generation service.
//!
//! The service is a third-party REST API fronting a chat-bot based
//! generator. Every job is addressed by an opaque handle (`hash`) issued
//! when the job is accepted.

pub mod api;
pub mod config;

pub use api::{ImagineResponse, RelayedResponse, RemoteApi, RemoteApiError};
pub use config::RemoteConfig;
