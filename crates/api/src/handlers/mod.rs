//! Request handlers for the proxy endpoints.
//!
//! Each handler validates its input, forwards the call to the remote
//! generation service through [`RemoteApi`](imagine_remote::RemoteApi),
//! records the outcome in the job store, and relays the response.

pub mod derivative;
pub mod generate;
pub mod history;
pub mod status;
