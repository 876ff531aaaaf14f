//! Domain types shared by the imagine proxy server and the client job
//! tracker.
//!
//! Nothing in this crate performs I/O. The HTTP layers on either side
//! (`imagine-api`, `imagine-remote`, `imagine-tracker`) exchange the
//! wire types defined in [`status`] and drive the job model in [`job`].

pub mod error;
pub mod job;
pub mod prompt;
pub mod status;
pub mod types;
