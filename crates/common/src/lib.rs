//! Common types, wire bodies, and errors shared across `fortune-api` crates.

pub mod error;
pub mod protocol;

pub use error::ServiceError;
pub use protocol::{Fortune, MessageResponse};
