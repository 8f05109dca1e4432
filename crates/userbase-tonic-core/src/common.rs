//! Definitions shared by the gRPC server and its clients.
//!
//! - [`error`] - Service error type and its mapping onto `tonic::Status`.
//! - [`types`] - Plain reply types that cross the client boundary.
//! - [`convert`] - Conversions between protobuf messages and plain types.
//! - [`messages`] - Reply texts both sides agree on.

pub mod convert;
pub mod error;
pub mod messages;
pub mod types;

pub use error::{Error, Result};
