//! gRPC service implementation.
//!
//! ## Structure
//!
//! - [`handler`] - gRPC service entry point (`UserHandler`).
//! - [`replies`] - store outcomes rendered as unary replies.

pub mod handler;
pub mod replies;
#[cfg(test)]
mod tests;
