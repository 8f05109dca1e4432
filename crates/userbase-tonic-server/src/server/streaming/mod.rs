//! Channel-level drivers for the three streaming call shapes.
//!
//! Each driver consumes a plain `Stream` of inbound messages and/or feeds an
//! `mpsc::Sender` of outbound results, so the gRPC handler only wires tonic
//! types to these functions. An outbound stream ends normally when its
//! sender is dropped, and ends with an error when an `Err(Status)` is sent.
//!
//! - [`list`] - server streaming: pages through the store.
//! - [`batch`] - client streaming: one create per message, one tally reply.
//! - [`chat`] - bidirectional: one echo per message, then a farewell.

pub mod batch;
pub mod chat;
pub mod list;
