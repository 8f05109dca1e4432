#![doc = include_str!("../README.md")]

mod common;
pub use common::*;
// Public re-export so downstream crates reach the record model through
// `userbase_tonic_core::userbase`.
pub use userbase;

/// Generated protobuf messages plus the `UserService` client and server.
pub mod proto {
    tonic::include_proto!("userbase");

    /// Encoded descriptor set for gRPC server reflection.
    pub const FILE_DESCRIPTOR_SET: &[u8] =
        tonic::include_file_descriptor_set!("userbase_descriptor");
}
