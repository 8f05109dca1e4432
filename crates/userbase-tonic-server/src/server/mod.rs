//! Server internals: configuration, call lifecycle, the service handler,
//! streaming drivers and telemetry.

pub mod blocking;
pub mod config;
pub mod lifecycle;
pub mod service;
pub mod streaming;
pub mod telemetry;

use service::handler::UserHandler;
use tonic::codec::CompressionEncoding;
use userbase::RecordStore;
use userbase_tonic_core::proto::user_service_server::UserServiceServer;

/// Wraps `handler` in the generated server with zstd, gzip and deflate
/// enabled in both directions.
pub fn build_user_service<S: RecordStore>(
    handler: UserHandler<S>,
) -> UserServiceServer<UserHandler<S>> {
    UserServiceServer::new(handler)
        .send_compressed(CompressionEncoding::Zstd)
        .send_compressed(CompressionEncoding::Gzip)
        .send_compressed(CompressionEncoding::Deflate)
        .accept_compressed(CompressionEncoding::Zstd)
        .accept_compressed(CompressionEncoding::Gzip)
        .accept_compressed(CompressionEncoding::Deflate)
}
