/// Builds the gRPC client and server code for `proto/userbase.proto` using
/// `tonic-prost-build`.
///
/// Besides the Rust bindings, the build writes a file descriptor set to
/// `OUT_DIR/userbase_descriptor.bin` so the server can register it with the
/// reflection service.
///
/// # Panics
///
/// Panics if code generation fails, which fails the build with the `protoc`
/// diagnostics.
///
/// # Output
///
/// ```rust,ignore
/// pub mod proto {
///     tonic::include_proto!("userbase");
/// }
/// ```
use std::env;
use std::path::PathBuf;
fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let descriptor_path = out_dir.join("userbase_descriptor.bin");

    let mut config = tonic_prost_build::Config::new();
    config.file_descriptor_set_path(&descriptor_path);

    println!("cargo:rerun-if-changed=proto/userbase.proto");
    tonic_prost_build::configure()
        .compile_with_config(config, &["proto/userbase.proto"], &["proto"])
        .unwrap();
}
