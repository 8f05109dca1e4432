use anyhow::bail;
use clap::Parser;
use core::time::Duration;

/// Runtime configuration for the `userbase-tonic-server` binary.
///
/// Every value can be given as a CLI flag or an environment variable (a
/// `.env` file is loaded first).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "userbase-tonic-server",
    version,
    about = "A gRPC service for user records with unary and streaming calls"
)]
pub struct CliArgs {
    /// Address to listen on (TCP or Unix socket path; use --uds for Unix socket).
    ///
    /// Example: "0.0.0.0:50051" or "/tmp/userbase.sock"
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:50051"))]
    pub server_addr: String,

    /// Listen on a Unix socket instead of TCP. If set, `SERVER_ADDR` must be a file path.
    #[arg(short, long, default_value_t = false)]
    pub uds: bool,

    /// Capacity of the outbound channel behind each streaming response.
    ///
    /// The producing task waits once this many messages are queued for a
    /// slow client.
    ///
    /// Environment variable: `STREAM_BUFFER_SIZE`
    #[arg(long, env = "STREAM_BUFFER_SIZE", default_value_t = 8)]
    pub stream_buffer_size: usize,

    /// Store page size for `ListUsers` when the request does not give one.
    ///
    /// Environment variable: `DEFAULT_PAGE_SIZE`
    #[arg(long, env = "DEFAULT_PAGE_SIZE", default_value_t = 10)]
    pub default_page_size: usize,

    /// Upper bound on the store page size a `ListUsers` request may ask for.
    ///
    /// Environment variable: `MAX_PAGE_SIZE`
    #[arg(long, env = "MAX_PAGE_SIZE", default_value_t = 500)]
    pub max_page_size: usize,

    /// Delay between records streamed by `ListUsers`, in milliseconds.
    ///
    /// Zero disables pacing. Useful for watching the stream arrive record by
    /// record.
    ///
    /// Environment variable: `LIST_PACING_MS`
    #[arg(long, env = "LIST_PACING_MS", default_value_t = 0)]
    pub list_pacing_ms: u64,

    /// Seconds to wait for in-flight streams to finish during shutdown.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT`
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 3)]
    pub shutdown_timeout: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: String,
    pub uds: bool,
    pub stream_buffer_size: usize,
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub list_pacing: Duration,
    pub shutdown_timeout: Duration,
}

impl ServerConfig {
    /// Resolves a request's page size hint to the store page size.
    ///
    /// Non-positive hints select the default; larger ones are clamped.
    pub fn page_size(&self, hint: i32) -> usize {
        match usize::try_from(hint) {
            Ok(0) | Err(_) => self.default_page_size,
            Ok(n) => n.min(self.max_page_size),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_addr: String::from("0.0.0.0:50051"),
            uds: false,
            stream_buffer_size: 8,
            default_page_size: 10,
            max_page_size: 500,
            list_pacing: Duration::ZERO,
            shutdown_timeout: Duration::from_secs(3),
        }
    }
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.stream_buffer_size == 0 {
            bail!("STREAM_BUFFER_SIZE must be greater than 0");
        }

        if args.default_page_size == 0 {
            bail!("DEFAULT_PAGE_SIZE must be greater than 0");
        }

        if args.max_page_size < args.default_page_size {
            bail!(
                "MAX_PAGE_SIZE ({}) must not be smaller than DEFAULT_PAGE_SIZE ({})",
                args.max_page_size,
                args.default_page_size
            );
        }

        Ok(Self {
            server_addr: args.server_addr,
            uds: args.uds,
            stream_buffer_size: args.stream_buffer_size,
            default_page_size: args.default_page_size,
            max_page_size: args.max_page_size,
            list_pacing: Duration::from_millis(args.list_pacing_ms),
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<ServerConfig> {
        let argv = core::iter::once("userbase-tonic-server").chain(args.iter().copied());
        ServerConfig::try_from(CliArgs::try_parse_from(argv)?)
    }

    #[test]
    fn defaults_are_valid() {
        let config = parse(&[]).unwrap();
        assert_eq!(config.stream_buffer_size, 8);
        assert_eq!(config.list_pacing, Duration::ZERO);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(3));
    }

    #[test]
    fn rejects_zero_buffer_and_inverted_page_bounds() {
        assert!(parse(&["--stream-buffer-size", "0"]).is_err());
        assert!(parse(&["--default-page-size", "0"]).is_err());
        assert!(parse(&["--default-page-size", "50", "--max-page-size", "20"]).is_err());
    }

    #[test]
    fn page_size_hint_is_defaulted_and_clamped() {
        let config = parse(&["--default-page-size", "10", "--max-page-size", "100"]).unwrap();
        assert_eq!(config.page_size(0), 10);
        assert_eq!(config.page_size(-3), 10);
        assert_eq!(config.page_size(25), 25);
        assert_eq!(config.page_size(1_000), 100);
    }
}
