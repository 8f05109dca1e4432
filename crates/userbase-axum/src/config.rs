use crate::client::ClientConfig;
use anyhow::bail;
use clap::Parser;
use core::time::Duration;

/// Runtime configuration for the `userbase-axum` HTTP gateway.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "userbase-axum",
    version,
    about = "HTTP/JSON gateway in front of the userbase gRPC service"
)]
pub struct CliArgs {
    /// Address the HTTP gateway listens on.
    ///
    /// Environment variable: `GATEWAY_ADDR`
    #[arg(long, env = "GATEWAY_ADDR", default_value_t = String::from("0.0.0.0:8080"))]
    pub listen_addr: String,

    /// URI of the gRPC user service.
    ///
    /// Environment variable: `USER_SERVICE_URI`
    #[arg(long, env = "USER_SERVICE_URI", default_value_t = String::from("http://127.0.0.1:50051"))]
    pub server_uri: String,

    /// Seconds a call may take before it is reported as timed out.
    ///
    /// For batch create and chat the clock starts once the last message has
    /// been sent.
    ///
    /// Environment variable: `CALL_TIMEOUT`
    #[arg(long, env = "CALL_TIMEOUT", default_value_t = 30)]
    pub call_timeout: u64,

    /// Delay between streamed messages sent by the gateway, in milliseconds.
    ///
    /// Environment variable: `SEND_PACING_MS`
    #[arg(long, env = "SEND_PACING_MS", default_value_t = 0)]
    pub send_pacing_ms: u64,

    /// `sender_id` stamped on chat messages the gateway sends.
    ///
    /// Environment variable: `CHAT_SENDER_ID`
    #[arg(long, env = "CHAT_SENDER_ID", default_value_t = 1)]
    pub chat_sender_id: i64,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub listen_addr: String,
    pub server_uri: String,
    pub client: ClientConfig,
}

impl TryFrom<CliArgs> for GatewayConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.call_timeout == 0 {
            bail!("CALL_TIMEOUT must be greater than 0");
        }

        let call_timeout = Duration::from_secs(args.call_timeout);
        let send_pacing = Duration::from_millis(args.send_pacing_ms);
        if send_pacing >= call_timeout {
            bail!(
                "SEND_PACING_MS ({}) must be shorter than CALL_TIMEOUT ({}s)",
                args.send_pacing_ms,
                args.call_timeout
            );
        }

        Ok(Self {
            listen_addr: args.listen_addr,
            server_uri: args.server_uri,
            client: ClientConfig {
                call_timeout,
                send_pacing,
                chat_sender_id: args.chat_sender_id,
            },
        })
    }
}
