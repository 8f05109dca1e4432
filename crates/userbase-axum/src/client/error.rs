use core::time::Duration;
use tonic::Status;

/// Why a call produced no reply.
///
/// Application-level failures (a missing record, a taken username) are not
/// errors: they arrive as replies with `success = false`.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("failed to connect to {uri}: {reason}")]
    Connect { uri: String, reason: String },

    #[error("remote call failed: {0}")]
    Remote(String),

    #[error("call timed out after {0:?}")]
    TimedOut(Duration),
}

impl From<Status> for ClientError {
    fn from(status: Status) -> Self {
        Self::Remote(describe(&status))
    }
}

/// Status message, or the code's description when the message is empty.
pub(crate) fn describe(status: &Status) -> String {
    if status.message().is_empty() {
        status.code().description().to_string()
    } else {
        status.message().to_string()
    }
}
