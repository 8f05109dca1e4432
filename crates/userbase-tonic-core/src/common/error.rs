//! Error type for the user service.
//!
//! Store outcomes such as "not found" and "already exists" never surface as
//! this type on the wire: the dispatcher turns them into ordinary failure
//! replies. [`Error`] covers what remains, and `From<Error>` for
//! [`tonic::Status`] picks the status code used when one of these has to
//! terminate a stream.
//!
//! ## Error Cases
//! - `ChannelError`: A send to or receive from an internal channel failed.
//! - `Store`: The record store failed.
//! - `RequestCancelled`: The client went away mid-call.
//! - `ServiceShutdown`: The call arrived or was running during shutdown.
//! - `Internal`: A store task panicked or was aborted.

use tonic::Status;
use userbase::StoreError;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Clone, thiserror::Error, Debug)]
pub enum Error {
    #[error("Channel error: {context}")]
    ChannelError { context: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Request cancelled by client")]
    RequestCancelled,

    #[error("Service is shutting down")]
    ServiceShutdown,

    #[error("{0}")]
    Internal(String),
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            Error::ChannelError { context } => {
                Status::internal(format!("Channel error: {context}"))
            }
            Error::Store(StoreError::NotFound(lookup)) => {
                Status::not_found(format!("no user with {lookup}"))
            }
            Error::Store(StoreError::Conflict(field)) => {
                Status::already_exists(format!("{field} already exists"))
            }
            Error::Store(e @ StoreError::Internal(_)) => Status::internal(e.to_string()),
            Error::RequestCancelled => Status::cancelled("Request was cancelled"),
            Error::ServiceShutdown => Status::unavailable("Service is shutting down"),
            Error::Internal(message) => Status::internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::Code;
    use userbase::{Lookup, UniqueField};

    #[test]
    fn status_codes_follow_error_kind() {
        let cases = [
            (Error::Store(StoreError::NotFound(Lookup::Id(3))), Code::NotFound),
            (Error::Store(StoreError::Conflict(UniqueField::Email)), Code::AlreadyExists),
            (Error::Store(StoreError::Internal("disk".into())), Code::Internal),
            (Error::RequestCancelled, Code::Cancelled),
            (Error::ServiceShutdown, Code::Unavailable),
            (Error::ChannelError { context: "closed".into() }, Code::Internal),
        ];
        for (err, code) in cases {
            assert_eq!(Status::from(err).code(), code);
        }
    }

    #[test]
    fn store_errors_keep_their_message() {
        let status = Status::from(Error::Store(StoreError::Internal("disk full".into())));
        assert_eq!(status.message(), "store failure: disk full");
        assert_eq!(
            Error::from(StoreError::Conflict(UniqueField::Username)).to_string(),
            "username already exists"
        );
    }
}
