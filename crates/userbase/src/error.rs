use core::fmt;

use crate::record::UserId;

pub type Result<T, E = StoreError> = core::result::Result<T, E>;

/// The unique columns of a [`UserRecord`](crate::UserRecord).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UniqueField {
    Username,
    Email,
}

impl fmt::Display for UniqueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Username => f.write_str("username"),
            Self::Email => f.write_str("email"),
        }
    }
}

/// The key a failed lookup was made with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lookup {
    Id(UserId),
    Username(String),
    Email(String),
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id {id}"),
            Self::Username(username) => write!(f, "username {username:?}"),
            Self::Email(email) => write!(f, "email {email:?}"),
        }
    }
}

/// Errors produced by a [`RecordStore`](crate::RecordStore).
///
/// `NotFound` and `Conflict` are expected outcomes that callers turn into
/// ordinary failure replies. `Internal` covers everything else a backing
/// store can run into.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No record matches the lookup key.
    #[error("no user with {0}")]
    NotFound(Lookup),

    /// The write would give two records the same value for a unique field.
    #[error("{0} already exists")]
    Conflict(UniqueField),

    /// The store failed for reasons unrelated to the request.
    #[error("store failure: {0}")]
    Internal(String),
}
