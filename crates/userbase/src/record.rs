use serde::{Deserialize, Serialize};

/// Identifier assigned to a record by the store. Never reused.
pub type UserId = u64;

/// A stored user.
///
/// `id` and `created_at` are assigned by the store on insert and never change
/// afterwards. `username` and `email` are unique across the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub age: i32,
    /// Unix time in milliseconds.
    pub created_at: i64,
}

/// Input for creating a record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub age: i32,
}

impl NewUser {
    pub fn new(username: impl Into<String>, email: impl Into<String>, age: i32) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            age,
        }
    }

    /// Both unique fields must be non-empty.
    pub fn is_valid(&self) -> bool {
        !self.username.is_empty() && !self.email.is_empty()
    }
}

/// A partial update. `None` leaves the stored value untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub age: Option<i32>,
}

impl UserPatch {
    /// Builds a patch from wire-style fields where an empty string or a
    /// non-positive age means "not provided".
    pub fn from_sparse(username: String, email: String, age: i32) -> Self {
        Self {
            username: Some(username).filter(|s| !s.is_empty()),
            email: Some(email).filter(|s| !s.is_empty()),
            age: Some(age).filter(|age| *age > 0),
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none() && self.age.is_none()
    }
}
