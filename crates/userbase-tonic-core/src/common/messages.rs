//! Reply texts produced by the dispatcher.
//!
//! Failure replies are ordinary messages with `success = false`; clients and
//! tests match on these strings.

pub const INVALID_FIELDS: &str = "username and email must not be empty";
pub const USER_CREATED: &str = "user created";
pub const USER_FOUND: &str = "user found";
pub const USER_UPDATED: &str = "user updated";
pub const USER_DELETED: &str = "user deleted";
pub const USER_NOT_FOUND: &str = "user not found";
pub const USERNAME_EXISTS: &str = "username already exists";
pub const EMAIL_EXISTS: &str = "email already exists";
pub const USERNAME_IN_USE: &str = "username already in use by another user";
pub const EMAIL_IN_USE: &str = "email already in use by another user";

/// Synthetic reply text when a client gives up waiting.
pub const TIMEOUT: &str = "timeout";

/// Farewell sent when the client ends a chat.
pub const FAREWELL: &str = "chat session ended, goodbye";

/// `sender_id` used on every message the server emits in a chat.
pub const SERVER_SENDER_ID: i64 = 0;

pub fn internal_error(cause: impl core::fmt::Display) -> String {
    format!("internal error: {cause}")
}

pub fn batch_completed(succeeded: usize, failed: usize) -> String {
    format!("completed: {succeeded} succeeded, {failed} failed")
}

pub fn batch_failed(cause: impl core::fmt::Display) -> String {
    format!("batch create failed: {cause}")
}

pub fn echo(text: &str) -> String {
    format!("server received: {text}")
}
