//! Conversions between generated protobuf messages and plain types.

use crate::{
    proto,
    types::{Ack, ChatLine, UserReply},
};
use userbase::{NewUser, UserId, UserPatch, UserRecord};

impl From<UserRecord> for proto::User {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            username: record.username,
            email: record.email,
            age: record.age,
            created_at: record.created_at,
        }
    }
}

impl From<proto::User> for UserRecord {
    fn from(user: proto::User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            age: user.age,
            created_at: user.created_at,
        }
    }
}

impl From<proto::CreateUserRequest> for NewUser {
    fn from(req: proto::CreateUserRequest) -> Self {
        Self {
            username: req.username,
            email: req.email,
            age: req.age,
        }
    }
}

impl From<NewUser> for proto::CreateUserRequest {
    fn from(user: NewUser) -> Self {
        Self {
            username: user.username,
            email: user.email,
            age: user.age,
        }
    }
}

impl From<proto::UpdateUserRequest> for (UserId, UserPatch) {
    fn from(req: proto::UpdateUserRequest) -> Self {
        (
            req.user_id,
            UserPatch::from_sparse(req.username, req.email, req.age),
        )
    }
}

/// Encodes a patch for the wire, where absent fields travel as empty strings
/// and a zero age.
pub fn update_request(id: UserId, patch: UserPatch) -> proto::UpdateUserRequest {
    proto::UpdateUserRequest {
        user_id: id,
        username: patch.username.unwrap_or_default(),
        email: patch.email.unwrap_or_default(),
        age: patch.age.unwrap_or_default(),
    }
}

impl From<proto::ChatMessage> for ChatLine {
    fn from(msg: proto::ChatMessage) -> Self {
        Self {
            sender_id: msg.sender_id,
            text: msg.text,
            timestamp: msg.timestamp,
        }
    }
}

impl From<ChatLine> for proto::ChatMessage {
    fn from(line: ChatLine) -> Self {
        Self {
            sender_id: line.sender_id,
            text: line.text,
            timestamp: line.timestamp,
        }
    }
}

impl From<proto::DeleteUserResponse> for Ack {
    fn from(resp: proto::DeleteUserResponse) -> Self {
        Self {
            success: resp.success,
            message: resp.message,
        }
    }
}

impl From<proto::CreateUserResponse> for Ack {
    fn from(resp: proto::CreateUserResponse) -> Self {
        Self {
            success: resp.success,
            message: resp.message,
        }
    }
}

/// Reply constructors and the [`UserReply`] conversion for the three
/// responses shaped `{success, message, user?}`.
macro_rules! user_reply {
    ($($resp:ty),+ $(,)?) => {$(
        impl $resp {
            pub fn success(message: impl Into<String>, user: UserRecord) -> Self {
                Self {
                    success: true,
                    message: message.into(),
                    user: Some(user.into()),
                }
            }

            pub fn failure(message: impl Into<String>) -> Self {
                Self {
                    success: false,
                    message: message.into(),
                    user: None,
                }
            }
        }

        impl From<$resp> for UserReply {
            fn from(resp: $resp) -> Self {
                Self {
                    success: resp.success,
                    message: resp.message,
                    user: resp.user.map(UserRecord::from),
                }
            }
        }
    )+};
}

user_reply!(
    proto::CreateUserResponse,
    proto::GetUserResponse,
    proto::UpdateUserResponse,
);

impl proto::DeleteUserResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
