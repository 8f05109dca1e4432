//! Store outcomes rendered as unary replies.
//!
//! Every function here always produces a reply: lookup misses, uniqueness
//! conflicts, invalid input and store failures all become `success = false`
//! with a fixed message rather than a gRPC error status.

use crate::server::{blocking::with_store, telemetry::increment_users_created};
use userbase::{NewUser, RecordStore, StoreError, UniqueField, UserId, UserPatch};
use userbase_tonic_core::{Error, messages, proto};
use std::sync::Arc;

pub async fn create<S: RecordStore>(store: &Arc<S>, user: NewUser) -> proto::CreateUserResponse {
    if !user.is_valid() {
        return proto::CreateUserResponse::failure(messages::INVALID_FIELDS);
    }

    match with_store(store, move |s| s.create(user)).await {
        Ok(record) => {
            tracing::debug!(id = record.id, "user created");
            increment_users_created(1);
            proto::CreateUserResponse::success(messages::USER_CREATED, record)
        }
        Err(Error::Store(StoreError::Conflict(field))) => {
            tracing::debug!(%field, "create rejected");
            proto::CreateUserResponse::failure(match field {
                UniqueField::Username => messages::USERNAME_EXISTS,
                UniqueField::Email => messages::EMAIL_EXISTS,
            })
        }
        Err(e) => {
            tracing::error!("create failed: {e}");
            proto::CreateUserResponse::failure(messages::internal_error(e))
        }
    }
}

pub async fn get<S: RecordStore>(store: &Arc<S>, id: UserId) -> proto::GetUserResponse {
    match with_store(store, move |s| s.get_by_id(id)).await {
        Ok(record) => proto::GetUserResponse::success(messages::USER_FOUND, record),
        Err(Error::Store(StoreError::NotFound(_))) => {
            proto::GetUserResponse::failure(messages::USER_NOT_FOUND)
        }
        Err(e) => {
            tracing::error!("get failed: {e}");
            proto::GetUserResponse::failure(messages::internal_error(e))
        }
    }
}

pub async fn update<S: RecordStore>(
    store: &Arc<S>,
    id: UserId,
    patch: UserPatch,
) -> proto::UpdateUserResponse {
    match with_store(store, move |s| s.update(id, patch)).await {
        Ok(record) => proto::UpdateUserResponse::success(messages::USER_UPDATED, record),
        Err(Error::Store(StoreError::NotFound(_))) => {
            proto::UpdateUserResponse::failure(messages::USER_NOT_FOUND)
        }
        Err(Error::Store(StoreError::Conflict(field))) => {
            tracing::debug!(%field, id, "update rejected");
            proto::UpdateUserResponse::failure(match field {
                UniqueField::Username => messages::USERNAME_IN_USE,
                UniqueField::Email => messages::EMAIL_IN_USE,
            })
        }
        Err(e) => {
            tracing::error!("update failed: {e}");
            proto::UpdateUserResponse::failure(messages::internal_error(e))
        }
    }
}

pub async fn delete<S: RecordStore>(store: &Arc<S>, id: UserId) -> proto::DeleteUserResponse {
    match with_store(store, move |s| s.delete(id)).await {
        Ok(()) => proto::DeleteUserResponse::success(messages::USER_DELETED),
        Err(Error::Store(StoreError::NotFound(_))) => {
            proto::DeleteUserResponse::failure(messages::USER_NOT_FOUND)
        }
        Err(e) => {
            tracing::error!("delete failed: {e}");
            proto::DeleteUserResponse::failure(messages::internal_error(e))
        }
    }
}
