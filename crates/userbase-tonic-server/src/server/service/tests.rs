use super::handler::UserHandler;
use crate::server::config::ServerConfig;
use futures::StreamExt;
use std::sync::Arc;
use tonic::{Code, Request};
use userbase::{MemoryStore, NewUser, RecordStore, StoreError, UserPatch, UserRecord};
use userbase_tonic_core::proto::{
    CreateUserRequest, DeleteUserRequest, GetUserRequest, ListUsersRequest, UpdateUserRequest,
    user_service_server::UserService,
};

fn handler() -> UserHandler<MemoryStore> {
    UserHandler::new(Arc::new(MemoryStore::new()), ServerConfig::default())
}

fn create_req(username: &str, email: &str, age: i32) -> Request<CreateUserRequest> {
    Request::new(CreateUserRequest {
        username: username.into(),
        email: email.into(),
        age,
    })
}

fn update_req(user_id: u64, username: &str, email: &str, age: i32) -> Request<UpdateUserRequest> {
    Request::new(UpdateUserRequest {
        user_id,
        username: username.into(),
        email: email.into(),
        age,
    })
}

async fn create(svc: &UserHandler<MemoryStore>, username: &str, email: &str) -> u64 {
    let reply = svc
        .create_user(create_req(username, email, 30))
        .await
        .unwrap()
        .into_inner();
    assert!(reply.success, "{}", reply.message);
    reply.user.unwrap().id
}

#[tokio::test]
async fn create_then_get() {
    let svc = handler();
    let reply = svc
        .create_user(create_req("ann", "ann@example.com", 41))
        .await
        .unwrap()
        .into_inner();
    assert!(reply.success);
    assert_eq!(reply.message, "user created");
    let user = reply.user.unwrap();
    assert_eq!(user.username, "ann");
    assert_eq!(user.age, 41);
    assert!(user.created_at > 0);

    let got = svc
        .get_user(Request::new(GetUserRequest { user_id: user.id }))
        .await
        .unwrap()
        .into_inner();
    assert!(got.success);
    assert_eq!(got.message, "user found");
    assert_eq!(got.user.unwrap(), user);
}

#[tokio::test]
async fn create_rejects_empty_fields_and_duplicates() {
    let svc = handler();
    create(&svc, "ann", "ann@example.com").await;

    let cases = [
        ("", "x@example.com", "username and email must not be empty"),
        ("x", "", "username and email must not be empty"),
        ("ann", "other@example.com", "username already exists"),
        ("other", "ann@example.com", "email already exists"),
    ];
    for (username, email, expected) in cases {
        let reply = svc
            .create_user(create_req(username, email, 1))
            .await
            .unwrap()
            .into_inner();
        assert!(!reply.success);
        assert_eq!(reply.message, expected);
        assert!(reply.user.is_none());
    }
    assert_eq!(svc.store().len(), 1);
}

#[tokio::test]
async fn missing_records_are_failure_replies() {
    let svc = handler();
    let get = svc
        .get_user(Request::new(GetUserRequest { user_id: 99 }))
        .await
        .unwrap()
        .into_inner();
    assert!(!get.success);
    assert_eq!(get.message, "user not found");

    let update = svc
        .update_user(update_req(99, "x", "", 0))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(update.message, "user not found");

    let delete = svc
        .delete_user(Request::new(DeleteUserRequest { user_id: 99 }))
        .await
        .unwrap()
        .into_inner();
    assert!(!delete.success);
    assert_eq!(delete.message, "user not found");
}

#[tokio::test]
async fn update_only_touches_present_fields() {
    let svc = handler();
    let id = create(&svc, "ann", "ann@example.com").await;

    let reply = svc
        .update_user(update_req(id, "", "new@example.com", 0))
        .await
        .unwrap()
        .into_inner();
    assert!(reply.success);
    assert_eq!(reply.message, "user updated");
    let user = reply.user.unwrap();
    assert_eq!(user.username, "ann");
    assert_eq!(user.email, "new@example.com");
    assert_eq!(user.age, 30);
}

#[tokio::test]
async fn update_into_another_users_name_is_refused() {
    let svc = handler();
    let ann = create(&svc, "ann", "ann@example.com").await;
    create(&svc, "bob", "bob@example.com").await;

    let reply = svc
        .update_user(update_req(ann, "bob", "", 0))
        .await
        .unwrap()
        .into_inner();
    assert!(!reply.success);
    assert_eq!(reply.message, "username already in use by another user");

    let reply = svc
        .update_user(update_req(ann, "", "bob@example.com", 0))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(reply.message, "email already in use by another user");

    assert_eq!(svc.store().get_by_id(ann).unwrap().username, "ann");
}

#[tokio::test]
async fn delete_removes_the_record() {
    let svc = handler();
    let id = create(&svc, "ann", "ann@example.com").await;

    let reply = svc
        .delete_user(Request::new(DeleteUserRequest { user_id: id }))
        .await
        .unwrap()
        .into_inner();
    assert!(reply.success);
    assert_eq!(reply.message, "user deleted");
    assert!(svc.store().is_empty());
}

#[tokio::test]
async fn list_streams_every_record() {
    let svc = handler();
    for i in 0..25 {
        create(&svc, &format!("u{i}"), &format!("u{i}@example.com")).await;
    }

    let stream = svc
        .list_users(Request::new(ListUsersRequest { page_size: 4 }))
        .await
        .unwrap()
        .into_inner();
    let users: Vec<_> = stream.map(Result::unwrap).collect().await;
    assert_eq!(users.len(), 25);
    assert!(users.windows(2).all(|w| w[0].id < w[1].id));
}

#[tokio::test]
async fn shutdown_refuses_new_calls() {
    let svc = handler();
    svc.shutdown().await;

    let status = svc
        .create_user(create_req("ann", "ann@example.com", 1))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::Unavailable);

    let status = svc
        .list_users(Request::new(ListUsersRequest::default()))
        .await
        .err()
        .unwrap();
    assert_eq!(status.code(), Code::Unavailable);
}

/// Store whose every call panics.
struct Exploding;

impl RecordStore for Exploding {
    fn create(&self, _: NewUser) -> userbase::Result<UserRecord> {
        panic!("disk on fire")
    }
    fn get_by_id(&self, _: u64) -> userbase::Result<UserRecord> {
        Err(StoreError::Internal("disk on fire".into()))
    }
    fn get_by_username(&self, _: &str) -> userbase::Result<UserRecord> {
        unreachable!()
    }
    fn get_by_email(&self, _: &str) -> userbase::Result<UserRecord> {
        unreachable!()
    }
    fn update(&self, _: u64, _: UserPatch) -> userbase::Result<UserRecord> {
        panic!("disk on fire")
    }
    fn delete(&self, _: u64) -> userbase::Result<()> {
        Err(StoreError::Internal("disk on fire".into()))
    }
    fn list_page(&self, _: Option<u64>, _: usize) -> userbase::Result<Vec<UserRecord>> {
        Err(StoreError::Internal("disk on fire".into()))
    }
}

#[tokio::test]
async fn store_failures_become_internal_error_replies() {
    let svc = UserHandler::new(Arc::new(Exploding), ServerConfig::default());

    let create = svc
        .create_user(create_req("ann", "ann@example.com", 1))
        .await
        .unwrap()
        .into_inner();
    assert!(!create.success);
    assert!(create.message.starts_with("internal error: "));
    assert!(create.message.contains("disk on fire"));

    let get = svc
        .get_user(Request::new(GetUserRequest { user_id: 1 }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(get.message, "internal error: store failure: disk on fire");

    let update = svc
        .update_user(update_req(1, "x", "", 0))
        .await
        .unwrap()
        .into_inner();
    assert!(update.message.starts_with("internal error: "));

    let delete = svc
        .delete_user(Request::new(DeleteUserRequest { user_id: 1 }))
        .await
        .unwrap()
        .into_inner();
    assert!(!delete.success);
}

#[tokio::test]
async fn list_failure_is_a_stream_error() {
    let svc = UserHandler::new(Arc::new(Exploding), ServerConfig::default());
    let mut stream = svc
        .list_users(Request::new(ListUsersRequest::default()))
        .await
        .unwrap()
        .into_inner();
    let status = stream.next().await.unwrap().unwrap_err();
    assert_eq!(status.code(), Code::Internal);
    assert!(stream.next().await.is_none());
}
