//! HTTP/JSON routes in front of the gRPC service.
//!
//! Each route maps onto one [`UserClient`] call. Application outcomes (a
//! missing record, a taken username) are `200 OK` with `success: false` in
//! the body. A call that produced no reply maps to `502 Bad Gateway`, or
//! `504 Gateway Timeout` when it ran out of time.

use crate::client::{ClientError, Outcome, UserClient};
use axum::{
    Json, Router,
    extract::{Path, State, rejection::PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use userbase::{NewUser, UserId, UserPatch, UserRecord, unix_millis};
use userbase_tonic_core::{
    messages,
    types::{Ack, ChatLine},
};

/// Page size hint sent with every listing.
const LIST_PAGE_SIZE: i32 = 10;

pub struct AppState {
    pub client: UserClient,
    /// Where the client points, reported by `/health`.
    pub grpc_target: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/users", post(create_user).get(list_users))
        .route(
            "/api/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/api/users/batch", post(batch_create))
        .route("/api/users/chat", post(chat))
        .route("/health", get(health))
        .route("/info", get(info))
        .with_state(state)
}

/// Body of `PUT /api/users/{id}`. Empty strings and a non-positive age
/// leave the stored value alone.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateBody {
    pub username: String,
    pub email: String,
    pub age: i32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListReply {
    pub success: bool,
    pub message: String,
    pub users: Vec<UserRecord>,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub success: bool,
    pub message: String,
    pub responses: Vec<ChatLine>,
}

fn error_status(err: &ClientError) -> StatusCode {
    match err {
        ClientError::TimedOut(_) => StatusCode::GATEWAY_TIMEOUT,
        ClientError::Connect { .. } | ClientError::Remote(_) => StatusCode::BAD_GATEWAY,
    }
}

fn outcome_status(outcome: &Outcome) -> StatusCode {
    match outcome {
        Outcome::Success => StatusCode::OK,
        Outcome::Failure(_) => StatusCode::BAD_GATEWAY,
        Outcome::Timeout => StatusCode::GATEWAY_TIMEOUT,
    }
}

/// Message for a streaming outcome, `success` standing in for the happy path.
fn outcome_message(outcome: &Outcome, success: &str) -> String {
    match outcome {
        Outcome::Success => success.to_string(),
        Outcome::Failure(reason) => reason.clone(),
        Outcome::Timeout => messages::TIMEOUT.to_string(),
    }
}

fn reply<T: Serialize>(result: Result<T, ClientError>) -> Response {
    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(e) => (error_status(&e), Json(Ack::failure(e.to_string()))).into_response(),
    }
}

/// Unwraps the `{id}` segment, or answers 400 with a failure body.
fn user_id(path: Result<Path<UserId>, PathRejection>) -> Result<UserId, Response> {
    path.map(|Path(id)| id).map_err(|rejection| {
        tracing::warn!("Rejected user id: {}", rejection.body_text());
        let body = Ack::failure(format!("invalid user id: {}", rejection.body_text()));
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    })
}

async fn create_user(State(state): State<Arc<AppState>>, Json(user): Json<NewUser>) -> Response {
    tracing::info!(username = %user.username, email = %user.email, "POST /api/users");
    reply(state.client.create_user(user).await)
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    path: Result<Path<UserId>, PathRejection>,
) -> Response {
    let id = match user_id(path) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    tracing::info!(id, "GET /api/users/{{id}}");
    reply(state.client.get_user(id).await)
}

async fn list_users(State(state): State<Arc<AppState>>) -> Response {
    tracing::info!("GET /api/users");
    let settled = state.client.list_users(LIST_PAGE_SIZE).await;
    let body = ListReply {
        success: settled.outcome.is_success(),
        message: outcome_message(&settled.outcome, "users listed"),
        count: settled.value.len(),
        users: settled.value,
    };
    (outcome_status(&settled.outcome), Json(body)).into_response()
}

async fn update_user(
    State(state): State<Arc<AppState>>,
    path: Result<Path<UserId>, PathRejection>,
    Json(body): Json<UpdateBody>,
) -> Response {
    let id = match user_id(path) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    tracing::info!(id, ?body, "PUT /api/users/{{id}}");
    let patch = UserPatch::from_sparse(body.username, body.email, body.age);
    reply(state.client.update_user(id, patch).await)
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    path: Result<Path<UserId>, PathRejection>,
) -> Response {
    let id = match user_id(path) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    tracing::info!(id, "DELETE /api/users/{{id}}");
    reply(state.client.delete_user(id).await)
}

async fn batch_create(
    State(state): State<Arc<AppState>>,
    Json(users): Json<Vec<NewUser>>,
) -> Response {
    tracing::info!(items = users.len(), "POST /api/users/batch");
    let settled = state.client.batch_create(users).await;
    (outcome_status(&settled.outcome), Json(settled.value)).into_response()
}

async fn chat(State(state): State<Arc<AppState>>, Json(req): Json<ChatRequest>) -> Response {
    tracing::info!(messages = req.messages.len(), "POST /api/users/chat");
    let settled = state.client.chat(req.messages).await;
    let body = ChatReply {
        success: settled.outcome.is_success(),
        message: outcome_message(&settled.outcome, "chat completed"),
        responses: settled.value,
    };
    (outcome_status(&settled.outcome), Json(body)).into_response()
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "UP",
        "service": env!("CARGO_PKG_NAME"),
        "timestamp": unix_millis(),
        "grpcTarget": state.grpc_target,
    }))
}

async fn info() -> impl IntoResponse {
    Json(json!({
        "name": "userbase gateway",
        "description": "HTTP/JSON gateway for the userbase gRPC service",
        "version": env!("CARGO_PKG_VERSION"),
        "protocols": ["gRPC", "HTTP"],
        "features": [
            "user CRUD (unary)",
            "user listing (server streaming)",
            "batch create (client streaming)",
            "chat (bidirectional streaming)",
        ],
    }))
}
