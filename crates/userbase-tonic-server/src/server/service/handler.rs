//! gRPC service implementation for user records.
//!
//! This module defines [`UserHandler`], the implementation of the
//! [`UserService`] gRPC service. It covers all four call shapes: unary CRUD,
//! a server-streamed listing, a client-streamed batch create and a
//! bidirectional chat.
//!
//! ## Responsibilities
//!
//! - Turn store outcomes into replies via [`replies`].
//! - Spawn one task per outbound stream, fed through a bounded channel.
//! - Refuse new calls once shutdown begins and cancel stragglers after the
//!   drain period (see [`CallTracker`]).

use crate::server::{
    config::ServerConfig,
    lifecycle::CallTracker,
    service::replies,
    streaming::{batch::tally_batch, chat::relay_chat, list::feed_records},
    telemetry::{increment_calls, increment_stream_errors, record_stream_duration},
};
use core::pin::Pin;
use std::{sync::Arc, time::Instant};
use tokio::sync::mpsc;
use tokio_stream::{Stream, wrappers::ReceiverStream};
use tonic::{Request, Response, Status, Streaming};
use tracing::Instrument;
use userbase::{NewUser, RecordStore, UserId, UserPatch};
use userbase_tonic_core::proto::{
    ChatMessage, CreateUserRequest, CreateUserResponse, DeleteUserRequest, DeleteUserResponse,
    GetUserRequest, GetUserResponse, ListUsersRequest, UpdateUserRequest, UpdateUserResponse,
    User, user_service_server::UserService,
};

type ResponseStream<T> = Pin<Box<dyn Stream<Item = Result<T, Status>> + Send>>;

/// User record service backed by a [`RecordStore`].
///
/// Cloning is cheap: clones share the store and the call tracker.
pub struct UserHandler<S> {
    store: Arc<S>,
    config: ServerConfig,
    calls: Arc<CallTracker>,
}

impl<S> Clone for UserHandler<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
            calls: Arc::clone(&self.calls),
        }
    }
}

impl<S: RecordStore> UserHandler<S> {
    pub fn new(store: Arc<S>, config: ServerConfig) -> Self {
        let calls = Arc::new(CallTracker::new(config.shutdown_timeout));
        Self {
            store,
            config,
            calls,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Refuses new calls, drains in-flight streams, then cancels the rest.
    pub async fn shutdown(&self) {
        self.calls.shutdown().await;
    }

    fn respond<T>(rx: mpsc::Receiver<Result<T, Status>>) -> Response<ResponseStream<T>>
    where
        T: Send + 'static,
    {
        Response::new(Box::pin(ReceiverStream::new(rx)))
    }
}

#[tonic::async_trait]
impl<S: RecordStore> UserService for UserHandler<S> {
    type ListUsersStream = ResponseStream<User>;
    type ChatStream = ResponseStream<ChatMessage>;

    #[tracing::instrument(skip_all, fields(username = %req.get_ref().username, email = %req.get_ref().email))]
    async fn create_user(
        &self,
        req: Request<CreateUserRequest>,
    ) -> Result<Response<CreateUserResponse>, Status> {
        increment_calls("create_user");
        self.calls.ensure_accepting()?;
        let user = NewUser::from(req.into_inner());
        Ok(Response::new(replies::create(&self.store, user).await))
    }

    #[tracing::instrument(skip_all, fields(user_id = req.get_ref().user_id))]
    async fn get_user(
        &self,
        req: Request<GetUserRequest>,
    ) -> Result<Response<GetUserResponse>, Status> {
        increment_calls("get_user");
        self.calls.ensure_accepting()?;
        Ok(Response::new(
            replies::get(&self.store, req.into_inner().user_id).await,
        ))
    }

    /// Streams every record in ascending id order.
    ///
    /// The request's `page_size` only tunes how many records are read from
    /// the store at a time; the stream always covers the whole store.
    #[tracing::instrument(skip_all, fields(page_size = req.get_ref().page_size))]
    async fn list_users(
        &self,
        req: Request<ListUsersRequest>,
    ) -> Result<Response<Self::ListUsersStream>, Status> {
        increment_calls("list_users");
        let guard = self.calls.admit_stream()?;
        let start = Instant::now();
        let page_size = self.config.page_size(req.get_ref().page_size);

        let (resp_tx, resp_rx) = mpsc::channel(self.config.stream_buffer_size);
        let fut = feed_records(
            Arc::clone(&self.store),
            page_size,
            self.config.list_pacing,
            resp_tx,
            self.calls.cancelled(),
        );

        tokio::spawn(
            async move {
                let _guard = guard;
                match fut.await {
                    Ok(sent) => {
                        tracing::debug!(sent, "list completed");
                        record_stream_duration(start.elapsed().as_millis() as f64);
                    }
                    Err(e) => {
                        increment_stream_errors("list_users");
                        tracing::warn!("list stream ended early: {e}");
                    }
                }
            }
            .instrument(tracing::info_span!("list_stream", page_size)),
        );

        Ok(Self::respond(resp_rx))
    }

    #[tracing::instrument(skip_all, fields(user_id = req.get_ref().user_id))]
    async fn update_user(
        &self,
        req: Request<UpdateUserRequest>,
    ) -> Result<Response<UpdateUserResponse>, Status> {
        increment_calls("update_user");
        self.calls.ensure_accepting()?;
        let (id, patch): (UserId, UserPatch) = req.into_inner().into();
        Ok(Response::new(replies::update(&self.store, id, patch).await))
    }

    #[tracing::instrument(skip_all, fields(user_id = req.get_ref().user_id))]
    async fn delete_user(
        &self,
        req: Request<DeleteUserRequest>,
    ) -> Result<Response<DeleteUserResponse>, Status> {
        increment_calls("delete_user");
        self.calls.ensure_accepting()?;
        Ok(Response::new(
            replies::delete(&self.store, req.into_inner().user_id).await,
        ))
    }

    /// Creates one record per inbound message and answers with a tally once
    /// the client half-closes.
    #[tracing::instrument(skip_all)]
    async fn batch_create_users(
        &self,
        req: Request<Streaming<CreateUserRequest>>,
    ) -> Result<Response<CreateUserResponse>, Status> {
        increment_calls("batch_create_users");
        let _guard = self.calls.admit_stream()?;
        let start = Instant::now();

        let reply = tally_batch(
            Arc::clone(&self.store),
            req.into_inner(),
            self.calls.cancelled(),
        )
        .await;

        if reply.success {
            record_stream_duration(start.elapsed().as_millis() as f64);
        } else {
            increment_stream_errors("batch_create_users");
        }
        Ok(Response::new(reply))
    }

    #[tracing::instrument(skip_all)]
    async fn chat(
        &self,
        req: Request<Streaming<ChatMessage>>,
    ) -> Result<Response<Self::ChatStream>, Status> {
        increment_calls("chat");
        let guard = self.calls.admit_stream()?;
        let start = Instant::now();

        let (resp_tx, resp_rx) = mpsc::channel(self.config.stream_buffer_size);
        let fut = relay_chat(req.into_inner(), resp_tx, self.calls.cancelled());

        tokio::spawn(
            async move {
                let _guard = guard;
                match fut.await {
                    Ok(echoed) => {
                        tracing::debug!(echoed, "chat completed");
                        record_stream_duration(start.elapsed().as_millis() as f64);
                    }
                    Err(e) => {
                        increment_stream_errors("chat");
                        tracing::warn!("chat stream ended early: {e}");
                    }
                }
            }
            .instrument(tracing::info_span!("chat_stream")),
        );

        Ok(Self::respond(resp_rx))
    }
}
