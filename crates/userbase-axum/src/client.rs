//! Client side of the user service.
//!
//! [`UserClient`] drives every call shape over one shared [`Channel`] and
//! hands back plain data only. Every call is bounded by the configured call
//! timeout, so a caller is never left waiting on an unresponsive server.
//!
//! The two streaming drivers keep their per-call state in a
//! [`StreamingSession`]:
//!
//! - [`UserClient::batch_create`] runs the call on its own task, fills a
//!   channel sized to the whole batch, half-closes, then waits on a
//!   `oneshot` latch under the deadline.
//! - [`UserClient::chat`] sends and receives on the same task with
//!   `tokio::select!`, collecting every echo in arrival order.
//!
//! In both, the deadline is armed at half-close, so send pacing never eats
//! into the completion timeout.

mod error;
pub mod session;

pub use error::ClientError;
pub use session::{Outcome, SessionState, Settled, StreamingSession};

use core::time::Duration;
use futures::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep, sleep_until, timeout, timeout_at};
use tokio_stream::wrappers::ReceiverStream;
use tonic::transport::{Channel, Endpoint};
use tonic::{Response, Status};
use tracing::Instrument;
use userbase::{NewUser, UserId, UserPatch, UserRecord, unix_millis};
use userbase_tonic_core::{
    convert::update_request,
    messages,
    proto::{self, user_service_client::UserServiceClient},
    types::{Ack, ChatLine, UserReply},
};

/// Knobs shared by every call a [`UserClient`] makes.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Upper bound for a whole call. Streaming drivers apply it from
    /// half-close onwards.
    pub call_timeout: Duration,
    /// Delay between consecutive outbound stream messages.
    pub send_pacing: Duration,
    /// `sender_id` stamped on outgoing chat messages.
    pub chat_sender_id: i64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(30),
            send_pacing: Duration::ZERO,
            chat_sender_id: 1,
        }
    }
}

#[derive(Clone)]
pub struct UserClient {
    inner: UserServiceClient<Channel>,
    config: ClientConfig,
}

impl UserClient {
    pub fn new(channel: Channel, config: ClientConfig) -> Self {
        Self {
            inner: UserServiceClient::new(channel),
            config,
        }
    }

    /// Connects eagerly, failing if the server cannot be reached.
    pub async fn connect(uri: &str, config: ClientConfig) -> Result<Self, ClientError> {
        let channel = endpoint(uri)?
            .connect()
            .await
            .map_err(|e| ClientError::Connect {
                uri: uri.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self::new(channel, config))
    }

    /// Builds a client whose channel connects on first use.
    pub fn connect_lazy(uri: &str, config: ClientConfig) -> Result<Self, ClientError> {
        Ok(Self::new(endpoint(uri)?.connect_lazy(), config))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Runs one unary call under the call timeout.
    async fn unary<T, R, F, Fut>(&self, call: F) -> Result<R, ClientError>
    where
        F: FnOnce(UserServiceClient<Channel>) -> Fut,
        Fut: Future<Output = Result<Response<T>, Status>>,
        R: From<T>,
    {
        let limit = self.config.call_timeout;
        match timeout(limit, call(self.inner.clone())).await {
            Ok(Ok(resp)) => Ok(R::from(resp.into_inner())),
            Ok(Err(status)) => {
                tracing::error!("call failed: {status}");
                Err(status.into())
            }
            Err(_) => {
                tracing::error!("call timed out after {limit:?}");
                Err(ClientError::TimedOut(limit))
            }
        }
    }

    #[tracing::instrument(skip_all, fields(username = %user.username))]
    pub async fn create_user(&self, user: NewUser) -> Result<UserReply, ClientError> {
        let req = proto::CreateUserRequest::from(user);
        let reply: UserReply = self
            .unary(|mut c| async move { c.create_user(req).await })
            .await?;
        tracing::info!(success = reply.success, message = %reply.message, "create_user");
        Ok(reply)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_user(&self, user_id: UserId) -> Result<UserReply, ClientError> {
        let req = proto::GetUserRequest { user_id };
        self.unary(|mut c| async move { c.get_user(req).await })
            .await
    }

    #[tracing::instrument(skip(self, patch))]
    pub async fn update_user(
        &self,
        user_id: UserId,
        patch: UserPatch,
    ) -> Result<UserReply, ClientError> {
        let req = update_request(user_id, patch);
        let reply: UserReply = self
            .unary(|mut c| async move { c.update_user(req).await })
            .await?;
        tracing::info!(success = reply.success, message = %reply.message, "update_user");
        Ok(reply)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_user(&self, user_id: UserId) -> Result<Ack, ClientError> {
        let req = proto::DeleteUserRequest { user_id };
        self.unary(|mut c| async move { c.delete_user(req).await })
            .await
    }

    /// Collects the server-streamed listing.
    ///
    /// The whole call, opening included, shares one deadline. On error or
    /// timeout the records received so far are returned with the outcome.
    #[tracing::instrument(skip(self))]
    pub async fn list_users(&self, page_size: i32) -> Settled<Vec<UserRecord>> {
        let deadline = Instant::now() + self.config.call_timeout;
        let mut users = Vec::new();
        let mut client = self.inner.clone();

        let opened = timeout_at(deadline, client.list_users(proto::ListUsersRequest { page_size }));
        let mut stream = match opened.await {
            Ok(Ok(resp)) => resp.into_inner(),
            Ok(Err(status)) => {
                tracing::error!("list_users failed to open: {status}");
                return Settled {
                    outcome: Outcome::Failure(error::describe(&status)),
                    value: users,
                };
            }
            Err(_) => {
                tracing::error!("list_users timed out opening the stream");
                return Settled {
                    outcome: Outcome::Timeout,
                    value: users,
                };
            }
        };

        let outcome = loop {
            tokio::select! {
                next = stream.next() => match next {
                    Some(Ok(user)) => {
                        tracing::debug!(id = user.id, "received user");
                        users.push(UserRecord::from(user));
                    }
                    Some(Err(status)) => {
                        tracing::error!(received = users.len(), "list_users stream failed: {status}");
                        break Outcome::Failure(error::describe(&status));
                    }
                    None => break Outcome::Success,
                },
                () = sleep_until(deadline) => {
                    tracing::error!(received = users.len(), "list_users timed out");
                    break Outcome::Timeout;
                }
            }
        };

        tracing::info!(count = users.len(), ?outcome, "list_users settled");
        Settled {
            outcome,
            value: users,
        }
    }

    /// Creates every user over one client-streaming call.
    ///
    /// Returns the server's tally. If no reply arrives within the call
    /// timeout after the last item is sent, the outcome is
    /// [`Outcome::Timeout`] and the value is `{success: false, message:
    /// "timeout"}`. The in-flight call is abandoned, not cancelled, and
    /// its late result is discarded.
    #[tracing::instrument(skip_all, fields(items = users.len()))]
    pub async fn batch_create(&self, users: Vec<NewUser>) -> Settled<Ack> {
        let outbound = users
            .into_iter()
            .map(proto::CreateUserRequest::from)
            .collect::<Vec<_>>();
        let mut session: StreamingSession<_, Ack> =
            StreamingSession::new(outbound, self.config.call_timeout);

        // Sized to the whole batch so sends never wait on the remote side.
        let (tx, rx) = mpsc::channel(session.remaining().max(1));
        let (done_tx, done_rx) = oneshot::channel();

        let mut client = self.inner.clone();
        tokio::spawn(
            async move {
                let result = client
                    .batch_create_users(ReceiverStream::new(rx))
                    .await
                    .map(Response::into_inner);
                // The driver may have given up already.
                let _ = done_tx.send(result);
            }
            .instrument(tracing::debug_span!("batch_call")),
        );

        while let Some(item) = session.next_outbound() {
            tracing::debug!(username = %item.username, "sending batch item");
            if tx.send(item).await.is_err() {
                // The call already ended; its result says why.
                break;
            }
            if session.remaining() > 0 {
                self.pace().await;
            }
        }
        drop(tx);

        let Some(deadline) = session.half_close() else {
            return Settled {
                outcome: Outcome::Failure("batch session settled before half-close".into()),
                value: Ack::failure(messages::batch_failed("session settled early")),
            };
        };

        match timeout_at(deadline, done_rx).await {
            Ok(Ok(Ok(resp))) => {
                tracing::info!(success = resp.success, message = %resp.message, "batch reply");
                session.push_inbound(Ack::from(resp));
                session.settle(Outcome::Success);
            }
            Ok(Ok(Err(status))) => {
                tracing::error!("batch call failed: {status}");
                let reason = error::describe(&status);
                session.push_inbound(Ack::failure(messages::batch_failed(&reason)));
                session.settle(Outcome::Failure(reason));
            }
            Ok(Err(_)) => {
                tracing::error!("batch call task ended without a result");
                let reason = String::from("batch call task ended without a result");
                session.push_inbound(Ack::failure(messages::batch_failed(&reason)));
                session.settle(Outcome::Failure(reason));
            }
            Err(_) => {
                tracing::error!(timeout = ?self.config.call_timeout, "batch call timed out");
                session.settle(Outcome::Timeout);
            }
        }

        let Settled { outcome, value } = session.finish();
        Settled {
            outcome,
            value: value
                .into_iter()
                .next()
                .unwrap_or_else(|| Ack::failure(messages::TIMEOUT)),
        }
    }

    /// Sends each text as a chat message and gathers every reply.
    ///
    /// Replies are collected while sending. After the last message the
    /// outbound side is closed and the driver waits, up to the call
    /// timeout, for the server to finish. The lines received so far are
    /// returned whatever the outcome.
    #[tracing::instrument(skip_all, fields(messages = texts.len()))]
    pub async fn chat(&self, texts: Vec<String>) -> Settled<Vec<ChatLine>> {
        let mut session: StreamingSession<String, ChatLine> =
            StreamingSession::new(texts, self.config.call_timeout);
        let (tx, rx) = mpsc::channel(session.remaining().max(1));
        let mut tx = Some(tx);

        let mut client = self.inner.clone();
        let opened = timeout(self.config.call_timeout, client.chat(ReceiverStream::new(rx)));
        let mut inbound = match opened.await {
            Ok(Ok(resp)) => resp.into_inner(),
            Ok(Err(status)) => {
                tracing::error!("chat failed to open: {status}");
                session.settle(Outcome::Failure(error::describe(&status)));
                return session.finish();
            }
            Err(_) => {
                tracing::error!("chat timed out opening the stream");
                session.settle(Outcome::Timeout);
                return session.finish();
            }
        };

        if session.remaining() == 0 {
            tx = None;
            session.half_close();
        }

        let pacer = sleep(Duration::ZERO);
        tokio::pin!(pacer);

        while !session.is_settled() {
            let deadline = session.deadline();
            tokio::select! {
                biased;
                next = inbound.next() => match next {
                    Some(Ok(msg)) => {
                        tracing::debug!(sender_id = msg.sender_id, text = %msg.text, "chat reply");
                        session.push_inbound(ChatLine::from(msg));
                    }
                    Some(Err(status)) => {
                        tracing::error!(received = session.received(), "chat stream failed: {status}");
                        session.settle(Outcome::Failure(error::describe(&status)));
                    }
                    None => {
                        session.settle(Outcome::Success);
                    }
                },
                () = &mut pacer, if session.is_open() => {
                    if let Some(text) = session.next_outbound() {
                        let msg = proto::ChatMessage {
                            sender_id: self.config.chat_sender_id,
                            text,
                            timestamp: unix_millis(),
                        };
                        let sent = match &tx {
                            Some(tx) => tx.send(msg).await.is_ok(),
                            None => false,
                        };
                        if !sent || session.remaining() == 0 {
                            tx = None;
                            session.half_close();
                        } else {
                            pacer.as_mut().reset(Instant::now() + self.config.send_pacing);
                        }
                    }
                },
                () = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    tracing::error!(received = session.received(), "chat timed out");
                    session.settle(Outcome::Timeout);
                }
            }
        }

        let settled = session.finish();
        tracing::info!(received = settled.value.len(), outcome = ?settled.outcome, "chat settled");
        settled
    }

    async fn pace(&self) {
        if !self.config.send_pacing.is_zero() {
            sleep(self.config.send_pacing).await;
        }
    }
}

fn endpoint(uri: &str) -> Result<Endpoint, ClientError> {
    Endpoint::from_shared(uri.to_string()).map_err(|e| ClientError::Connect {
        uri: uri.to_string(),
        reason: e.to_string(),
    })
}
