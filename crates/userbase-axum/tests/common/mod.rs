//! Shared fixtures: a real server on an ephemeral port plus stalled and
//! failing fakes.

#![allow(dead_code)]

use core::{pin::Pin, time::Duration};
use std::{net::SocketAddr, sync::Arc};
use tokio::{net::TcpListener, sync::mpsc};
use tokio_stream::{Stream, StreamExt, wrappers::{ReceiverStream, TcpListenerStream}};
use tonic::{Request, Response, Status, Streaming, transport::Server};
use userbase::MemoryStore;
use userbase_axum::{ClientConfig, UserClient};
use userbase_tonic_core::proto::{
    self,
    user_service_server::{UserService, UserServiceServer},
};
use userbase_tonic_server::{ServerConfig, UserHandler, build_user_service};

pub struct TestServer {
    pub addr: SocketAddr,
    pub handler: UserHandler<MemoryStore>,
}

impl TestServer {
    pub fn uri(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn client(&self, config: ClientConfig) -> UserClient {
        UserClient::connect(&self.uri(), config).await.unwrap()
    }
}

async fn bind() -> (SocketAddr, TcpListenerStream) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (addr, TcpListenerStream::new(listener))
}

pub async fn spawn_server() -> TestServer {
    spawn_server_with(ServerConfig::default()).await
}

pub async fn spawn_server_with(config: ServerConfig) -> TestServer {
    let (addr, incoming) = bind().await;
    let handler = UserHandler::new(Arc::new(MemoryStore::new()), config);
    let service = build_user_service(handler.clone());
    tokio::spawn(async move {
        Server::builder()
            .add_service(service)
            .serve_with_incoming(incoming)
            .await
            .unwrap();
    });
    TestServer { addr, handler }
}

pub fn fast_config() -> ClientConfig {
    ClientConfig {
        call_timeout: Duration::from_secs(5),
        ..ClientConfig::default()
    }
}

/// Accepts calls and never finishes them.
///
/// `BatchCreateUsers` never replies. `Chat` echoes what it reads but never
/// ends its stream. Everything else is unimplemented.
#[derive(Clone, Default)]
pub struct Stalled;

type ResponseStream<T> = Pin<Box<dyn Stream<Item = Result<T, Status>> + Send>>;

#[tonic::async_trait]
impl UserService for Stalled {
    type ListUsersStream = ResponseStream<proto::User>;
    type ChatStream = ResponseStream<proto::ChatMessage>;

    async fn create_user(
        &self,
        _: Request<proto::CreateUserRequest>,
    ) -> Result<Response<proto::CreateUserResponse>, Status> {
        std::future::pending().await
    }

    async fn get_user(
        &self,
        _: Request<proto::GetUserRequest>,
    ) -> Result<Response<proto::GetUserResponse>, Status> {
        Err(Status::unimplemented("stalled"))
    }

    async fn list_users(
        &self,
        _: Request<proto::ListUsersRequest>,
    ) -> Result<Response<Self::ListUsersStream>, Status> {
        Ok(Response::new(Box::pin(tokio_stream::pending())))
    }

    async fn update_user(
        &self,
        _: Request<proto::UpdateUserRequest>,
    ) -> Result<Response<proto::UpdateUserResponse>, Status> {
        Err(Status::unimplemented("stalled"))
    }

    async fn delete_user(
        &self,
        _: Request<proto::DeleteUserRequest>,
    ) -> Result<Response<proto::DeleteUserResponse>, Status> {
        Err(Status::unimplemented("stalled"))
    }

    async fn batch_create_users(
        &self,
        _: Request<Streaming<proto::CreateUserRequest>>,
    ) -> Result<Response<proto::CreateUserResponse>, Status> {
        std::future::pending().await
    }

    async fn chat(
        &self,
        req: Request<Streaming<proto::ChatMessage>>,
    ) -> Result<Response<Self::ChatStream>, Status> {
        let mut inbound = req.into_inner();
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            while let Some(Ok(msg)) = inbound.next().await {
                let echo = proto::ChatMessage {
                    sender_id: 0,
                    text: format!("server received: {}", msg.text),
                    timestamp: 0,
                };
                if tx.send(Ok(echo)).await.is_err() {
                    return;
                }
            }
            // Hold the stream open.
            let _tx = tx;
            std::future::pending::<()>().await;
        });
        Ok(Response::new(Box::pin(ReceiverStream::new(rx))))
    }
}

pub async fn spawn_stalled() -> SocketAddr {
    let (addr, incoming) = bind().await;
    tokio::spawn(async move {
        Server::builder()
            .add_service(UserServiceServer::new(Stalled))
            .serve_with_incoming(incoming)
            .await
            .unwrap();
    });
    addr
}

/// Fails every streaming call part way through.
///
/// `ListUsers` and `Chat` send one message and then an `INTERNAL` status.
/// `BatchCreateUsers` answers with an `INTERNAL` status. Unary calls are
/// unimplemented.
#[derive(Clone, Default)]
pub struct Failing;

#[tonic::async_trait]
impl UserService for Failing {
    type ListUsersStream = ResponseStream<proto::User>;
    type ChatStream = ResponseStream<proto::ChatMessage>;

    async fn create_user(
        &self,
        _: Request<proto::CreateUserRequest>,
    ) -> Result<Response<proto::CreateUserResponse>, Status> {
        Err(Status::unimplemented("failing"))
    }

    async fn get_user(
        &self,
        _: Request<proto::GetUserRequest>,
    ) -> Result<Response<proto::GetUserResponse>, Status> {
        Err(Status::unimplemented("failing"))
    }

    async fn list_users(
        &self,
        _: Request<proto::ListUsersRequest>,
    ) -> Result<Response<Self::ListUsersStream>, Status> {
        let first = proto::User {
            id: 1,
            username: "first".into(),
            email: "first@example.com".into(),
            age: 30,
            created_at: 1,
        };
        let items = vec![Ok(first), Err(Status::internal("list boom"))];
        Ok(Response::new(Box::pin(tokio_stream::iter(items))))
    }

    async fn update_user(
        &self,
        _: Request<proto::UpdateUserRequest>,
    ) -> Result<Response<proto::UpdateUserResponse>, Status> {
        Err(Status::unimplemented("failing"))
    }

    async fn delete_user(
        &self,
        _: Request<proto::DeleteUserRequest>,
    ) -> Result<Response<proto::DeleteUserResponse>, Status> {
        Err(Status::unimplemented("failing"))
    }

    async fn batch_create_users(
        &self,
        _: Request<Streaming<proto::CreateUserRequest>>,
    ) -> Result<Response<proto::CreateUserResponse>, Status> {
        Err(Status::internal("batch boom"))
    }

    async fn chat(
        &self,
        req: Request<Streaming<proto::ChatMessage>>,
    ) -> Result<Response<Self::ChatStream>, Status> {
        let mut inbound = req.into_inner();
        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(async move {
            if let Some(Ok(msg)) = inbound.next().await {
                let echo = proto::ChatMessage {
                    sender_id: 0,
                    text: format!("server received: {}", msg.text),
                    timestamp: 0,
                };
                let _ = tx.send(Ok(echo)).await;
            }
            let _ = tx.send(Err(Status::internal("chat boom"))).await;
        });
        Ok(Response::new(Box::pin(ReceiverStream::new(rx))))
    }
}

pub async fn spawn_failing() -> SocketAddr {
    let (addr, incoming) = bind().await;
    tokio::spawn(async move {
        Server::builder()
            .add_service(UserServiceServer::new(Failing))
            .serve_with_incoming(incoming)
            .await
            .unwrap();
    });
    addr
}
