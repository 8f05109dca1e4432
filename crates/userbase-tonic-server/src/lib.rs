#![doc = include_str!("../README.md")]

pub mod server;

pub use server::{build_user_service, config::ServerConfig, service::handler::UserHandler};
