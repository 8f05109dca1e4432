#![doc = include_str!("../README.md")]

pub mod client;
pub mod config;
pub mod http;
pub mod logging;

pub use client::{ClientConfig, ClientError, Outcome, Settled, UserClient};
