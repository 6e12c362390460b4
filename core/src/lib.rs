//! Marvin IRC Bot Core
//!
//! This crate provides the core of a modular IRC bot: RFC 1459 line parsing,
//! dispatch of parsed messages to hooks, the module lifecycle and the
//! channel that carries hook failures to the log.

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod hook;
pub mod message;
pub mod module;
pub mod report;

pub use client::Client;
pub use config::{BotConfig, Config, ServerConfig};
pub use connection::{connect, Connection};
pub use error::{Error, Result};
pub use hook::{Hook, JoinChannels, Pong, WELCOME_DELAY};
pub use message::{Message, Prefix};
pub use module::{Module, ModuleSet, Settings};
pub use report::{ErrorSink, ErrorStream, HookError};

/// Re-exports for convenience
pub use async_trait::async_trait;
pub use serde::{Deserialize, Serialize};
pub use tracing::{debug, error, info, warn};
