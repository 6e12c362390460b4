//! Hooks bound to command keys, plus the hooks every client carries

use crate::{Client, Message, Result};
use async_trait::async_trait;
use std::time::Duration;

/// How long to wait after the welcome reply before joining channels,
/// giving NickServ and similar services time to identify the client.
pub const WELCOME_DELAY: Duration = Duration::from_secs(3);

/// Handler invoked for every message whose command matches its key
#[async_trait]
pub trait Hook: Send + Sync {
    async fn call(&self, client: &Client, message: &Message) -> Result<()>;
}

/// Plain closures are hooks too, for handlers that never write
#[async_trait]
impl<F> Hook for F
where
    F: Fn(&Client, &Message) -> Result<()> + Send + Sync,
{
    async fn call(&self, client: &Client, message: &Message) -> Result<()> {
        self(client, message)
    }
}

/// Answers server PINGs so the connection is kept alive
pub struct Pong;

#[async_trait]
impl Hook for Pong {
    async fn call(&self, client: &Client, message: &Message) -> Result<()> {
        let token = message
            .data
            .as_deref()
            .or_else(|| message.params.first().map(String::as_str))
            .unwrap_or_default();
        client.write(format!("PONG :{}", token)).await
    }
}

/// Joins the configured channels once the server has welcomed us
///
/// The delay is awaited inside the hook, so no further line is handled
/// until the JOIN has been written.
pub struct JoinChannels {
    channels: Vec<String>,
    delay: Duration,
}

impl JoinChannels {
    pub fn new(channels: Vec<String>) -> Self {
        Self::with_delay(channels, WELCOME_DELAY)
    }

    pub fn with_delay(channels: Vec<String>, delay: Duration) -> Self {
        Self { channels, delay }
    }
}

#[async_trait]
impl Hook for JoinChannels {
    async fn call(&self, client: &Client, _message: &Message) -> Result<()> {
        tokio::time::sleep(self.delay).await;
        if self.channels.is_empty() {
            tracing::debug!("Welcome received, no channels configured");
            return Ok(());
        }
        tracing::info!("Joining {}", self.channels.join(", "));
        client.write(format!("JOIN {}", self.channels.join(","))).await
    }
}
