//! The seam between the controller and the Live API client.

use anyhow::Result;
use async_trait::async_trait;
use gemini_realtime::{LiveClient, MediaChunk, Setup};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LiveSession: Send {
    async fn connect(&mut self, setup: Setup, api_key: &str) -> Result<()>;
    async fn disconnect(&mut self) -> Result<()>;
    async fn send_text(&mut self, text: &str) -> Result<()>;
    async fn send_realtime_input(&mut self, chunks: Vec<MediaChunk>) -> Result<()>;
}

#[async_trait]
impl LiveSession for LiveClient {
    async fn connect(&mut self, setup: Setup, api_key: &str) -> Result<()> {
        LiveClient::connect(self, setup, api_key).await
    }

    async fn disconnect(&mut self) -> Result<()> {
        LiveClient::disconnect(self).await
    }

    async fn send_text(&mut self, text: &str) -> Result<()> {
        LiveClient::send_text(self, text).await
    }

    async fn send_realtime_input(&mut self, chunks: Vec<MediaChunk>) -> Result<()> {
        LiveClient::send_realtime_input(self, chunks).await
    }
}
