//! Gemini Multimodal Live API client.
//!
//! - `types`: JSON wire format for setup, client content and realtime input.
//! - `events`: what the client reports back (`LiveEvent`).
//! - `client`: the WebSocket session (`LiveClient`).

pub mod client;
pub mod events;
pub mod types;

pub use client::{DEFAULT_ENDPOINT, LiveClient};
pub use events::LiveEvent;
pub use types::{
    Content, GenerationConfig, MediaChunk, ModelTurn, Part, PrebuiltVoiceConfig,
    ResponseModality, ServerContent, ServerPart, Setup, SpeechConfig, VoiceConfig,
};
