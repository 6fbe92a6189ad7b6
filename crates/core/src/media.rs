//! Media collaborators: audio playback, microphone and frame capture.
//!
//! Implementations push what they produce into the controller's
//! `MediaInput` channel; the controller decides what reaches the session.

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureSource {
    Camera,
    Screen,
}

/// The collaborator a runtime failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaDevice {
    Microphone,
    Camera,
    Screen,
}

impl From<CaptureSource> for MediaDevice {
    fn from(source: CaptureSource) -> Self {
        match source {
            CaptureSource::Camera => MediaDevice::Camera,
            CaptureSource::Screen => MediaDevice::Screen,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSettings {
    pub fps: u32,
    pub resize_width: u32,
    /// JPEG quality, 0.0 to 1.0.
    pub quality: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MediaInput {
    /// Base64 PCM16 at 16 kHz and its peak level.
    MicChunk { data: String, level: f32 },
    /// A base64 JPEG frame.
    Frame { source: CaptureSource, data: String },
    /// Playback peak level.
    OutputLevel(f32),
    /// A running collaborator died; it produces nothing more.
    Error { device: MediaDevice, message: String },
}

/// Plays PCM16 audio coming from the model.
#[async_trait]
pub trait AudioPlayer: Send {
    /// Queues little-endian PCM16 mono samples.
    fn add_pcm16(&mut self, data: &[u8]) -> Result<()>;
    fn set_sample_rate(&mut self, sample_rate: u32);
    /// Drops everything queued.
    fn stop(&mut self);
    async fn resume(&mut self) -> Result<()>;
}

#[async_trait]
pub trait MicRecorder: Send {
    async fn start(&mut self, sink: mpsc::Sender<MediaInput>) -> Result<()>;
    fn stop(&mut self);
}

/// Camera or screen capture producing JPEG frames at a fixed rate.
#[async_trait]
pub trait FrameCapture: Send {
    async fn start(&mut self, settings: FrameSettings, sink: mpsc::Sender<MediaInput>) -> Result<()>;
    fn stop(&mut self);
    fn set_fps(&mut self, fps: u32);
    fn set_resize_width(&mut self, width: u32);
    fn set_quality(&mut self, quality: f32);
}

/// Constructs collaborators on first use.
#[async_trait]
pub trait MediaBackend: Send {
    async fn audio_player(
        &mut self,
        sample_rate: u32,
        sink: mpsc::Sender<MediaInput>,
    ) -> Result<Box<dyn AudioPlayer>>;
    fn mic_recorder(&mut self) -> Result<Box<dyn MicRecorder>>;
    fn camera(&mut self) -> Result<Box<dyn FrameCapture>>;
    fn screen_recorder(&mut self) -> Result<Box<dyn FrameCapture>>;
}
