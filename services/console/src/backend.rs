use crate::{
    audio::{CpalPlayer, CpalRecorder},
    capture::ImageFrameSource,
};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use live_console_core::media::{
    AudioPlayer, CaptureSource, FrameCapture, MediaBackend, MediaInput, MicRecorder,
};
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Real devices for audio, image files for camera and screen frames.
#[derive(Debug, Clone, Default)]
pub struct DeviceMediaBackend {
    camera_source: Option<PathBuf>,
    screen_source: Option<PathBuf>,
}

impl DeviceMediaBackend {
    pub fn new(camera_source: Option<PathBuf>, screen_source: Option<PathBuf>) -> Self {
        Self {
            camera_source,
            screen_source,
        }
    }

    fn frame_source(
        source: CaptureSource,
        path: Option<&PathBuf>,
        hint: &str,
    ) -> Result<Box<dyn FrameCapture>> {
        let path = path.ok_or_else(|| {
            anyhow!("No {} source configured. {}", source_name(source), hint)
        })?;
        Ok(Box::new(ImageFrameSource::new(source, path)))
    }
}

fn source_name(source: CaptureSource) -> &'static str {
    match source {
        CaptureSource::Camera => "camera",
        CaptureSource::Screen => "screen",
    }
}

#[async_trait]
impl MediaBackend for DeviceMediaBackend {
    async fn audio_player(
        &mut self,
        sample_rate: u32,
        sink: mpsc::Sender<MediaInput>,
    ) -> Result<Box<dyn AudioPlayer>> {
        Ok(Box::new(CpalPlayer::open(sample_rate, sink).await?))
    }

    fn mic_recorder(&mut self) -> Result<Box<dyn MicRecorder>> {
        Ok(Box::new(CpalRecorder::new()))
    }

    fn camera(&mut self) -> Result<Box<dyn FrameCapture>> {
        Self::frame_source(
            CaptureSource::Camera,
            self.camera_source.as_ref(),
            "Set CAMERA_SOURCE or pass --camera.",
        )
    }

    fn screen_recorder(&mut self) -> Result<Box<dyn FrameCapture>> {
        Self::frame_source(
            CaptureSource::Screen,
            self.screen_source.as_ref(),
            "Set SCREEN_SOURCE or pass --screen.",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_sources_explain_how_to_set_them() {
        let mut backend = DeviceMediaBackend::default();
        let err = backend.camera().err().unwrap();
        assert_eq!(
            err.to_string(),
            "No camera source configured. Set CAMERA_SOURCE or pass --camera."
        );
        let err = backend.screen_recorder().err().unwrap();
        assert!(err.to_string().contains("SCREEN_SOURCE"));
    }

    #[test]
    fn configured_sources_build_captures() {
        let mut backend = DeviceMediaBackend::new(Some("frames".into()), Some("screen.png".into()));
        assert!(backend.camera().is_ok());
        assert!(backend.screen_recorder().is_ok());
        assert!(backend.mic_recorder().is_ok());
    }
}
