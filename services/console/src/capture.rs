//! Camera and screen frames from still images.
//!
//! A source is an image file or a directory of images, cycled through in
//! file name order. Every tick decodes the next image, scales it to the
//! configured width and encodes it as a base64 JPEG.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use base64::Engine;
use image::{DynamicImage, codecs::jpeg::JpegEncoder, imageops::FilterType};
use live_console_core::media::{CaptureSource, FrameCapture, FrameSettings, MediaInput};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Lists the frames behind `path`: the file itself, or the images inside a
/// directory sorted by name.
pub fn list_frames(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    let entries = std::fs::read_dir(path)
        .with_context(|| format!("Cannot read frame source {}", path.display()))?;

    let mut frames = Vec::new();
    for entry in entries {
        let candidate = entry?.path();
        let is_image = candidate
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        if candidate.is_file() && is_image {
            frames.push(candidate);
        }
    }
    if frames.is_empty() {
        bail!("No images found in {}", path.display());
    }
    frames.sort();
    Ok(frames)
}

fn jpeg_quality(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Scales `image` to the configured width, keeping its aspect ratio, and
/// returns it as base64 JPEG.
pub fn encode_frame(image: &DynamicImage, settings: &FrameSettings) -> Result<String> {
    let width = settings.resize_width.max(1);
    let height = (image.height() as u64 * width as u64 / image.width().max(1) as u64).max(1) as u32;
    let rgb = image
        .resize_exact(width, height, FilterType::Triangle)
        .to_rgb8();

    let mut jpeg = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, jpeg_quality(settings.quality));
    encoder
        .encode_image(&rgb)
        .context("Failed to encode frame as JPEG")?;
    Ok(base64::engine::general_purpose::STANDARD.encode(&jpeg))
}

async fn load_frame(path: PathBuf, settings: FrameSettings) -> Result<String> {
    tokio::task::spawn_blocking(move || {
        let image = image::open(&path)
            .with_context(|| format!("Cannot decode image {}", path.display()))?;
        encode_frame(&image, &settings)
    })
    .await
    .context("Frame encoder task failed")?
}

/// A [`FrameCapture`] reading frames from disk.
pub struct ImageFrameSource {
    source: CaptureSource,
    path: PathBuf,
    settings: Option<watch::Sender<FrameSettings>>,
    task: Option<JoinHandle<()>>,
}

impl ImageFrameSource {
    pub fn new(source: CaptureSource, path: impl Into<PathBuf>) -> Self {
        Self {
            source,
            path: path.into(),
            settings: None,
            task: None,
        }
    }

    fn update(&self, apply: impl FnOnce(&mut FrameSettings)) {
        if let Some(settings) = &self.settings {
            settings.send_modify(apply);
        }
    }
}

impl Drop for ImageFrameSource {
    fn drop(&mut self) {
        FrameCapture::stop(self);
    }
}

#[async_trait]
impl FrameCapture for ImageFrameSource {
    async fn start(&mut self, settings: FrameSettings, sink: mpsc::Sender<MediaInput>) -> Result<()> {
        FrameCapture::stop(self);

        let frames = list_frames(&self.path)?;
        // A source that cannot produce its first frame fails the start.
        let first = load_frame(frames[0].clone(), settings).await?;

        let (settings_tx, settings_rx) = watch::channel(settings);
        self.task = Some(tokio::spawn(run_capture(
            self.source,
            frames,
            first,
            settings_rx,
            sink,
        )));
        self.settings = Some(settings_tx);
        info!(source = ?self.source, path = %self.path.display(), fps = settings.fps, "Frame capture started");
        Ok(())
    }

    fn stop(&mut self) {
        self.settings = None;
        if let Some(task) = self.task.take() {
            task.abort();
            debug!(source = ?self.source, "Frame capture stopped");
        }
    }

    fn set_fps(&mut self, fps: u32) {
        self.update(|s| s.fps = fps.max(1));
    }

    fn set_resize_width(&mut self, width: u32) {
        self.update(|s| s.resize_width = width.max(1));
    }

    fn set_quality(&mut self, quality: f32) {
        self.update(|s| s.quality = quality);
    }
}

async fn run_capture(
    source: CaptureSource,
    frames: Vec<PathBuf>,
    first: String,
    mut settings: watch::Receiver<FrameSettings>,
    sink: mpsc::Sender<MediaInput>,
) {
    let mut ready = Some(first);
    let mut index = 0;
    loop {
        let current = *settings.borrow_and_update();
        let frame = match ready.take() {
            Some(frame) => Ok(frame),
            None => load_frame(frames[index].clone(), current).await,
        };
        index = (index + 1) % frames.len();

        match frame {
            Ok(data) => {
                if sink.send(MediaInput::Frame { source, data }).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!(?source, error = %e, "Frame capture failed");
                let message = format!("Frame capture failed: {:#}", e);
                let _ = sink
                    .send(MediaInput::Error {
                        device: source.into(),
                        message,
                    })
                    .await;
                break;
            }
        }

        let period = Duration::from_secs_f64(1.0 / current.fps.max(1) as f64);
        tokio::select! {
            _ = tokio::time::sleep(period) => {}
            changed = settings.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use live_console_core::media::MediaDevice;

    fn settings(width: u32) -> FrameSettings {
        FrameSettings {
            fps: 30,
            resize_width: width,
            quality: 0.3,
        }
    }

    fn decode(data: &str) -> DynamicImage {
        let bytes = base64::engine::general_purpose::STANDARD.decode(data).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        image::load_from_memory(&bytes).unwrap()
    }

    #[test]
    fn encode_frame_scales_to_width() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(320, 240, Rgb([10, 200, 30])));
        let frame = decode(&encode_frame(&image, &settings(160)).unwrap());
        assert_eq!((frame.width(), frame.height()), (160, 120));
    }

    #[test]
    fn jpeg_quality_maps_fraction_to_percent() {
        assert_eq!(jpeg_quality(0.3), 30);
        assert_eq!(jpeg_quality(0.0), 1);
        assert_eq!(jpeg_quality(1.5), 100);
    }

    #[test]
    fn list_frames_sorts_images_and_skips_other_files() {
        let dir = tempfile::tempdir().unwrap();
        RgbImage::new(4, 4).save(dir.path().join("b.png")).unwrap();
        RgbImage::new(4, 4).save(dir.path().join("a.jpg")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a frame").unwrap();

        let frames = list_frames(dir.path()).unwrap();
        let names: Vec<_> = frames
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.png"]);

        assert_eq!(list_frames(&frames[1]).unwrap(), vec![frames[1].clone()]);
    }

    #[test]
    fn list_frames_rejects_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = list_frames(dir.path()).unwrap_err();
        assert!(err.to_string().contains("No images found"));
    }

    #[tokio::test]
    async fn source_emits_frames_until_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        RgbImage::from_pixel(64, 48, Rgb([255, 0, 0])).save(&path).unwrap();

        let (tx, mut rx) = mpsc::channel(4);
        let mut source = ImageFrameSource::new(CaptureSource::Screen, &path);
        source.start(settings(32), tx).await.unwrap();

        match rx.recv().await {
            Some(MediaInput::Frame { source: from, data }) => {
                assert_eq!(from, CaptureSource::Screen);
                let frame = decode(&data);
                assert_eq!((frame.width(), frame.height()), (32, 24));
            }
            other => panic!("expected a frame, got {:?}", other),
        }

        source.stop();
        while rx.recv().await.is_some() {}
    }

    #[tokio::test]
    async fn source_reports_its_device_when_a_frame_disappears() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        RgbImage::from_pixel(16, 16, Rgb([0, 0, 255])).save(&path).unwrap();

        let (tx, mut rx) = mpsc::channel(4);
        let mut source = ImageFrameSource::new(CaptureSource::Camera, &path);
        source.start(settings(16), tx).await.unwrap();
        std::fs::remove_file(&path).unwrap();

        loop {
            match rx.recv().await {
                Some(MediaInput::Frame { .. }) => continue,
                Some(MediaInput::Error { device, message }) => {
                    assert_eq!(device, MediaDevice::Camera);
                    assert!(message.starts_with("Frame capture failed"));
                    break;
                }
                other => panic!("expected a capture error, got {:?}", other),
            }
        }
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn start_fails_for_missing_source() {
        let (tx, _rx) = mpsc::channel(1);
        let mut source = ImageFrameSource::new(CaptureSource::Camera, "/nonexistent/frames");
        assert!(source.start(settings(160), tx).await.is_err());
    }
}
