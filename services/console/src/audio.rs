//! Speaker playback and microphone capture through cpal.
//!
//! cpal streams are not `Send`, so each stream lives on its own thread and is
//! driven through a control channel. Dropping the channel releases the
//! device.

use crate::audio_utils::{self, LIVE_API_INPUT_SAMPLE_RATE, StreamResampler};
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use live_console_core::media::{AudioPlayer, MediaDevice, MediaInput, MicRecorder};
use ringbuf::{
    HeapProd, HeapRb,
    traits::{Consumer, Producer, Split},
};
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU32, Ordering},
    mpsc as std_mpsc,
};
use std::time::Duration;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

/// Seconds of model speech the playback queue can hold.
const PLAYBACK_BUFFER_SECONDS: usize = 30;
/// Samples per microphone chunk sent upstream.
const MIC_CHUNK_SAMPLES: usize = 2048;
const LEVEL_INTERVAL: Duration = Duration::from_millis(100);

enum StreamControl {
    Play(oneshot::Sender<Result<()>>),
}

/// Owns a stream until every control sender is gone.
fn run_stream_control(stream: cpal::Stream, control: std_mpsc::Receiver<StreamControl>) {
    while let Ok(command) = control.recv() {
        match command {
            StreamControl::Play(reply) => {
                let _ = reply.send(stream.play().map_err(anyhow::Error::from));
            }
        }
    }
    debug!("Audio stream released");
}

fn build_output_stream(
    flush: Arc<AtomicBool>,
    level: Arc<AtomicU32>,
) -> Result<(cpal::Stream, HeapProd<f32>, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .context("No audio output device available")?;
    let supported = device
        .default_output_config()
        .context("Failed to query audio output config")?;
    if supported.sample_format() != cpal::SampleFormat::F32 {
        bail!(
            "Unsupported audio output sample format: {:?}",
            supported.sample_format()
        );
    }
    let config: cpal::StreamConfig = supported.into();
    let channels = config.channels as usize;
    let device_rate = config.sample_rate.0;

    let (producer, mut consumer) =
        HeapRb::<f32>::new(device_rate as usize * PLAYBACK_BUFFER_SECONDS).split();

    let stream = device.build_output_stream(
        &config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            if flush.swap(false, Ordering::AcqRel) {
                consumer.clear();
            }
            let mut peak = 0.0f32;
            for frame in data.chunks_mut(channels) {
                let sample = consumer.try_pop().unwrap_or(0.0);
                peak = peak.max(sample.abs());
                frame.fill(sample);
            }
            level.store(peak.min(1.0).to_bits(), Ordering::Relaxed);
        },
        |err| error!(error = %err, "Audio output stream error"),
        None,
    )?;
    Ok((stream, producer, device_rate))
}

fn build_input_stream(samples: mpsc::UnboundedSender<Vec<f32>>) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .context("No microphone available")?;
    let supported = device
        .default_input_config()
        .context("Failed to query microphone config")?;
    if supported.sample_format() != cpal::SampleFormat::F32 {
        bail!(
            "Unsupported microphone sample format: {:?}",
            supported.sample_format()
        );
    }
    let config: cpal::StreamConfig = supported.into();
    let channels = config.channels as usize;
    let device_rate = config.sample_rate.0;

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            let _ = samples.send(audio_utils::downmix_to_mono(data, channels));
        },
        |err| error!(error = %err, "Microphone stream error"),
        None,
    )?;
    stream.play().context("Failed to start microphone stream")?;
    Ok((stream, device_rate))
}

/// Queues model speech for the default output device.
pub struct CpalPlayer {
    producer: HeapProd<f32>,
    resampler: StreamResampler,
    source_rate: u32,
    device_rate: u32,
    flush: Arc<AtomicBool>,
    control: std_mpsc::Sender<StreamControl>,
    level_task: JoinHandle<()>,
}

impl CpalPlayer {
    /// Opens the output device. `sample_rate` is the rate of the PCM16 that
    /// will be queued.
    pub async fn open(sample_rate: u32, sink: mpsc::Sender<MediaInput>) -> Result<Self> {
        let flush = Arc::new(AtomicBool::new(false));
        let level = Arc::new(AtomicU32::new(0));
        let (ready_tx, ready_rx) = oneshot::channel();
        let (control_tx, control_rx) = std_mpsc::channel();

        let (thread_flush, thread_level) = (flush.clone(), level.clone());
        std::thread::Builder::new()
            .name("audio-output".into())
            .spawn(move || match build_output_stream(thread_flush, thread_level) {
                Ok((stream, producer, device_rate)) => {
                    let _ = ready_tx.send(Ok((producer, device_rate)));
                    run_stream_control(stream, control_rx);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .context("Failed to spawn audio output thread")?;

        let (producer, device_rate) = ready_rx
            .await
            .context("Audio output thread exited during setup")??;
        let resampler = StreamResampler::new(sample_rate, device_rate)?;
        let level_task = tokio::spawn(report_output_level(level, sink));

        info!(sample_rate, device_rate, "Audio player ready");
        Ok(Self {
            producer,
            resampler,
            source_rate: sample_rate,
            device_rate,
            flush,
            control: control_tx,
            level_task,
        })
    }
}

impl Drop for CpalPlayer {
    fn drop(&mut self) {
        self.level_task.abort();
    }
}

#[async_trait]
impl AudioPlayer for CpalPlayer {
    fn add_pcm16(&mut self, data: &[u8]) -> Result<()> {
        let samples = audio_utils::pcm16_bytes_to_f32(data);
        let resampled = self.resampler.process(&samples)?;
        let pushed = self.producer.push_slice(&resampled);
        if pushed < resampled.len() {
            warn!(dropped = resampled.len() - pushed, "Playback queue full");
        }
        Ok(())
    }

    fn set_sample_rate(&mut self, sample_rate: u32) {
        if sample_rate == self.source_rate {
            return;
        }
        match StreamResampler::new(sample_rate, self.device_rate) {
            Ok(resampler) => {
                self.resampler = resampler;
                self.source_rate = sample_rate;
                debug!(sample_rate, "Playback sample rate changed");
            }
            Err(e) => warn!(sample_rate, error = %e, "Keeping previous playback rate"),
        }
    }

    fn stop(&mut self) {
        self.resampler.reset();
        self.flush.store(true, Ordering::Release);
    }

    async fn resume(&mut self) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.control
            .send(StreamControl::Play(reply_tx))
            .map_err(|_| anyhow!("Audio output thread has stopped"))?;
        reply_rx
            .await
            .map_err(|_| anyhow!("Audio output thread has stopped"))?
    }
}

async fn report_output_level(level: Arc<AtomicU32>, sink: mpsc::Sender<MediaInput>) {
    let mut interval = tokio::time::interval(LEVEL_INTERVAL);
    let mut last = 0.0f32;
    loop {
        interval.tick().await;
        let current = f32::from_bits(level.load(Ordering::Relaxed));
        if (current - last).abs() < 0.01 {
            continue;
        }
        last = current;
        if sink.send(MediaInput::OutputLevel(current)).await.is_err() {
            break;
        }
    }
}

/// Streams the default microphone as 16 kHz PCM16 chunks.
#[derive(Default)]
pub struct CpalRecorder {
    control: Option<std_mpsc::Sender<StreamControl>>,
    pump: Option<JoinHandle<()>>,
}

impl CpalRecorder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Drop for CpalRecorder {
    fn drop(&mut self) {
        MicRecorder::stop(self);
    }
}

#[async_trait]
impl MicRecorder for CpalRecorder {
    async fn start(&mut self, sink: mpsc::Sender<MediaInput>) -> Result<()> {
        MicRecorder::stop(self);

        let (samples_tx, samples_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();
        let (control_tx, control_rx) = std_mpsc::channel();
        std::thread::Builder::new()
            .name("audio-input".into())
            .spawn(move || match build_input_stream(samples_tx) {
                Ok((stream, device_rate)) => {
                    let _ = ready_tx.send(Ok(device_rate));
                    run_stream_control(stream, control_rx);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .context("Failed to spawn microphone thread")?;

        let device_rate = ready_rx
            .await
            .context("Microphone thread exited during setup")??;
        let resampler = StreamResampler::new(device_rate, LIVE_API_INPUT_SAMPLE_RATE as u32)?;

        self.pump = Some(tokio::spawn(pump_microphone(samples_rx, resampler, sink)));
        self.control = Some(control_tx);
        info!(device_rate, "Microphone capture started");
        Ok(())
    }

    fn stop(&mut self) {
        if self.control.take().is_some() {
            debug!("Microphone capture stopped");
        }
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

/// Resamples microphone blocks and emits fixed-size chunks with their level.
async fn pump_microphone(
    mut samples: mpsc::UnboundedReceiver<Vec<f32>>,
    mut resampler: StreamResampler,
    sink: mpsc::Sender<MediaInput>,
) {
    let mut pending: Vec<f32> = Vec::with_capacity(MIC_CHUNK_SAMPLES * 2);
    while let Some(block) = samples.recv().await {
        match resampler.process(&block) {
            Ok(resampled) => pending.extend(resampled),
            Err(e) => {
                let message = format!("Microphone resampling failed: {:#}", e);
                let _ = sink
                    .send(MediaInput::Error {
                        device: MediaDevice::Microphone,
                        message,
                    })
                    .await;
                return;
            }
        }
        while pending.len() >= MIC_CHUNK_SAMPLES {
            let chunk: Vec<f32> = pending.drain(..MIC_CHUNK_SAMPLES).collect();
            let input = MediaInput::MicChunk {
                data: audio_utils::encode_f32_to_base64_i16(&chunk),
                level: audio_utils::peak_level(&chunk),
            };
            if sink.send(input).await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[tokio::test]
    async fn pump_emits_fixed_chunks_with_level() {
        let (samples_tx, samples_rx) = mpsc::unbounded_channel();
        let (sink_tx, mut sink_rx) = mpsc::channel(4);
        let resampler = StreamResampler::new(16_000, 16_000).unwrap();
        let pump = tokio::spawn(pump_microphone(samples_rx, resampler, sink_tx));

        samples_tx.send(vec![0.25; MIC_CHUNK_SAMPLES / 2]).unwrap();
        samples_tx.send(vec![-0.5; MIC_CHUNK_SAMPLES]).unwrap();
        drop(samples_tx);

        match sink_rx.recv().await {
            Some(MediaInput::MicChunk { data, level }) => {
                assert_abs_diff_eq!(level, 0.5, epsilon = 0.0001);
                assert!(!data.is_empty());
            }
            other => panic!("expected a microphone chunk, got {:?}", other),
        }
        pump.await.unwrap();
        // Half a chunk is still pending and is never emitted.
        assert!(sink_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn recorder_stop_without_start_is_harmless() {
        let mut recorder = CpalRecorder::new();
        recorder.stop();
        recorder.stop();
    }
}
