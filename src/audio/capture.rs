// Microphone capture backend using cpal.
//
// The cpal stream is not Send, so a dedicated capture thread owns it for its
// whole lifetime. Frames cross into async land over an mpsc channel; when the
// consumer falls behind the channel drops frames rather than queueing them,
// matching the relay's best-effort policy.

use anyhow::{bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};

/// Microphone capture via the default cpal input device.
pub struct CpalBackend {
    config: AudioBackendConfig,
    capturing: bool,
    stop_tx: Option<std_mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl CpalBackend {
    pub fn new(config: AudioBackendConfig) -> Result<Self> {
        if config.capture_buffer == 0 {
            bail!("capture buffer must be non-zero");
        }

        info!(
            "cpal backend initialized (target {}Hz, {} samples/tick)",
            config.target_sample_rate, config.capture_buffer
        );

        Ok(Self {
            config,
            capturing: false,
            stop_tx: None,
            thread: None,
        })
    }
}

#[async_trait::async_trait]
impl AudioBackend for CpalBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.capturing {
            bail!("Already capturing");
        }

        info!("Starting microphone capture");

        let (frame_tx, frame_rx) = mpsc::channel(32);
        let (stop_tx, stop_rx) = std_mpsc::channel();
        let buffer_len = self.config.capture_buffer;

        let thread = std::thread::Builder::new()
            .name("duoscribe-capture".to_string())
            .spawn(move || {
                if let Err(e) = capture_loop(buffer_len, frame_tx, stop_rx) {
                    error!("Capture thread failed: {:#}", e);
                }
            })
            .context("Failed to spawn capture thread")?;

        self.stop_tx = Some(stop_tx);
        self.thread = Some(thread);
        self.capturing = true;

        Ok(frame_rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if !self.capturing {
            return Ok(());
        }

        info!("Stopping microphone capture");

        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }

        if let Some(handle) = self.thread.take() {
            tokio::task::spawn_blocking(move || {
                if handle.join().is_err() {
                    error!("Capture thread panicked");
                }
            })
            .await
            .context("Failed to join capture thread")?;
        }

        self.capturing = false;

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "cpal microphone"
    }
}

/// Runs on the capture thread. Owns the cpal stream until stop is requested.
fn capture_loop(
    buffer_len: usize,
    frame_tx: mpsc::Sender<AudioFrame>,
    stop_rx: std_mpsc::Receiver<()>,
) -> Result<()> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .context("No input device available")?;

    let supported = device
        .default_input_config()
        .context("Failed to get default input config")?;

    let device_rate = supported.sample_rate().0;
    let channels = supported.channels() as usize;

    if supported.sample_format() != cpal::SampleFormat::F32 {
        bail!(
            "Unsupported input sample format: {:?}",
            supported.sample_format()
        );
    }

    info!(
        "Audio device: {}Hz, {} channel(s), {} samples/tick",
        device_rate, channels, buffer_len
    );

    let stream_config: cpal::StreamConfig = supported.into();
    let started = Instant::now();
    let mut pending: Vec<f32> = Vec::with_capacity(buffer_len * 2);
    let mut dropped_frames = 0usize;

    let stream = device
        .build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                // Average interleaved channels down to mono.
                if channels > 1 {
                    pending.extend(
                        data.chunks(channels)
                            .map(|frame| frame.iter().sum::<f32>() / channels as f32),
                    );
                } else {
                    pending.extend_from_slice(data);
                }

                while pending.len() >= buffer_len {
                    let samples: Vec<f32> = pending.drain(..buffer_len).collect();
                    let frame = AudioFrame {
                        samples,
                        sample_rate: device_rate,
                        timestamp_ms: started.elapsed().as_millis() as u64,
                    };

                    if frame_tx.try_send(frame).is_err() {
                        dropped_frames += 1;
                        if dropped_frames % 100 == 1 {
                            debug!("Consumer behind, {} capture frames dropped", dropped_frames);
                        }
                    }
                }
            },
            |err| error!("Audio input stream error: {}", err),
            None,
        )
        .context("Failed to build input stream")?;

    stream.play().context("Failed to start input stream")?;

    // Block until stop is requested; a dropped sender unblocks too.
    let _ = stop_rx.recv();

    drop(stream);
    info!("Capture thread exiting");

    Ok(())
}
