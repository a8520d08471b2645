use anyhow::Result;
use tokio::sync::mpsc;

/// Audio sample data produced by a capture backend.
///
/// Samples are mono f32 at the device's native rate; the encode stage
/// resamples and quantizes before anything leaves the client.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Vec<f32>,
    /// Sample rate in Hz (device-native).
    pub sample_rate: u32,
    /// Timestamp in milliseconds since capture started.
    pub timestamp_ms: u64,
}

/// Configuration for audio capture.
#[derive(Debug, Clone)]
pub struct AudioBackendConfig {
    /// Target sample rate downstream encoding resamples to.
    pub target_sample_rate: u32,
    /// Samples per capture tick, pre-resample.
    pub capture_buffer: usize,
}

impl Default for AudioBackendConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 16000,
            capture_buffer: 4096,
        }
    }
}

/// Audio capture backend trait
///
/// The production implementation is the cpal microphone backend; tests feed
/// frames straight into the encode stage instead.
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive audio frames
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing audio
    async fn stop(&mut self) -> Result<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}
