use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioConfig,
    pub providers: ProvidersConfig,
    pub client: ClientConfig,
    pub curation: CurationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub relay: RelayConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// Target rate for everything leaving the encode stage.
    pub sample_rate: u32,
    pub channels: u16,
    /// Samples per capture tick, pre-resample.
    pub capture_buffer: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProvidersConfig {
    pub deepgram: DeepgramConfig,
    pub assemblyai: AssemblyAiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeepgramConfig {
    pub url: String,
    pub api_key: String,
    pub model: String,
    pub endpointing_ms: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssemblyAiConfig {
    pub url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Relay base URL the capture client connects to, e.g. "ws://localhost:8000".
    pub relay_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurationConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub interval_secs: u64,
}

impl Config {
    /// Load configuration from a TOML file plus `DUOSCRIBE__`-prefixed
    /// environment overrides (provider keys usually live in the environment).
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("DUOSCRIBE").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
