pub mod audio;
pub mod client;
pub mod config;
pub mod curation;
pub mod events;
pub mod providers;
pub mod relay;
pub mod transcript;

pub use audio::{
    encode_chunk, AudioBackend, AudioBackendConfig, AudioFrame, CpalBackend, EncodedChunk,
};
pub use config::Config;
pub use curation::CurationClient;
pub use events::UnifiedEvent;
pub use providers::{Provider, UpstreamAdapter};
pub use relay::{create_router, AppState, Subsession, SubsessionState};
pub use transcript::{AccumulatedTranscript, TranscriptUnifier};
