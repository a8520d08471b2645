pub mod backend;
pub mod capture;
pub mod pcm;

pub use backend::{AudioBackend, AudioBackendConfig, AudioFrame};
pub use capture::CpalBackend;
pub use pcm::{encode_chunk, EncodedChunk, TARGET_SAMPLE_RATE};
