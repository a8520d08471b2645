pub mod unifier;

pub use unifier::{AccumulatedTranscript, TranscriptUnifier, INTERIM_CLOSE, INTERIM_OPEN};
