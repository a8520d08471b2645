//! The relay server: one inbound WebSocket path per provider, each bridged
//! to its own upstream connection.
//!
//! - `/ws/deepgram` — raw binary PCM16 frames in, unified events out
//! - `/ws/assemblyai` — base64 JSON envelopes in, unified events out
//! - `/health` — health check

mod bridge;
mod server;
mod subsession;

pub use server::{create_router, serve, AppState};
pub use subsession::{Subsession, SubsessionState};
