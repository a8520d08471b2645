//! Upstream provider adapters.
//!
//! Each adapter owns one provider's wire protocol: how a client frame on its
//! relay path carries audio, how audio is framed on the upstream leg, how
//! inbound provider messages decode into [`UnifiedEvent`]s, and what the
//! termination handshake looks like.

pub mod assemblyai;
pub mod deepgram;

use std::fmt;

use anyhow::Result;
use futures::stream::SplitSink;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::events::UnifiedEvent;

pub use assemblyai::AssemblyAiAdapter;
pub use deepgram::DeepgramAdapter;

/// Upstream socket as produced by `connect_async`.
pub type UpstreamSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Write half of an upstream socket.
pub type UpstreamSink = SplitSink<UpstreamSocket, Message>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Deepgram,
    AssemblyAi,
}

impl Provider {
    /// Human-readable name used in status/error events and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Provider::Deepgram => "Deepgram",
            Provider::AssemblyAi => "AssemblyAI",
        }
    }

    /// Relay endpoint path for this provider.
    pub fn path(&self) -> &'static str {
        match self {
            Provider::Deepgram => "/ws/deepgram",
            Provider::AssemblyAi => "/ws/assemblyai",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What one inbound client frame means on a given relay path.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    /// PCM16 audio extracted from the frame.
    Audio(Vec<u8>),
    /// Graceful end of the subsession.
    Terminate,
    /// Unparsable or irrelevant frame; dropped, session continues.
    Ignore,
}

/// Capability contract every provider adapter implements.
#[async_trait::async_trait]
pub trait UpstreamAdapter: Send + Sync {
    fn provider(&self) -> Provider;

    /// Open the upstream connection with this provider's auth scheme and
    /// stream parameters.
    async fn connect(&self) -> Result<UpstreamSocket>;

    /// Interpret one client frame arriving on this adapter's relay path.
    fn parse_client_frame(&self, frame: &axum::extract::ws::Message) -> ClientCommand;

    /// Frame PCM16 bytes for the upstream leg.
    fn encode_outbound(&self, pcm: Vec<u8>) -> Message;

    /// Decode one inbound provider message into a unified event. `None`
    /// means the message carries nothing a client should see.
    fn decode_inbound(&self, text: &str) -> Option<UnifiedEvent>;

    /// Provider-specific termination handshake, ending with a close.
    async fn terminate(&self, sink: &mut UpstreamSink) -> Result<()>;
}
