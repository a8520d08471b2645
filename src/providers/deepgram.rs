// Binary-frame provider variant.
//
// Audio travels as raw, unframed PCM16 on both legs. Inbound messages are
// `Results` objects; the top-ranked alternative's transcript and the
// `is_final` flag become a transcript event. Empty-text results (silence or
// formatting artifacts) are suppressed and never surfaced.

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header, HeaderValue};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};
use url::Url;

use super::{ClientCommand, Provider, UpstreamAdapter, UpstreamSink, UpstreamSocket};
use crate::config::DeepgramConfig;
use crate::events::{ControlMessage, UnifiedEvent};
use futures::SinkExt;

pub struct DeepgramAdapter {
    config: DeepgramConfig,
    sample_rate: u32,
}

impl DeepgramAdapter {
    pub fn new(config: DeepgramConfig, sample_rate: u32) -> Self {
        Self {
            config,
            sample_rate,
        }
    }

    fn listen_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.config.url).context("Invalid Deepgram URL")?;
        url.query_pairs_mut()
            .append_pair("model", &self.config.model)
            .append_pair("encoding", "linear16")
            .append_pair("sample_rate", &self.sample_rate.to_string())
            .append_pair("channels", "1")
            .append_pair("interim_results", "true")
            .append_pair("punctuate", "true")
            .append_pair("endpointing", &self.config.endpointing_ms.to_string());
        Ok(url)
    }
}

/// Closed set of inbound message shapes; anything else lands in `Unknown`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum DeepgramMessage {
    Results {
        #[serde(default)]
        channel: Option<ResultsChannel>,
        #[serde(default)]
        is_final: bool,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct ResultsChannel {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    #[serde(default)]
    transcript: String,
}

#[async_trait::async_trait]
impl UpstreamAdapter for DeepgramAdapter {
    fn provider(&self) -> Provider {
        Provider::Deepgram
    }

    async fn connect(&self) -> Result<UpstreamSocket> {
        let url = self.listen_url()?;

        let mut request = url
            .as_str()
            .into_client_request()
            .context("Failed to build Deepgram request")?;
        request.headers_mut().insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Token {}", self.config.api_key))
                .context("Invalid Deepgram credential")?,
        );

        let (socket, _response) = connect_async(request)
            .await
            .context("Deepgram connection failed")?;

        Ok(socket)
    }

    fn parse_client_frame(&self, frame: &axum::extract::ws::Message) -> ClientCommand {
        match frame {
            axum::extract::ws::Message::Binary(pcm) => ClientCommand::Audio(pcm.clone()),
            axum::extract::ws::Message::Text(text) => {
                match serde_json::from_str::<ControlMessage>(text) {
                    Ok(ControlMessage::Terminate) => ClientCommand::Terminate,
                    Err(_) => {
                        warn!("Unparsable text frame on binary path, dropping");
                        ClientCommand::Ignore
                    }
                }
            }
            _ => ClientCommand::Ignore,
        }
    }

    fn encode_outbound(&self, pcm: Vec<u8>) -> Message {
        Message::Binary(pcm)
    }

    fn decode_inbound(&self, text: &str) -> Option<UnifiedEvent> {
        match serde_json::from_str::<DeepgramMessage>(text) {
            Ok(DeepgramMessage::Results { channel, is_final }) => {
                let transcript = channel
                    .and_then(|c| c.alternatives.into_iter().next())
                    .map(|alt| alt.transcript)
                    .unwrap_or_default();

                if transcript.trim().is_empty() {
                    if is_final {
                        debug!("Final result with empty transcript, suppressed");
                    }
                    return None;
                }

                Some(UnifiedEvent::transcript(transcript, is_final))
            }
            Ok(DeepgramMessage::Unknown) => {
                debug!("Unrecognized Deepgram message type, dropping");
                None
            }
            Err(e) => {
                warn!("Failed to parse Deepgram message: {}", e);
                None
            }
        }
    }

    /// No termination handshake exists for this provider; a bare close ends
    /// the stream.
    async fn terminate(&self, sink: &mut UpstreamSink) -> Result<()> {
        sink.close().await.context("Failed to close Deepgram leg")?;
        Ok(())
    }
}
