// Enveloped provider variant.
//
// Client frames carry base64 PCM16 in an `{"audio_data": ...}` JSON envelope;
// the upstream leg takes the decoded bytes as binary frames. Inbound messages
// are typed session-lifecycle, turn-result, and error objects. Termination is
// a two-step handshake: a typed `Terminate` message, then the close.

use anyhow::{Context, Result};
use base64::Engine;
use serde::Deserialize;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header, HeaderValue};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};
use url::Url;

use super::{ClientCommand, Provider, UpstreamAdapter, UpstreamSink, UpstreamSocket};
use crate::config::AssemblyAiConfig;
use crate::events::{ClientFrame, ControlMessage, UnifiedEvent};
use futures::SinkExt;

const TERMINATE_MESSAGE: &str = r#"{"type":"Terminate"}"#;

pub struct AssemblyAiAdapter {
    config: AssemblyAiConfig,
    sample_rate: u32,
}

impl AssemblyAiAdapter {
    pub fn new(config: AssemblyAiConfig, sample_rate: u32) -> Self {
        Self {
            config,
            sample_rate,
        }
    }

    fn stream_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.config.url).context("Invalid AssemblyAI URL")?;
        url.query_pairs_mut()
            .append_pair("sample_rate", &self.sample_rate.to_string())
            .append_pair("format_turns", "true")
            .append_pair("punctuate", "true")
            .append_pair("interim_results", "true");
        Ok(url)
    }
}

/// Closed set of inbound message shapes; anything else lands in `Unknown`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum AssemblyAiMessage {
    Begin {
        #[serde(default)]
        id: Option<String>,
    },
    Turn {
        #[serde(default)]
        transcript: String,
        #[serde(default)]
        turn_is_formatted: bool,
    },
    Termination {
        #[serde(default)]
        audio_duration_seconds: Option<f64>,
    },
    Error {
        #[serde(default)]
        error: String,
    },
    #[serde(other)]
    Unknown,
}

#[async_trait::async_trait]
impl UpstreamAdapter for AssemblyAiAdapter {
    fn provider(&self) -> Provider {
        Provider::AssemblyAi
    }

    async fn connect(&self) -> Result<UpstreamSocket> {
        let url = self.stream_url()?;

        let mut request = url
            .as_str()
            .into_client_request()
            .context("Failed to build AssemblyAI request")?;
        request.headers_mut().insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&self.config.api_key)
                .context("Invalid AssemblyAI credential")?,
        );

        let (socket, _response) = connect_async(request)
            .await
            .context("AssemblyAI connection failed")?;

        Ok(socket)
    }

    fn parse_client_frame(&self, frame: &axum::extract::ws::Message) -> ClientCommand {
        match frame {
            axum::extract::ws::Message::Text(text) => {
                match serde_json::from_str::<ClientFrame>(text) {
                    Ok(ClientFrame::Audio(envelope)) => {
                        match base64::engine::general_purpose::STANDARD.decode(&envelope.audio_data)
                        {
                            Ok(pcm) => ClientCommand::Audio(pcm),
                            Err(e) => {
                                warn!("Invalid base64 audio payload, dropping: {}", e);
                                ClientCommand::Ignore
                            }
                        }
                    }
                    Ok(ClientFrame::Control(ControlMessage::Terminate)) => ClientCommand::Terminate,
                    Err(e) => {
                        warn!("Unparsable client frame on enveloped path, dropping: {}", e);
                        ClientCommand::Ignore
                    }
                }
            }
            // A well-behaved client never sends binary here, but the bytes
            // are exactly what the upstream leg wants, so forward them.
            axum::extract::ws::Message::Binary(pcm) => {
                warn!("Unexpected binary frame on enveloped path, forwarding anyway");
                ClientCommand::Audio(pcm.clone())
            }
            _ => ClientCommand::Ignore,
        }
    }

    fn encode_outbound(&self, pcm: Vec<u8>) -> Message {
        Message::Binary(pcm)
    }

    fn decode_inbound(&self, text: &str) -> Option<UnifiedEvent> {
        match serde_json::from_str::<AssemblyAiMessage>(text) {
            Ok(AssemblyAiMessage::Begin { id }) => {
                let message = match id {
                    Some(id) => format!("AssemblyAI session began (id {})", id),
                    None => "AssemblyAI session began".to_string(),
                };
                Some(UnifiedEvent::status(message))
            }
            Ok(AssemblyAiMessage::Turn {
                transcript,
                turn_is_formatted,
            }) => {
                if transcript.trim().is_empty() {
                    return None;
                }
                Some(UnifiedEvent::transcript(transcript, turn_is_formatted))
            }
            Ok(AssemblyAiMessage::Termination {
                audio_duration_seconds,
            }) => {
                let message = match audio_duration_seconds {
                    Some(secs) => format!("AssemblyAI session terminated after {:.1}s", secs),
                    None => "AssemblyAI session terminated".to_string(),
                };
                Some(UnifiedEvent::status(message))
            }
            Ok(AssemblyAiMessage::Error { error }) => {
                Some(UnifiedEvent::error(format!("AssemblyAI error: {}", error)))
            }
            Ok(AssemblyAiMessage::Unknown) => {
                debug!("Unrecognized AssemblyAI message type, dropping");
                None
            }
            Err(e) => {
                warn!("Failed to parse AssemblyAI message: {}", e);
                None
            }
        }
    }

    /// Two-step handshake: typed terminate message, then close.
    async fn terminate(&self, sink: &mut UpstreamSink) -> Result<()> {
        sink.send(Message::Text(TERMINATE_MESSAGE.to_string()))
            .await
            .context("Failed to send Terminate message")?;
        sink.close()
            .await
            .context("Failed to close AssemblyAI leg")?;
        Ok(())
    }
}
