use anyhow::{Context, Result};
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{timeout, MissedTickBehavior};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{info, warn};

use crate::audio::{encode_chunk, AudioBackend, AudioBackendConfig, CpalBackend};
use crate::config::Config;
use crate::curation::CurationClient;
use crate::events::UnifiedEvent;
use crate::providers::Provider;
use crate::transcript::TranscriptUnifier;

const TERMINATE_FRAME: &str = r#"{"type":"terminate"}"#;

/// Commands fanned out to one provider path's task.
enum PathCommand {
    Audio(Message),
    Terminate,
}

/// One live recording run: microphone capture, two relay connections, and
/// the accumulated side-by-side transcript with periodic curation.
pub struct CaptureSession {
    config: Config,
    context: String,
    session_id: String,
}

impl CaptureSession {
    pub fn new(config: Config, context: String) -> Self {
        let session_id = format!("capture-{}", uuid::Uuid::new_v4());
        Self {
            config,
            context,
            session_id,
        }
    }

    /// Run until Ctrl-C (or until both provider paths have ended).
    pub async fn run(self) -> Result<()> {
        let started_at = Utc::now();
        info!(session_id = %self.session_id, "starting capture session");

        let backend_config = AudioBackendConfig {
            target_sample_rate: self.config.audio.sample_rate,
            capture_buffer: self.config.audio.capture_buffer,
        };
        anyhow::ensure!(
            self.config.audio.channels == 1,
            "only mono capture is supported"
        );

        let mut backend = CpalBackend::new(backend_config)?;
        let mut frame_rx = backend.start().await.context("Failed to start capture")?;

        // Two independently cancellable subsession tasks fan their events
        // into one per-session channel.
        let (event_tx, mut event_rx) = mpsc::channel::<(Provider, UnifiedEvent)>(256);
        let (deepgram_tx, deepgram_rx) = mpsc::channel::<PathCommand>(64);
        let (assemblyai_tx, assemblyai_rx) = mpsc::channel::<PathCommand>(64);

        let relay_url = self.config.client.relay_url.trim_end_matches('/').to_string();
        let deepgram_task = tokio::spawn(run_subsession(
            Provider::Deepgram,
            format!("{}{}", relay_url, Provider::Deepgram.path()),
            deepgram_rx,
            event_tx.clone(),
        ));
        let assemblyai_task = tokio::spawn(run_subsession(
            Provider::AssemblyAi,
            format!("{}{}", relay_url, Provider::AssemblyAi.path()),
            assemblyai_rx,
            event_tx,
        ));

        // Encode once per capture tick and hand each path its encoding. A
        // path that is not keeping up loses its copy; nothing is queued.
        let sample_rate = self.config.audio.sample_rate;
        let audio_dg = deepgram_tx.clone();
        let audio_aai = assemblyai_tx.clone();
        let encode_task = tokio::spawn(async move {
            while let Some(frame) = frame_rx.recv().await {
                let chunk = encode_chunk(&frame.samples, frame.sample_rate, sample_rate);
                let _ = audio_dg.try_send(PathCommand::Audio(Message::Binary(chunk.raw)));
                let _ = audio_aai.try_send(PathCommand::Audio(Message::Text(chunk.envelope)));
            }
        });

        let curation = CurationClient::new(&self.config.curation);
        let curation_inflight = Arc::new(AtomicBool::new(false));
        let (curated_tx, mut curated_rx) = mpsc::channel::<String>(8);
        let mut curation_tick =
            tokio::time::interval(Duration::from_secs(self.config.curation.interval_secs.max(1)));
        curation_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut unifier = TranscriptUnifier::new();
        let mut last_curated = String::new();
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        info!("recording; press Ctrl-C to stop");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("stopping capture session");
                    let _ = deepgram_tx.send(PathCommand::Terminate).await;
                    let _ = assemblyai_tx.send(PathCommand::Terminate).await;
                    break;
                }
                event = event_rx.recv() => match event {
                    Some((provider, event)) => {
                        handle_event(&mut unifier, provider, &event);
                    }
                    None => {
                        warn!("both provider paths ended");
                        break;
                    }
                },
                curated = curated_rx.recv() => {
                    if let Some(curated) = curated {
                        last_curated = curated;
                        println!("[curated] {}", last_curated);
                    }
                }
                _ = curation_tick.tick() => {
                    self.maybe_curate(&curation, &unifier, &curation_inflight, &curated_tx);
                }
            }
        }

        backend.stop().await.context("Failed to stop capture")?;
        encode_task.abort();

        // Give the relay a moment to cascade the closes, then give up. The
        // command senders stay alive until here so a draining subsession is
        // not cut off mid-handshake.
        for (provider, task) in [
            (Provider::Deepgram, deepgram_task),
            (Provider::AssemblyAi, assemblyai_task),
        ] {
            if timeout(Duration::from_secs(5), task).await.is_err() {
                warn!(provider = %provider, "subsession did not close in time");
            }
        }
        drop(deepgram_tx);
        drop(assemblyai_tx);

        let duration = Utc::now().signed_duration_since(started_at);
        info!(
            session_id = %self.session_id,
            "capture session ended after {:.1}s",
            duration.num_milliseconds() as f64 / 1000.0
        );

        println!();
        println!(
            "[{}] {}",
            Provider::Deepgram,
            unifier.transcript(Provider::Deepgram).display()
        );
        println!(
            "[{}] {}",
            Provider::AssemblyAi,
            unifier.transcript(Provider::AssemblyAi).display()
        );
        if !last_curated.is_empty() {
            println!("[curated] {}", last_curated);
        }

        Ok(())
    }

    /// Kick off a curation call unless one is already in flight or neither
    /// provider has produced confirmed text yet.
    fn maybe_curate(
        &self,
        curation: &CurationClient,
        unifier: &TranscriptUnifier,
        inflight: &Arc<AtomicBool>,
        curated_tx: &mpsc::Sender<String>,
    ) {
        let provider_a = unifier.transcript(Provider::Deepgram).confirmed().to_string();
        let provider_b = unifier
            .transcript(Provider::AssemblyAi)
            .confirmed()
            .to_string();

        if provider_a.is_empty() && provider_b.is_empty() {
            return;
        }
        if inflight.swap(true, Ordering::SeqCst) {
            return;
        }

        let curation = curation.clone();
        let context = self.context.clone();
        let inflight = Arc::clone(inflight);
        let curated_tx = curated_tx.clone();
        tokio::spawn(async move {
            let curated = match curation.curate(&provider_a, &provider_b, &context).await {
                Ok(text) => text,
                Err(e) => format!("Error: {:#}", e),
            };
            inflight.store(false, Ordering::SeqCst);
            let _ = curated_tx.send(curated).await;
        });
    }
}

fn handle_event(unifier: &mut TranscriptUnifier, provider: Provider, event: &UnifiedEvent) {
    unifier.apply(provider, event);

    match event {
        UnifiedEvent::Transcript { text, is_final } => {
            if *is_final {
                println!("[{}] {}", provider, text);
            }
        }
        UnifiedEvent::Status { message } => {
            info!(provider = %provider, "{}", message);
        }
        UnifiedEvent::Error { message } => {
            warn!(provider = %provider, "{}", message);
        }
    }
}

/// One provider path: connect to the relay, pump audio out and unified
/// events in until the path ends or a terminate is requested.
async fn run_subsession(
    provider: Provider,
    url: String,
    mut commands: mpsc::Receiver<PathCommand>,
    events: mpsc::Sender<(Provider, UnifiedEvent)>,
) {
    let (socket, _response) = match connect_async(&url).await {
        Ok(connected) => connected,
        Err(e) => {
            let _ = events
                .send((
                    provider,
                    UnifiedEvent::error(format!("relay connection failed: {}", e)),
                ))
                .await;
            return;
        }
    };

    info!(provider = %provider, "connected to relay");
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(PathCommand::Audio(message)) => {
                    if sink.send(message).await.is_err() {
                        break;
                    }
                }
                Some(PathCommand::Terminate) => {
                    // Relay runs the provider handshake and cascades the
                    // close back to us; keep reading until it does.
                    if sink.send(Message::Text(TERMINATE_FRAME.to_string())).await.is_err() {
                        break;
                    }
                }
                None => {
                    let _ = sink.close().await;
                    break;
                }
            },
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<UnifiedEvent>(&text) {
                        Ok(event) => {
                            if events.send((provider, event)).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!(provider = %provider, "unparsable relay event: {}", e),
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!(provider = %provider, "relay connection closed");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(provider = %provider, "relay transport error: {}", e);
                    break;
                }
            },
        }
    }
}
