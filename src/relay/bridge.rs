// Per-connection bridge between one client leg and one upstream provider leg.
//
// The upstream connect runs concurrently with the client leg; audio arriving
// before the upstream is open is dropped, not queued. Once open, a dedicated
// reader task decodes provider messages into unified events over an explicit
// channel, and the bridge loop pumps both directions until either leg ends.
// An upstream close always cascades to closing the client leg.

use axum::extract::ws::{Message as ClientMessage, WebSocket};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::subsession::{Subsession, SubsessionState};
use crate::events::UnifiedEvent;
use crate::providers::{ClientCommand, UpstreamAdapter};
use tokio_tungstenite::tungstenite::Message as UpstreamMessage;

/// Signals from the upstream reader task to the bridge loop.
enum UpstreamSignal {
    Event(UnifiedEvent),
    Closed,
}

pub async fn run(client: WebSocket, adapter: Arc<dyn UpstreamAdapter>) {
    let provider = adapter.provider();
    info!(provider = %provider, "client connected");

    bridge(client, adapter).await;

    info!(provider = %provider, "client session ended");
}

async fn bridge(mut client: WebSocket, adapter: Arc<dyn UpstreamAdapter>) {
    let provider = adapter.provider();
    let mut subsession = Subsession::new(provider);

    // Upstream connect runs concurrently; client audio arriving meanwhile is
    // dropped (best-effort policy, no queue).
    let mut connect = adapter.connect();
    let mut dropped_while_connecting = 0usize;

    let connected = loop {
        tokio::select! {
            result = &mut connect => break result,
            frame = client.recv() => match frame {
                Some(Ok(ClientMessage::Close(_))) | Some(Err(_)) | None => {
                    info!(provider = %provider, "client left before upstream opened");
                    return;
                }
                Some(Ok(frame)) => match adapter.parse_client_frame(&frame) {
                    ClientCommand::Audio(_) => dropped_while_connecting += 1,
                    ClientCommand::Terminate => {
                        info!(provider = %provider, "terminate during connect, aborting");
                        let _ = client.send(ClientMessage::Close(None)).await;
                        return;
                    }
                    ClientCommand::Ignore => {}
                },
            },
        }
    };

    if dropped_while_connecting > 0 {
        debug!(
            provider = %provider,
            dropped = dropped_while_connecting,
            "audio frames dropped before upstream open"
        );
    }

    let upstream = match connected {
        Ok(socket) => socket,
        Err(e) => {
            subsession.mark_failed();
            warn!(provider = %provider, "upstream connect failed: {:#}", e);
            // Adapter errors carry the provider name in their context.
            let event = UnifiedEvent::error(format!("{:#}", e));
            send_event(&mut client, &event).await;
            let _ = client.send(ClientMessage::Close(None)).await;
            return;
        }
    };

    subsession.mark_open();
    if !send_event(
        &mut client,
        &UnifiedEvent::status(format!("Connected to {}", provider)),
    )
    .await
    {
        return;
    }

    let (mut upstream_sink, upstream_stream) = upstream.split();

    // Dedicated consumer task per subsession: decode inbound provider
    // messages into an explicit event channel.
    let (signal_tx, mut signal_rx) = mpsc::channel::<UpstreamSignal>(64);
    let reader_adapter = Arc::clone(&adapter);
    let reader = tokio::spawn(async move {
        let mut stream = upstream_stream;
        while let Some(message) = stream.next().await {
            match message {
                Ok(UpstreamMessage::Text(text)) => {
                    if let Some(event) = reader_adapter.decode_inbound(&text) {
                        if signal_tx.send(UpstreamSignal::Event(event)).await.is_err() {
                            return;
                        }
                    }
                }
                Ok(UpstreamMessage::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!("upstream transport error: {}", e);
                    break;
                }
            }
        }
        let _ = signal_tx.send(UpstreamSignal::Closed).await;
    });

    loop {
        tokio::select! {
            frame = client.recv() => match frame {
                Some(Ok(ClientMessage::Close(_))) | None => {
                    info!(provider = %provider, "client disconnected");
                    if subsession.begin_close() {
                        if let Err(e) = adapter.terminate(&mut upstream_sink).await {
                            debug!(provider = %provider, "terminate after disconnect failed: {:#}", e);
                        }
                    }
                    break;
                }
                Some(Err(e)) => {
                    warn!(provider = %provider, "client transport error: {}", e);
                    if subsession.begin_close() {
                        let _ = adapter.terminate(&mut upstream_sink).await;
                    }
                    break;
                }
                Some(Ok(frame)) => match adapter.parse_client_frame(&frame) {
                    ClientCommand::Audio(pcm) => {
                        if subsession.state() == SubsessionState::Open {
                            if let Err(e) = upstream_sink.send(adapter.encode_outbound(pcm)).await {
                                // The reader side will observe the fault and
                                // drive the teardown.
                                warn!(provider = %provider, "failed to forward audio: {}", e);
                            }
                        }
                    }
                    ClientCommand::Terminate => {
                        if subsession.begin_close() {
                            info!(provider = %provider, "terminate requested");
                            if let Err(e) = adapter.terminate(&mut upstream_sink).await {
                                warn!(provider = %provider, "termination handshake failed: {:#}", e);
                            }
                        }
                    }
                    ClientCommand::Ignore => {}
                },
            },
            signal = signal_rx.recv() => {
                match signal {
                    Some(UpstreamSignal::Event(event)) => {
                        if !send_event(&mut client, &event).await {
                            if subsession.begin_close() {
                                let _ = adapter.terminate(&mut upstream_sink).await;
                            }
                            break;
                        }
                    }
                    Some(UpstreamSignal::Closed) | None => {
                        let initiated_by_us = subsession.state() == SubsessionState::Closing;
                        subsession.begin_close();
                        subsession.mark_closed();

                        if !initiated_by_us {
                            warn!(provider = %provider, "upstream closed unexpectedly");
                            send_event(
                                &mut client,
                                &UnifiedEvent::error(format!(
                                    "{} connection closed unexpectedly",
                                    provider
                                )),
                            )
                            .await;
                        }

                        let _ = client.send(ClientMessage::Close(None)).await;
                        break;
                    }
                }
            },
        }
    }

    subsession.mark_closed();
    reader.abort();
}

/// Returns false when the client leg is gone.
async fn send_event(client: &mut WebSocket, event: &UnifiedEvent) -> bool {
    match serde_json::to_string(event) {
        Ok(json) => client.send(ClientMessage::Text(json)).await.is_ok(),
        Err(e) => {
            warn!("failed to encode unified event: {}", e);
            false
        }
    }
}
