//! WebSocket client for the Gemini Multimodal Live API.

use crate::{
    events::{CLOSE_CODE_ABNORMAL, CLOSE_CODE_NO_STATUS, CLOSE_CODE_NORMAL, LiveEvent, events_from_message},
    types::{ClientContent, ClientMessage, MediaChunk, RealtimeInput, ServerMessage, Setup},
};
use anyhow::{Context, Result, anyhow};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message as WsMessage};
use tracing::{debug, error, info, warn};

pub const DEFAULT_ENDPOINT: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1alpha.GenerativeService.BidiGenerateContent";

/// The endpoint with the API key as its `key` query parameter.
fn session_url(endpoint: &str, api_key: &str) -> String {
    format!("{}?key={}", endpoint, urlencoding::encode(api_key))
}

#[derive(Debug)]
enum Outbound {
    Message(ClientMessage),
    Close,
}

/// A single live session at a time; `connect` replaces any open one.
///
/// Events are delivered on an unbounded channel so the socket task never
/// waits on the owner while the owner is waiting on the socket task.
pub struct LiveClient {
    endpoint: String,
    events: mpsc::UnboundedSender<LiveEvent>,
    outbound: Option<mpsc::Sender<Outbound>>,
    task: Option<JoinHandle<()>>,
}

impl LiveClient {
    pub fn new(events: mpsc::UnboundedSender<LiveEvent>) -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT, events)
    }

    pub fn with_endpoint(endpoint: impl Into<String>, events: mpsc::UnboundedSender<LiveEvent>) -> Self {
        Self {
            endpoint: endpoint.into(),
            events,
            outbound: None,
            task: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.outbound.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    /// Opens the socket, sends the setup message and starts the session task.
    pub async fn connect(&mut self, setup: Setup, api_key: &str) -> Result<()> {
        if self.outbound.is_some() {
            self.disconnect().await?;
        }

        let (ws_stream, _) = connect_async(session_url(&self.endpoint, api_key))
            .await
            .context("Failed to connect to the Live API")?;
        info!(model = %setup.model, "Connected to Gemini Live WebSocket.");
        let _ = self.events.send(LiveEvent::Open);

        let (mut sink, stream) = ws_stream.split();
        let setup_payload = serde_json::to_string(&ClientMessage::Setup(setup))?;
        sink.send(WsMessage::Text(setup_payload.into()))
            .await
            .context("Failed to send setup message")?;
        let _ = self.events.send(LiveEvent::Log {
            kind: "client.send".to_string(),
            message: json!("setup"),
        });

        let (tx, rx) = mpsc::channel(128);
        let events = self.events.clone();
        self.task = Some(tokio::spawn(run_session(sink, stream, rx, events)));
        self.outbound = Some(tx);
        Ok(())
    }

    /// Closes the session and waits for its task. A no-op when not connected.
    pub async fn disconnect(&mut self) -> Result<()> {
        let Some(tx) = self.outbound.take() else {
            return Ok(());
        };
        let _ = tx.send(Outbound::Close).await;
        if let Some(handle) = self.task.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "Live session task did not shut down cleanly");
            }
        }
        info!("Disconnected from Gemini Live WebSocket.");
        Ok(())
    }

    pub async fn send_text(&self, text: &str) -> Result<()> {
        self.send(ClientMessage::ClientContent(ClientContent::user_text(text)))
            .await
    }

    pub async fn send_realtime_input(&self, media_chunks: Vec<MediaChunk>) -> Result<()> {
        self.send(ClientMessage::RealtimeInput(RealtimeInput { media_chunks }))
            .await
    }

    async fn send(&self, message: ClientMessage) -> Result<()> {
        let tx = self
            .outbound
            .as_ref()
            .ok_or_else(|| anyhow!("Live session is not connected"))?;
        tx.send(Outbound::Message(message))
            .await
            .map_err(|_| anyhow!("Live session is closed"))
    }
}

impl Drop for LiveClient {
    fn drop(&mut self) {
        if let Some(handle) = self.task.take() {
            handle.abort();
        }
    }
}

/// Pumps outbound messages to the socket and socket frames to events.
async fn run_session<S, R, E>(
    mut sink: S,
    mut stream: R,
    mut outbound: mpsc::Receiver<Outbound>,
    events: mpsc::UnboundedSender<LiveEvent>,
) where
    S: futures_util::Sink<WsMessage, Error = E> + Unpin,
    R: futures_util::Stream<Item = Result<WsMessage, E>> + Unpin,
    E: std::fmt::Display,
{
    loop {
        tokio::select! {
            command = outbound.recv() => match command {
                Some(Outbound::Message(message)) => {
                    let payload = match serde_json::to_string(&message) {
                        Ok(payload) => payload,
                        Err(e) => {
                            error!(error = %e, "Failed to serialize client message");
                            continue;
                        }
                    };
                    if let Err(e) = sink.send(WsMessage::Text(payload.into())).await {
                        error!(error = %e, "Failed to write to Live WebSocket");
                        let _ = events.send(LiveEvent::Error(e.to_string()));
                        break;
                    }
                }
                Some(Outbound::Close) | None => {
                    let _ = sink.send(WsMessage::Close(None)).await;
                    let _ = sink.close().await;
                    let _ = events.send(LiveEvent::Close {
                        code: CLOSE_CODE_NORMAL,
                        reason: String::new(),
                    });
                    break;
                }
            },
            frame = stream.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => dispatch(serde_json::from_str(&text), &events),
                Some(Ok(WsMessage::Binary(data))) => dispatch(serde_json::from_slice(&data), &events),
                Some(Ok(WsMessage::Close(frame))) => {
                    let (code, reason) = frame
                        .map(|f| (u16::from(f.code), f.reason.to_string()))
                        .unwrap_or((CLOSE_CODE_NO_STATUS, String::new()));
                    info!(code, %reason, "Live WebSocket closed by server.");
                    let _ = events.send(LiveEvent::Close { code, reason });
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!(error = %e, "Error reading from Live WebSocket");
                    let _ = events.send(LiveEvent::Error(e.to_string()));
                    let _ = events.send(LiveEvent::Close {
                        code: CLOSE_CODE_ABNORMAL,
                        reason: e.to_string(),
                    });
                    break;
                }
                None => {
                    let _ = events.send(LiveEvent::Close {
                        code: CLOSE_CODE_ABNORMAL,
                        reason: String::new(),
                    });
                    break;
                }
            },
        }
    }
}

fn dispatch(parsed: serde_json::Result<ServerMessage>, events: &mpsc::UnboundedSender<LiveEvent>) {
    match parsed {
        Ok(message) => {
            for event in events_from_message(message) {
                debug!(?event, "Live event");
                let _ = events.send(event);
            }
        }
        Err(e) => {
            warn!(error = %e, "Failed to parse Live API message");
            let _ = events.send(LiveEvent::Error(format!(
                "Failed to parse server message: {}",
                e
            )));
        }
    }
}
