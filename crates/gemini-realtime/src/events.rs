//! Events surfaced by [`crate::LiveClient`] to its owner.

use crate::types::{ModelTurn, ServerContent, ServerMessage};
use base64::Engine;
use serde_json::Value;
use tracing::warn;

/// Close code reported when the peer closed without sending a status.
pub const CLOSE_CODE_NO_STATUS: u16 = 1005;
/// Close code reported when the socket ended without a close frame.
pub const CLOSE_CODE_ABNORMAL: u16 = 1006;
/// Close code reported for a locally requested disconnect.
pub const CLOSE_CODE_NORMAL: u16 = 1000;

/// Lifecycle and content notifications from a live session.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    /// The WebSocket handshake succeeded.
    Open,
    /// The connection closed.
    Close { code: u16, reason: String },
    SetupComplete,
    TurnComplete,
    /// The model stopped its current turn because the user spoke over it.
    Interrupted,
    /// Generic protocol trace, e.g. tool calls the client does not act on.
    Log { kind: String, message: Value },
    /// A transport or decoding failure.
    Error(String),
    /// An error reported by the server inside a message.
    ServerError(String),
    /// Raw PCM16 (little endian) audio from the model.
    Audio(Vec<u8>),
    /// A model turn with its audio parts removed.
    Content(ServerContent),
}

/// Splits a decoded server message into the events it carries, in order.
pub fn events_from_message(message: ServerMessage) -> Vec<LiveEvent> {
    let mut events = Vec::new();

    if let Some(error) = message.error {
        let text = match error {
            Value::String(s) => s,
            Value::Object(ref map) => map
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string()),
            other => other.to_string(),
        };
        events.push(LiveEvent::ServerError(text));
    }

    if let Some(tool_call) = message.tool_call {
        events.push(LiveEvent::Log {
            kind: "server.toolCall".to_string(),
            message: tool_call,
        });
    }

    if let Some(cancellation) = message.tool_call_cancellation {
        events.push(LiveEvent::Log {
            kind: "server.toolCallCancellation".to_string(),
            message: cancellation,
        });
    }

    if message.setup_complete.is_some() {
        events.push(LiveEvent::SetupComplete);
    }

    if let Some(content) = message.server_content {
        if content.interrupted == Some(true) {
            events.push(LiveEvent::Interrupted);
            return events;
        }

        if let Some(turn) = content.model_turn {
            let (audio, other): (Vec<_>, Vec<_>) =
                turn.parts.into_iter().partition(|part| part.is_pcm_audio());

            for part in audio {
                let Some(blob) = part.inline_data else { continue };
                match base64::engine::general_purpose::STANDARD.decode(&blob.data) {
                    Ok(bytes) => events.push(LiveEvent::Audio(bytes)),
                    Err(e) => {
                        warn!(error = %e, "Dropping undecodable audio part");
                        events.push(LiveEvent::Error(format!(
                            "Failed to decode audio payload: {}",
                            e
                        )));
                    }
                }
            }

            if !other.is_empty() {
                events.push(LiveEvent::Content(ServerContent {
                    model_turn: Some(ModelTurn { parts: other }),
                    turn_complete: None,
                    interrupted: None,
                }));
            }
        }

        if content.turn_complete == Some(true) {
            events.push(LiveEvent::TurnComplete);
        }
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> ServerMessage {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn setup_complete() {
        let events = events_from_message(parse(json!({ "setupComplete": {} })));
        assert_eq!(events, vec![LiveEvent::SetupComplete]);
    }

    #[test]
    fn audio_parts_are_split_from_content() {
        let events = events_from_message(parse(json!({
            "serverContent": {
                "modelTurn": {
                    "parts": [
                        { "inlineData": { "mimeType": "audio/pcm;rate=24000", "data": "AAEC" } },
                        { "text": "hi" }
                    ]
                },
                "turnComplete": true
            }
        })));

        assert_eq!(events.len(), 3);
        assert_eq!(events[0], LiveEvent::Audio(vec![0, 1, 2]));
        match &events[1] {
            LiveEvent::Content(content) => {
                let turn = content.model_turn.as_ref().unwrap();
                assert_eq!(turn.parts.len(), 1);
                assert_eq!(turn.text(), "hi");
            }
            other => panic!("expected content, got {:?}", other),
        }
        assert_eq!(events[2], LiveEvent::TurnComplete);
    }

    #[test]
    fn audio_only_turn_emits_no_content() {
        let events = events_from_message(parse(json!({
            "serverContent": {
                "modelTurn": {
                    "parts": [{ "inlineData": { "mimeType": "audio/pcm", "data": "AAA=" } }]
                }
            }
        })));
        assert_eq!(events, vec![LiveEvent::Audio(vec![0, 0])]);
    }

    #[test]
    fn interrupted_short_circuits_the_rest_of_the_content() {
        let events = events_from_message(parse(json!({
            "serverContent": { "interrupted": true, "turnComplete": true }
        })));
        assert_eq!(events, vec![LiveEvent::Interrupted]);
    }

    #[test]
    fn tool_call_and_server_error() {
        let events = events_from_message(parse(json!({
            "error": { "code": 400, "message": "bad request" },
            "toolCall": { "functionCalls": [{ "name": "f" }] }
        })));
        assert_eq!(events[0], LiveEvent::ServerError("bad request".to_string()));
        match &events[1] {
            LiveEvent::Log { kind, message } => {
                assert_eq!(kind, "server.toolCall");
                assert_eq!(message["functionCalls"][0]["name"], "f");
            }
            other => panic!("expected log, got {:?}", other),
        }
    }

    #[test]
    fn bad_audio_payload_reports_error() {
        let events = events_from_message(parse(json!({
            "serverContent": {
                "modelTurn": { "parts": [{ "inlineData": { "mimeType": "audio/pcm", "data": "!!" } }] }
            }
        })));
        assert!(matches!(events.as_slice(), [LiveEvent::Error(_)]));
    }
}
