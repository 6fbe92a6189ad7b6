//! Wire types for the Gemini Multimodal Live (BidiGenerateContent) protocol.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages sent from the client to the Live API.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    Setup(Setup),
    ClientContent(ClientContent),
    RealtimeInput(RealtimeInput),
}

/// The first message of every session.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    pub model: String,
    pub generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<ResponseModality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_config: Option<SpeechConfig>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseModality {
    Text,
    Audio,
}

impl ResponseModality {
    /// Parses the lowercase form used by the response type selector.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" => Some(Self::Text),
            "audio" => Some(Self::Audio),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Audio => "audio",
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
    pub voice_config: VoiceConfig,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClientContent {
    pub turns: Vec<Content>,
    pub turn_complete: bool,
}

impl ClientContent {
    /// A complete user turn holding a single text part.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            turns: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part { text: text.into() }],
            }],
            turn_complete: true,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<Part>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Part {
    pub text: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub media_chunks: Vec<MediaChunk>,
}

/// A base64 payload streamed as realtime input (PCM audio or JPEG frames).
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MediaChunk {
    pub mime_type: String,
    pub data: String,
    /// Marks microphone audio that should cut into an in-progress tool turn.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub interrupt: bool,
}

impl MediaChunk {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
            interrupt: false,
        }
    }

    pub fn interrupting(mut self) -> Self {
        self.interrupt = true;
        self
    }
}

// --- Server side ---

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    pub setup_complete: Option<Value>,
    pub server_content: Option<ServerContent>,
    pub tool_call: Option<Value>,
    pub tool_call_cancellation: Option<Value>,
    pub error: Option<Value>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    pub model_turn: Option<ModelTurn>,
    pub turn_complete: Option<bool>,
    pub interrupted: Option<bool>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ModelTurn {
    #[serde(default)]
    pub parts: Vec<ServerPart>,
}

impl ModelTurn {
    pub fn has_function_call(&self) -> bool {
        self.parts.iter().any(|p| p.function_call.is_some())
    }

    pub fn has_function_response(&self) -> bool {
        self.parts.iter().any(|p| p.function_response.is_some())
    }

    /// Concatenation of every text part, in order.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect()
    }
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerPart {
    pub text: Option<String>,
    pub inline_data: Option<ServerBlob>,
    pub function_call: Option<Value>,
    pub function_response: Option<Value>,
}

impl ServerPart {
    pub fn is_pcm_audio(&self) -> bool {
        self.inline_data
            .as_ref()
            .is_some_and(|blob| blob.mime_type.starts_with("audio/pcm"))
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerBlob {
    #[serde(default)]
    pub mime_type: String,
    pub data: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn setup_serializes_in_camel_case() {
        let setup = ClientMessage::Setup(Setup {
            model: "models/gemini-2.0-flash-exp".to_string(),
            generation_config: GenerationConfig {
                response_modalities: vec![ResponseModality::Audio],
                speech_config: Some(SpeechConfig {
                    language_code: Some("en-US".to_string()),
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: "Aoede".to_string(),
                        },
                    },
                }),
            },
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part {
                    text: "Be brief.".to_string(),
                }],
            }),
        });

        let value = serde_json::to_value(&setup).unwrap();
        assert_eq!(
            value,
            json!({
                "setup": {
                    "model": "models/gemini-2.0-flash-exp",
                    "generationConfig": {
                        "responseModalities": ["AUDIO"],
                        "speechConfig": {
                            "languageCode": "en-US",
                            "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": "Aoede" } }
                        }
                    },
                    "systemInstruction": { "parts": [{ "text": "Be brief." }] }
                }
            })
        );
    }

    #[test]
    fn interrupt_marker_only_serialized_when_set() {
        let plain = ClientMessage::RealtimeInput(RealtimeInput {
            media_chunks: vec![MediaChunk::new("audio/pcm;rate=16000", "AAAA")],
        });
        let tagged = ClientMessage::RealtimeInput(RealtimeInput {
            media_chunks: vec![MediaChunk::new("audio/pcm;rate=16000", "AAAA").interrupting()],
        });

        assert_eq!(
            serde_json::to_value(&plain).unwrap(),
            json!({ "realtimeInput": { "mediaChunks": [{ "mimeType": "audio/pcm;rate=16000", "data": "AAAA" }] } })
        );
        assert_eq!(
            serde_json::to_value(&tagged).unwrap()["realtimeInput"]["mediaChunks"][0]["interrupt"],
            json!(true)
        );
    }

    #[test]
    fn user_text_is_a_complete_turn() {
        let value = serde_json::to_value(ClientMessage::ClientContent(ClientContent::user_text(
            "hello",
        )))
        .unwrap();
        assert_eq!(
            value,
            json!({ "clientContent": { "turns": [{ "role": "user", "parts": [{ "text": "hello" }] }], "turnComplete": true } })
        );
    }

    #[test]
    fn model_turn_helpers() {
        let msg: ServerMessage = serde_json::from_value(json!({
            "serverContent": {
                "modelTurn": {
                    "parts": [
                        { "text": "Hel" },
                        { "functionCall": { "name": "lookup", "args": {} } },
                        { "text": "lo" },
                        { "inlineData": { "mimeType": "audio/pcm;rate=24000", "data": "AAA=" } }
                    ]
                }
            }
        }))
        .unwrap();

        let turn = msg.server_content.unwrap().model_turn.unwrap();
        assert!(turn.has_function_call());
        assert!(!turn.has_function_response());
        assert_eq!(turn.text(), "Hello");
        assert!(turn.parts[3].is_pcm_audio());
        assert!(!turn.parts[0].is_pcm_audio());
    }

    #[test]
    fn response_modality_parse() {
        assert_eq!(ResponseModality::parse("Audio"), Some(ResponseModality::Audio));
        assert_eq!(ResponseModality::parse("text"), Some(ResponseModality::Text));
        assert_eq!(ResponseModality::parse("video"), None);
        assert_eq!(ResponseModality::Audio.as_str(), "audio");
    }
}
