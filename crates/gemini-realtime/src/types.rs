//! Wire types for the Gemini Live `BidiGenerateContent` WebSocket protocol.
//!
//! Only the parts of the protocol the relay needs to understand are typed.
//! Server messages are kept as raw JSON text so they can be forwarded to the
//! browser without losing fields; client messages are typed at the top level
//! and keep unknown nested fields in flattened maps.

use crate::error::LiveError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

// --- Session setup ---

/// Output modality the model should respond with.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Modality {
    Text,
    Audio,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

impl SpeechConfig {
    /// Speech configuration using one of the vendor's prebuilt voices.
    pub fn prebuilt(voice_name: impl Into<String>) -> Self {
        Self {
            voice_config: VoiceConfig {
                prebuilt_voice_config: PrebuiltVoiceConfig {
                    voice_name: voice_name.into(),
                },
            },
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub response_modalities: Vec<Modality>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speech_config: Option<SpeechConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_timestamp: Option<bool>,
}

/// JSON-schema type names in the dialect the Live API accepts.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum SchemaType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

impl SchemaType {
    /// Maps a standard JSON-schema `type` keyword onto the Live API dialect.
    pub fn from_json_schema(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "integer" => Some(Self::Integer),
            "boolean" => Some(Self::Boolean),
            "array" => Some(Self::Array),
            "object" => Some(Self::Object),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Schema {
    #[serde(rename = "type")]
    pub schema_type: SchemaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Schema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

/// A function the model may call during the session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Schema>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    /// A role-less content block holding a single text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            role: None,
            parts: vec![Part {
                text: Some(text.into()),
                ..Default::default()
            }],
        }
    }
}

/// Everything a session is opened with, apart from the model identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveConnectConfig {
    pub response_modalities: Vec<Modality>,
    pub speech_config: Option<SpeechConfig>,
    pub audio_timestamp: bool,
    pub system_instruction: Option<Content>,
    pub tools: Vec<Tool>,
}

impl LiveConnectConfig {
    /// Builds the `setup` payload for `model`, adding the `models/` prefix when missing.
    pub fn to_setup(&self, model: &str) -> Setup {
        let model = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{model}")
        };
        Setup {
            model,
            generation_config: GenerationConfig {
                response_modalities: self.response_modalities.clone(),
                speech_config: self.speech_config.clone(),
                audio_timestamp: self.audio_timestamp.then_some(true),
            },
            system_instruction: self.system_instruction.clone(),
            tools: self.tools.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    pub model: String,
    pub generation_config: GenerationConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
}

/// The first frame of every session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SetupMessage {
    pub setup: Setup,
}

// --- Client to server ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClientContent {
    #[serde(default)]
    pub turns: Vec<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_complete: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media_chunks: Vec<Blob>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<Blob>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// The result of one function call, echoing the call's name and id.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FunctionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub response: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub function_responses: Vec<FunctionResponse>,
}

/// A message sent from our side into the live session.
///
/// Unknown top-level fields are rejected, which also keeps browsers from
/// sending a second `setup`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LiveClientMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_content: Option<ClientContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realtime_input: Option<RealtimeInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_response: Option<ToolResponse>,
}

impl LiveClientMessage {
    /// Parses a browser frame, rejecting frames that carry no content.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, LiveError> {
        let message: Self = serde_json::from_slice(bytes)?;
        if message.is_empty() {
            return Err(LiveError::EmptyMessage);
        }
        Ok(message)
    }

    pub fn tool_response(function_responses: Vec<FunctionResponse>) -> Self {
        Self {
            tool_response: Some(ToolResponse { function_responses }),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.client_content.is_none() && self.realtime_input.is_none() && self.tool_response.is_none()
    }
}

// --- Server to client ---

/// A single function invocation requested by the model.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    #[serde(default)]
    pub function_calls: Vec<FunctionCall>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerEnvelope {
    setup_complete: Option<Value>,
    tool_call: Option<ToolCall>,
}

/// A message received from the live session.
///
/// The original JSON text is kept untouched; only `setupComplete` and
/// `toolCall` are interpreted.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveServerMessage {
    text: String,
    setup_complete: bool,
    tool_call: Option<ToolCall>,
}

impl LiveServerMessage {
    pub fn parse(text: impl Into<String>) -> Result<Self, LiveError> {
        let text = text.into();
        let envelope: ServerEnvelope = serde_json::from_str(&text)?;
        Ok(Self {
            setup_complete: envelope.setup_complete.is_some(),
            tool_call: envelope.tool_call,
            text,
        })
    }

    /// Parses a binary frame; the server sends JSON in binary frames as well.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LiveError> {
        Self::parse(std::str::from_utf8(bytes)?)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    pub fn is_setup_complete(&self) -> bool {
        self.setup_complete
    }

    pub fn tool_call(&self) -> Option<&ToolCall> {
        self.tool_call.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn course_config() -> LiveConnectConfig {
        LiveConnectConfig {
            response_modalities: vec![Modality::Audio, Modality::Text],
            speech_config: Some(SpeechConfig::prebuilt("Kore")),
            audio_timestamp: true,
            system_instruction: Some(Content::text("You sell courses.")),
            tools: vec![Tool {
                function_declarations: vec![FunctionDeclaration {
                    name: "list_courses".to_string(),
                    description: "List all available courses.".to_string(),
                    parameters: None,
                }],
            }],
        }
    }

    #[test]
    fn test_setup_serialization() {
        let setup = SetupMessage {
            setup: course_config().to_setup("gemini-2.0-flash-exp"),
        };
        let value = serde_json::to_value(&setup).unwrap();

        assert_eq!(
            value,
            json!({
                "setup": {
                    "model": "models/gemini-2.0-flash-exp",
                    "generationConfig": {
                        "responseModalities": ["AUDIO", "TEXT"],
                        "speechConfig": {
                            "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": "Kore" } }
                        },
                        "audioTimestamp": true
                    },
                    "systemInstruction": { "parts": [{ "text": "You sell courses." }] },
                    "tools": [{
                        "functionDeclarations": [{
                            "name": "list_courses",
                            "description": "List all available courses."
                        }]
                    }]
                }
            })
        );
    }

    #[test]
    fn test_setup_keeps_existing_model_prefix_and_omits_empty_tools() {
        let mut config = course_config();
        config.tools.clear();
        config.audio_timestamp = false;
        let setup = config.to_setup("models/gemini-2.0-flash-exp");

        assert_eq!(setup.model, "models/gemini-2.0-flash-exp");
        let value = serde_json::to_value(&setup).unwrap();
        assert!(value.get("tools").is_none());
        assert!(value["generationConfig"].get("audioTimestamp").is_none());
    }

    #[test]
    fn test_schema_serialization() {
        let schema = Schema {
            schema_type: SchemaType::Object,
            description: None,
            properties: BTreeMap::from([(
                "query".to_string(),
                Schema {
                    schema_type: SchemaType::String,
                    description: Some("search query".to_string()),
                    properties: BTreeMap::new(),
                    required: vec![],
                },
            )]),
            required: vec!["query".to_string()],
        };

        assert_eq!(
            serde_json::to_value(&schema).unwrap(),
            json!({
                "type": "OBJECT",
                "properties": { "query": { "type": "STRING", "description": "search query" } },
                "required": ["query"]
            })
        );
    }

    #[test]
    fn test_server_message_with_tool_call() {
        let text = r#"{"toolCall":{"functionCalls":[{"id":"call-1","name":"get_course","args":{"course":"secure-coding-101"}},{"name":"list_courses"}]}}"#;
        let message = LiveServerMessage::parse(text).unwrap();

        let calls = &message.tool_call().unwrap().function_calls;
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id.as_deref(), Some("call-1"));
        assert_eq!(calls[0].args["course"], "secure-coding-101");
        assert_eq!(calls[1].name, "list_courses");
        assert!(calls[1].args.is_empty());
        assert!(!message.is_setup_complete());
    }

    #[test]
    fn test_server_message_keeps_original_text() {
        let text = r#"{"serverContent":{"modelTurn":{"parts":[{"text":"Hi"}]}},"usageMetadata":{"z":1,"a":2}}"#;
        let message = LiveServerMessage::parse(text).unwrap();

        assert!(message.tool_call().is_none());
        assert_eq!(message.as_str(), text);
        assert_eq!(message.into_text(), text);
    }

    #[test]
    fn test_server_message_setup_complete_and_binary_frames() {
        let message = LiveServerMessage::from_bytes(br#"{"setupComplete":{}}"#).unwrap();
        assert!(message.is_setup_complete());

        assert!(matches!(
            LiveServerMessage::from_bytes(&[0xff, 0xfe]),
            Err(LiveError::Utf8(_))
        ));
        assert!(matches!(
            LiveServerMessage::parse("[1, 2]"),
            Err(LiveError::Decode(_))
        ));
    }

    #[test]
    fn test_client_message_parsing() {
        let raw = br#"{"realtimeInput":{"mediaChunks":[{"mimeType":"audio/pcm","data":"AAAA"}]}}"#;
        let message = LiveClientMessage::from_slice(raw).unwrap();
        let input = message.realtime_input.as_ref().unwrap();
        assert_eq!(input.media_chunks[0].mime_type, "audio/pcm");

        let round_trip = serde_json::to_value(&message).unwrap();
        assert_eq!(
            round_trip,
            serde_json::from_slice::<Value>(raw).unwrap()
        );
    }

    #[test]
    fn test_client_message_keeps_unknown_nested_fields() {
        let raw = json!({
            "clientContent": {
                "turns": [{ "role": "user", "parts": [{ "fileData": { "fileUri": "gs://x" } }] }],
                "turnComplete": true
            }
        });
        let message = LiveClientMessage::from_slice(raw.to_string().as_bytes()).unwrap();

        assert_eq!(serde_json::to_value(&message).unwrap(), raw);
    }

    #[test]
    fn test_client_message_rejects_empty_and_unknown() {
        assert!(matches!(
            LiveClientMessage::from_slice(b"{}"),
            Err(LiveError::EmptyMessage)
        ));
        assert!(matches!(
            LiveClientMessage::from_slice(br#"{"setup":{"model":"x"}}"#),
            Err(LiveError::Decode(_))
        ));
        assert!(matches!(
            LiveClientMessage::from_slice(b"not json"),
            Err(LiveError::Decode(_))
        ));
    }

    #[test]
    fn test_tool_response_message() {
        let message = LiveClientMessage::tool_response(vec![FunctionResponse {
            id: Some("call-1".to_string()),
            name: "list_courses".to_string(),
            response: Map::from_iter([("courses".to_string(), json!([]))]),
        }]);

        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "toolResponse": {
                    "functionResponses": [
                        { "id": "call-1", "name": "list_courses", "response": { "courses": [] } }
                    ]
                }
            })
        );
    }

    #[test]
    fn test_schema_type_mapping() {
        assert_eq!(SchemaType::from_json_schema("string"), Some(SchemaType::String));
        assert_eq!(SchemaType::from_json_schema("object"), Some(SchemaType::Object));
        assert_eq!(SchemaType::from_json_schema("null"), None);
    }
}
