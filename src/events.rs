use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a chat participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn display_name(&self) -> &'static str {
        match self {
            ChatRole::User => "You",
            ChatRole::Assistant => "Assistant",
        }
    }
}

/// A single message in the transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: ChatRole, text: String) -> Self {
        Self {
            role,
            text,
            timestamp: Utc::now(),
        }
    }
}

/// A decoded event from the assistant's wire stream.
///
/// The wire format is newline-delimited JSON objects of the shape
/// `{"event": "...", "data": {...}}`. Only the event kinds the view
/// acts on are modeled; everything else lands in `Unrecognized` so
/// unknown frames stay visible in diagnostics instead of being
/// silently dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Incremental content for the in-progress assistant message
    MessageDelta { fragments: Vec<String> },
    /// The assistant finished its turn
    RunCompleted,
    /// Any other event kind
    Unrecognized { event: String },
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    event: String,
    #[serde(default)]
    data: Option<RawEventData>,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    #[serde(default)]
    delta: Option<RawDelta>,
}

#[derive(Debug, Deserialize)]
struct RawDelta {
    #[serde(default)]
    content: Vec<RawContentPart>,
}

#[derive(Debug, Deserialize)]
struct RawContentPart {
    #[serde(default)]
    text: Option<RawTextFragment>,
}

#[derive(Debug, Deserialize)]
struct RawTextFragment {
    value: String,
}

impl StreamEvent {
    /// Decode a single JSON event line into a tagged variant.
    ///
    /// Returns `None` when the line is not a JSON event object at all;
    /// the caller decides how to report that.
    pub fn from_json(line: &str) -> Option<StreamEvent> {
        let raw: RawEvent = serde_json::from_str(line).ok()?;
        Some(match raw.event.as_str() {
            "thread.message.delta" => {
                let fragments = raw
                    .data
                    .and_then(|d| d.delta)
                    .map(|delta| {
                        delta
                            .content
                            .into_iter()
                            .filter_map(|part| part.text.map(|t| t.value))
                            .collect()
                    })
                    .unwrap_or_default();
                StreamEvent::MessageDelta { fragments }
            }
            "thread.run.completed" => StreamEvent::RunCompleted,
            _ => StreamEvent::Unrecognized { event: raw.event },
        })
    }
}
