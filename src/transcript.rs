use crate::events::{ChatMessage, ChatRole};

/// Whether an assistant reply is currently being accumulated.
///
/// While `InProgress`, the trailing transcript entry is the assistant
/// message under construction and each delta rewrites it in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum AssistantTurn {
    #[default]
    Idle,
    InProgress { accumulated: String },
}

/// Ordered message log plus the in-flight assistant turn.
///
/// Append-only except for the trailing assistant message, which grows
/// as fragments arrive. Invariant: at most one assistant message is in
/// progress at a time, and it is the last element while incomplete.
#[derive(Debug, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
    turn: AssistantTurn,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn turn(&self) -> &AssistantTurn {
        &self.turn
    }

    /// Append a user message. Any previous assistant turn is closed
    /// first so a stale accumulator can never bleed into the reply.
    pub fn push_user(&mut self, text: String) {
        self.finish_turn();
        self.messages.push(ChatMessage::new(ChatRole::User, text));
    }

    /// Fold one content fragment into the current assistant message,
    /// starting a new one if no turn is in progress.
    pub fn apply_delta(&mut self, fragment: &str) {
        match &mut self.turn {
            AssistantTurn::Idle => {
                self.messages
                    .push(ChatMessage::new(ChatRole::Assistant, fragment.to_string()));
                self.turn = AssistantTurn::InProgress {
                    accumulated: fragment.to_string(),
                };
            }
            AssistantTurn::InProgress { accumulated } => {
                accumulated.push_str(fragment);
                if let Some(last) = self.messages.last_mut() {
                    last.text = accumulated.clone();
                }
            }
        }
    }

    /// Close the in-flight turn. The partial message, if any, stays in
    /// the log as-is.
    pub fn finish_turn(&mut self) {
        self.turn = AssistantTurn::Idle;
    }
}
