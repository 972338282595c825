use crate::client::{AssistantClient, ThreadEvent};
use crate::storage::{FORM_DATA_KEY, KeyValueStore};
use crate::transcript::{AssistantTurn, Transcript};
use crate::ui::composer::{Composer, ComposerResult};
use crate::ui::log::ChatLog;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
};
use tokio::sync::mpsc;

/// Actions requested by the chat view
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewAction {
    None,
    Exit,
}

/// The chat view: message log, composer, and the in-flight stream.
///
/// The disabled-input flag is the only guard against overlapping
/// streamed requests; it stays set from submission until the stream
/// reports done or fails.
pub struct ChatView {
    client: AssistantClient,
    store: Box<dyn KeyValueStore>,
    transcript: Transcript,
    composer: Composer,
    thread_id: Option<String>,
    input_disabled: bool,
    stream_rx: Option<mpsc::Receiver<ThreadEvent>>,
}

impl ChatView {
    pub fn new(client: AssistantClient, store: Box<dyn KeyValueStore>) -> Self {
        Self {
            client,
            store,
            transcript: Transcript::new(),
            composer: Composer::new(),
            thread_id: None,
            input_disabled: false,
            stream_rx: None,
        }
    }

    /// Request a conversation thread from the bootstrap endpoint.
    /// Called once on startup; on failure the session stays unusable
    /// until the program is restarted.
    pub async fn initialize(&mut self) {
        match self.client.create_thread().await {
            Ok(thread_id) => {
                tracing::info!(%thread_id, "conversation thread created");
                self.thread_id = Some(thread_id);
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to create conversation thread");
            }
        }
    }

    /// Submit a message to the thread. No-op for empty text, a missing
    /// thread id, or while a previous stream is still running. Replay
    /// passes `display: false` to keep the payload out of the log.
    pub fn submit(&mut self, text: String, display: bool) {
        if text.trim().is_empty() || self.input_disabled {
            return;
        }
        let Some(thread_id) = self.thread_id.clone() else {
            tracing::debug!("submission dropped: no thread id yet");
            return;
        };

        if display {
            self.transcript.push_user(text.clone());
        }

        self.input_disabled = true;
        self.stream_rx = Some(self.client.send_message(&thread_id, text));
    }

    /// Resubmit the locally cached payload as a non-displayed message
    pub fn replay_cached_payload(&mut self) {
        match self.store.get(FORM_DATA_KEY) {
            Ok(Some(payload)) => self.submit(payload, false),
            Ok(None) => {
                tracing::error!("no cached payload found under '{FORM_DATA_KEY}'");
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to read cached payload");
            }
        }
    }

    /// Drain stream events that arrived since the last tick
    pub fn process_stream_events(&mut self) {
        let Some(rx) = self.stream_rx.as_mut() else {
            return;
        };

        let mut stream_over = false;
        loop {
            match rx.try_recv() {
                Ok(ThreadEvent::Delta(fragment)) => {
                    self.transcript.apply_delta(&fragment);
                }
                Ok(ThreadEvent::Completed) => {
                    self.input_disabled = false;
                }
                Ok(ThreadEvent::Done) => {
                    self.input_disabled = false;
                    self.transcript.finish_turn();
                    stream_over = true;
                    break;
                }
                Ok(ThreadEvent::Error(message)) => {
                    // Partial assistant message is kept as-is
                    tracing::error!(%message, "stream failed");
                    self.input_disabled = false;
                    self.transcript.finish_turn();
                }
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    self.input_disabled = false;
                    self.transcript.finish_turn();
                    stream_over = true;
                    break;
                }
            }
        }

        if stream_over {
            self.stream_rx = None;
        }
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
        if key.kind != KeyEventKind::Press {
            return ViewAction::None;
        }

        match (key.code, key.modifiers) {
            (KeyCode::Esc, _) => return ViewAction::Exit,
            (KeyCode::Char('c'), m) if m.contains(KeyModifiers::CONTROL) => {
                return ViewAction::Exit;
            }
            (KeyCode::Char('r'), m) if m.contains(KeyModifiers::CONTROL) => {
                self.replay_cached_payload();
                return ViewAction::None;
            }
            (KeyCode::Enter, m) if !m.contains(KeyModifiers::SHIFT) => {
                // Keep the draft while a reply is streaming or the
                // session never got a thread
                if self.input_disabled || self.thread_id.is_none() {
                    return ViewAction::None;
                }
            }
            _ => {}
        }

        if let ComposerResult::Submitted(text) = self.composer.handle_key(key) {
            self.submit(text, true);
        }
        ViewAction::None
    }

    pub fn render(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(5), Constraint::Length(3)])
            .split(frame.size());

        let reply_in_progress =
            matches!(self.transcript.turn(), AssistantTurn::InProgress { .. });
        frame.render_widget(
            ChatLog::new(self.transcript.messages(), reply_in_progress),
            chunks[0],
        );

        let (title, enabled) = if self.thread_id.is_none() {
            ("Message (no thread, restart to retry)", false)
        } else if self.input_disabled {
            ("Message (waiting for reply...)", false)
        } else {
            ("Message", true)
        };
        self.composer
            .draw(chunks[1], frame.buffer_mut(), title, enabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::events::ChatRole;
    use crate::storage::KeyValueStore;
    use anyhow::Result;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct MemoryStore {
        values: RefCell<HashMap<String, String>>,
    }

    impl MemoryStore {
        fn new() -> Self {
            Self {
                values: RefCell::new(HashMap::new()),
            }
        }

        fn with(key: &str, value: &str) -> Self {
            let store = Self::new();
            store
                .values
                .borrow_mut()
                .insert(key.to_string(), value.to_string());
            store
        }
    }

    impl KeyValueStore for MemoryStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            Ok(self.values.borrow().get(key).cloned())
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            self.values
                .borrow_mut()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }
    }

    fn view_for(base_url: &str, store: MemoryStore) -> ChatView {
        let mut config = Config::default();
        config.api_base_url = base_url.to_string();
        let client = AssistantClient::new(config).unwrap();
        ChatView::new(client, Box::new(store))
    }

    async fn drain(view: &mut ChatView) {
        for _ in 0..500 {
            view.process_stream_events();
            if view.stream_rx.is_none() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("stream did not finish");
    }

    fn delta_body(fragments: &[&str]) -> String {
        let mut body = String::new();
        for fragment in fragments {
            body.push_str(&format!(
                "data: {{\"event\":\"thread.message.delta\",\"data\":{{\"delta\":{{\"content\":[{{\"text\":{{\"value\":\"{fragment}\"}}}}]}}}}}}\n"
            ));
        }
        body.push_str("data: [DONE]\n");
        body
    }

    #[tokio::test]
    async fn empty_or_whitespace_submit_is_a_no_op() {
        let mut view = view_for("http://127.0.0.1:1", MemoryStore::new());
        view.thread_id = Some("thread_1".to_string());

        view.submit("".to_string(), true);
        view.submit("   \n ".to_string(), true);

        assert!(view.transcript.messages().is_empty());
        assert!(!view.input_disabled);
        assert!(view.stream_rx.is_none());
    }

    #[tokio::test]
    async fn submit_without_thread_is_silently_rejected() {
        let mut view = view_for("http://127.0.0.1:1", MemoryStore::new());
        view.submit("hello".to_string(), true);

        assert!(view.transcript.messages().is_empty());
        assert!(!view.input_disabled);
    }

    #[tokio::test]
    async fn submit_appends_user_message_and_disables_input() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat/thread_1"))
            .and(body_json(serde_json::json!({ "content": "hi" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(delta_body(&["Hel", "lo"]), "text/event-stream"),
            )
            .mount(&server)
            .await;

        let mut view = view_for(&server.uri(), MemoryStore::new());
        view.thread_id = Some("thread_1".to_string());
        view.submit("hi".to_string(), true);

        assert_eq!(view.transcript.messages().len(), 1);
        assert_eq!(view.transcript.messages()[0].role, ChatRole::User);
        assert!(view.input_disabled);

        drain(&mut view).await;

        let messages = view.transcript.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, ChatRole::Assistant);
        assert_eq!(messages[1].text, "Hello");
        assert!(!view.input_disabled);
    }

    #[tokio::test]
    async fn second_submission_is_blocked_while_streaming() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat/thread_1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(delta_body(&["ok"]), "text/event-stream")
                    .set_delay(Duration::from_millis(200)),
            )
            .mount(&server)
            .await;

        let mut view = view_for(&server.uri(), MemoryStore::new());
        view.thread_id = Some("thread_1".to_string());
        view.submit("first".to_string(), true);
        view.submit("second".to_string(), true);

        // Only the first submission made it into the log
        assert_eq!(view.transcript.messages().len(), 1);
        assert_eq!(view.transcript.messages()[0].text, "first");

        drain(&mut view).await;
        assert!(!view.input_disabled);
    }

    #[tokio::test]
    async fn stream_failure_reenables_input_and_keeps_partial_message() {
        // Nothing listens here, so the request itself fails
        let mut view = view_for("http://127.0.0.1:1", MemoryStore::new());
        view.thread_id = Some("thread_1".to_string());
        view.submit("hi".to_string(), true);
        assert!(view.input_disabled);

        drain(&mut view).await;

        assert!(!view.input_disabled);
        assert_eq!(view.transcript.messages().len(), 1);
    }

    #[tokio::test]
    async fn replay_resubmits_cached_payload_without_displaying_it() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat/thread_1"))
            .and(body_json(serde_json::json!({ "content": "{\"name\":\"Ada\"}" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(delta_body(&["Thanks, Ada"]), "text/event-stream"),
            )
            .mount(&server)
            .await;

        let store = MemoryStore::with(FORM_DATA_KEY, "{\"name\":\"Ada\"}");
        let mut view = view_for(&server.uri(), store);
        view.thread_id = Some("thread_1".to_string());

        view.replay_cached_payload();
        assert!(view.input_disabled);
        // The payload itself never shows up as a user message
        assert!(view.transcript.messages().is_empty());

        drain(&mut view).await;

        let messages = view.transcript.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, ChatRole::Assistant);
        assert_eq!(messages[0].text, "Thanks, Ada");
    }

    #[tokio::test]
    async fn replay_with_nothing_cached_is_a_no_op() {
        let mut view = view_for("http://127.0.0.1:1", MemoryStore::new());
        view.thread_id = Some("thread_1".to_string());

        view.replay_cached_payload();

        assert!(view.transcript.messages().is_empty());
        assert!(!view.input_disabled);
        assert!(view.stream_rx.is_none());
    }

    #[tokio::test]
    async fn initialize_stores_thread_id_from_bootstrap_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/thread"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "threadId": "thread_99" })),
            )
            .mount(&server)
            .await;

        let mut view = view_for(&server.uri(), MemoryStore::new());
        view.initialize().await;
        assert_eq!(view.thread_id.as_deref(), Some("thread_99"));
    }

    #[tokio::test]
    async fn initialize_failure_leaves_session_without_thread() {
        let mut view = view_for("http://127.0.0.1:1", MemoryStore::new());
        view.initialize().await;
        assert!(view.thread_id.is_none());
    }
}
