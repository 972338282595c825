use crate::config::Config;
use crate::events::StreamEvent;
use crate::stream::{Frame, LineFramer, parse_frame};
use anyhow::{Context, Result};
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;

/// Events emitted while a submitted message is being answered
#[derive(Debug, Clone, PartialEq)]
pub enum ThreadEvent {
    /// One text fragment for the in-progress assistant message
    Delta(String),
    /// The assistant finished its turn
    Completed,
    /// The stream is over; always emitted last, even after an error
    Done,
    /// Read or transport failure
    Error(String),
}

#[derive(Debug, Deserialize)]
struct ThreadCreated {
    #[serde(rename = "threadId")]
    thread_id: String,
}

/// HTTP client for the chat service
#[derive(Clone)]
pub struct AssistantClient {
    config: Config,
    client: reqwest::Client,
}

impl AssistantClient {
    pub fn new(config: Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { config, client })
    }

    /// Ask the bootstrap endpoint for a new conversation thread.
    /// Every call allocates a fresh thread; there are no retries.
    pub async fn create_thread(&self) -> Result<String> {
        let url = self.config.thread_url();
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .context("Thread bootstrap request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("Thread bootstrap returned status {}", response.status());
        }

        let created: ThreadCreated = response
            .json()
            .await
            .context("Failed to parse thread bootstrap response")?;
        Ok(created.thread_id)
    }

    /// Submit a message to the thread and stream back the reply.
    ///
    /// The returned receiver yields deltas as they arrive and always
    /// ends with `ThreadEvent::Done`, whether the service sent its
    /// terminator, the body simply ended, or a read failed.
    pub fn send_message(&self, thread_id: &str, content: String) -> mpsc::Receiver<ThreadEvent> {
        let (tx, rx) = mpsc::channel(1000);
        let client = self.client.clone();
        let url = self.config.message_url(thread_id);

        tokio::spawn(async move {
            if let Err(e) = Self::pump_stream(client, url, content, tx.clone()).await {
                let _ = tx.send(ThreadEvent::Error(e.to_string())).await;
            }
            let _ = tx.send(ThreadEvent::Done).await;
        });

        rx
    }

    async fn pump_stream(
        client: reqwest::Client,
        url: String,
        content: String,
        tx: mpsc::Sender<ThreadEvent>,
    ) -> Result<()> {
        let response = client
            .post(&url)
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Message endpoint error {status}: {body}");
        }

        let mut stream = response.bytes_stream();
        let mut framer = LineFramer::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            // Raw bytes go to the framer; a chunk may end mid-character
            for line in framer.push(&chunk) {
                if Self::dispatch_frame(&line, &tx).await {
                    // Terminator seen: drop the rest of the batch
                    return Ok(());
                }
            }
        }

        // Flush a final line the service sent without a newline
        if let Some(line) = framer.finish() {
            Self::dispatch_frame(&line, &tx).await;
        }

        Ok(())
    }

    /// Forward one frame to the view. Returns true on the terminator.
    async fn dispatch_frame(line: &str, tx: &mpsc::Sender<ThreadEvent>) -> bool {
        match parse_frame(line) {
            Frame::Done => true,
            Frame::Event(StreamEvent::MessageDelta { fragments }) => {
                for fragment in fragments {
                    let _ = tx.send(ThreadEvent::Delta(fragment)).await;
                }
                false
            }
            Frame::Event(StreamEvent::RunCompleted) => {
                let _ = tx.send(ThreadEvent::Completed).await;
                false
            }
            Frame::Event(StreamEvent::Unrecognized { event }) => {
                tracing::warn!(%event, "skipping unrecognized stream frame");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> AssistantClient {
        let mut config = Config::default();
        config.api_base_url = server.uri();
        AssistantClient::new(config).unwrap()
    }

    async fn collect(mut rx: mpsc::Receiver<ThreadEvent>) -> Vec<ThreadEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn create_thread_parses_thread_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/thread"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "threadId": "thread_abc123"
                })),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(client.create_thread().await.unwrap(), "thread_abc123");
    }

    #[tokio::test]
    async fn create_thread_surfaces_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/thread"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(serde_json::json!({ "error": "internal server error" })),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.create_thread().await.is_err());
    }

    #[tokio::test]
    async fn send_message_streams_deltas_then_done() {
        let server = MockServer::start().await;
        let body = concat!(
            "data: {\"event\":\"thread.message.delta\",\"data\":{\"delta\":{\"content\":[{\"text\":{\"value\":\"Hel\"}}]}}}\n",
            "data: {\"event\":\"thread.message.delta\",\"data\":{\"delta\":{\"content\":[{\"text\":{\"value\":\"lo\"}}]}}}\n",
            "data: [DONE]\n",
        );
        Mock::given(method("POST"))
            .and(path("/api/chat/thread_1"))
            .and(body_json(serde_json::json!({ "content": "hi" })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let events = collect(client.send_message("thread_1", "hi".to_string())).await;
        assert_eq!(
            events,
            vec![
                ThreadEvent::Delta("Hel".to_string()),
                ThreadEvent::Delta("lo".to_string()),
                ThreadEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn completion_event_is_forwarded() {
        let server = MockServer::start().await;
        let body = "data: {\"event\":\"thread.run.completed\"}\ndata: [DONE]\n";
        Mock::given(method("POST"))
            .and(path("/api/chat/thread_2"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let events = collect(client.send_message("thread_2", "hi".to_string())).await;
        assert_eq!(events, vec![ThreadEvent::Completed, ThreadEvent::Done]);
    }

    #[tokio::test]
    async fn body_without_terminator_still_ends_with_done() {
        let server = MockServer::start().await;
        let body = "data: {\"event\":\"thread.message.delta\",\"data\":{\"delta\":{\"content\":[{\"text\":{\"value\":\"hi\"}}]}}}";
        Mock::given(method("POST"))
            .and(path("/api/chat/thread_3"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let events = collect(client.send_message("thread_3", "hi".to_string())).await;
        assert_eq!(
            events,
            vec![ThreadEvent::Delta("hi".to_string()), ThreadEvent::Done]
        );
    }

    #[tokio::test]
    async fn garbage_line_is_skipped_and_terminator_still_lands() {
        let server = MockServer::start().await;
        let body = concat!(
            "data: <<<not json>>>\n",
            "data: {\"event\":\"thread.message.delta\",\"data\":{\"delta\":{\"content\":[{\"text\":{\"value\":\"ok\"}}]}}}\n",
            "data: [DONE]\n",
        );
        Mock::given(method("POST"))
            .and(path("/api/chat/thread_5"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let events = collect(client.send_message("thread_5", "hi".to_string())).await;
        assert_eq!(
            events,
            vec![ThreadEvent::Delta("ok".to_string()), ThreadEvent::Done]
        );
    }

    #[tokio::test]
    async fn transport_failure_emits_error_then_done() {
        // Nothing listens on this port
        let mut config = Config::default();
        config.api_base_url = "http://127.0.0.1:1".to_string();
        let client = AssistantClient::new(config).unwrap();

        let events = collect(client.send_message("thread_4", "hi".to_string())).await;
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ThreadEvent::Error(_)));
        assert_eq!(events[1], ThreadEvent::Done);
    }
}
