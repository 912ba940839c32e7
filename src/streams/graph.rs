//! Causal-graph generation stream.
//!
//! The endpoint narrates the generation pipeline (`progress`), forwards
//! the model's raw output (`content`), and emits a single `result`
//! payload carrying the stored graph. The server brackets the exchange
//! with `start`/`done` framing events; `done` arrives only when no
//! `result` was produced, so it closes the session benignly.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::client::ClientError;
use crate::dispatch::{Dispatch, Flow, MessageCallback, Settlement};

/// Callbacks for the graph-generation stream.
#[derive(Default)]
pub struct GraphCallbacks {
    on_progress: Option<MessageCallback>,
    on_content: Option<MessageCallback>,
}

impl GraphCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive pipeline progress messages.
    pub fn on_progress(mut self, f: impl FnMut(&str) + Send + 'static) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    /// Receive raw model output as it is generated.
    pub fn on_content(mut self, f: impl FnMut(&str) + Send + 'static) -> Self {
        self.on_content = Some(Box::new(f));
        self
    }
}

/// Event vocabulary of the graph-generation endpoint.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum GraphEvent {
    Start {
        #[serde(default)]
        message: String,
    },
    Progress {
        #[serde(default)]
        message: String,
    },
    Content {
        #[serde(default)]
        content: String,
    },
    Result,
    Done,
    Error {
        #[serde(default)]
        message: String,
    },
    #[serde(other)]
    Other,
}

pub(crate) struct GraphDispatcher {
    callbacks: GraphCallbacks,
    settlement: Settlement,
}

impl GraphDispatcher {
    pub(crate) fn new(callbacks: GraphCallbacks) -> Self {
        Self {
            callbacks,
            settlement: Settlement::new(),
        }
    }
}

impl Dispatch for GraphDispatcher {
    fn dispatch(&mut self, payload: Value) -> Flow {
        let event = match serde_json::from_value(payload.clone()) {
            Ok(event) => event,
            Err(err) => {
                debug!("unrecognized graph payload: {}", err);
                return Flow::Continue;
            }
        };

        match event {
            GraphEvent::Start { message } | GraphEvent::Progress { message } => {
                if let Some(f) = &mut self.callbacks.on_progress {
                    f(&message);
                }
                Flow::Continue
            }
            GraphEvent::Content { content } => {
                if let Some(f) = &mut self.callbacks.on_content {
                    f(&content);
                }
                Flow::Continue
            }
            GraphEvent::Result => {
                self.settlement.resolve(payload);
                Flow::Finished
            }
            GraphEvent::Done => Flow::Finished,
            GraphEvent::Error { message } => {
                self.settlement.reject(ClientError::Protocol(error_text(message)));
                Flow::Finished
            }
            GraphEvent::Other => Flow::Continue,
        }
    }

    fn fail(&mut self, err: ClientError) {
        self.settlement.reject(err);
    }

    fn finish(self) -> Result<Option<Value>, ClientError> {
        self.settlement.into_outcome()
    }
}

fn error_text(message: String) -> String {
    if message.is_empty() {
        "graph generation stream failed".to_string()
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::drive;
    use crate::session::tests::ScriptSource;
    use std::sync::{Arc, Mutex};

    fn recording_callbacks() -> (GraphCallbacks, Arc<Mutex<Vec<String>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let progress_log = log.clone();
        let content_log = log.clone();

        let callbacks = GraphCallbacks::new()
            .on_progress(move |msg| progress_log.lock().unwrap().push(format!("progress:{}", msg)))
            .on_content(move |content| {
                content_log.lock().unwrap().push(format!("content:{}", content))
            });

        (callbacks, log)
    }

    #[tokio::test]
    async fn test_graph_stream_resolves_with_result_payload() {
        let (callbacks, log) = recording_callbacks();
        let source = ScriptSource::new([
            "data: {\"type\":\"start\",\"message\":\"starting\"}\n",
            "data: {\"type\":\"progress\",\"message\":\"loading patterns\"}\n",
            "data: {\"type\":\"content\",\"content\":\"{\\\"nodes\\\"\"}\n",
            "data: {\"type\":\"result\",\"data\":{\"graph_id\":7}}\n",
            "data: {\"type\":\"done\",\"message\":\"finished\"}\n",
        ]);

        let result = drive(async { Ok(source) }, GraphDispatcher::new(callbacks), None)
            .await
            .unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "progress:starting",
                "progress:loading patterns",
                "content:{\"nodes\"",
            ]
        );
        let payload = result.unwrap();
        assert_eq!(payload["data"]["graph_id"], 7);
    }

    #[tokio::test]
    async fn test_done_without_result_closes_benignly() {
        let (callbacks, _log) = recording_callbacks();
        let source = ScriptSource::new([
            "data: {\"type\":\"start\",\"message\":\"starting\"}\n",
            "data: {\"type\":\"done\",\"message\":\"nothing to do\"}\n",
        ]);

        let result = drive(async { Ok(source) }, GraphDispatcher::new(callbacks), None)
            .await
            .unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_error_event_rejects() {
        let (callbacks, _log) = recording_callbacks();
        let source =
            ScriptSource::new(["data: {\"type\":\"error\",\"message\":\"no patterns found\"}\n"]);

        let result = drive(async { Ok(source) }, GraphDispatcher::new(callbacks), None).await;

        match result {
            Err(ClientError::Protocol(message)) => assert_eq!(message, "no patterns found"),
            other => panic!("expected protocol error, got {:?}", other.map(|_| ())),
        }
    }
}
