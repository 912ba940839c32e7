//! Single-entity event-extraction stream.
//!
//! The endpoint reports progress while an LLM abstracts one user's raw
//! behavior into an event sequence, forwards the model's output chunk by
//! chunk, and finishes with a `done` payload that becomes the call's
//! result.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::client::ClientError;
use crate::dispatch::{Dispatch, Flow, MessageCallback, Settlement};

/// Callbacks for the single-entity extraction stream.
///
/// Every handler is optional; an event kind without a registered handler
/// is silently ignored.
#[derive(Default)]
pub struct ExtractCallbacks {
    on_progress: Option<MessageCallback>,
    on_llm_chunk: Option<MessageCallback>,
}

impl ExtractCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive `start` and `progress` messages.
    pub fn on_progress(mut self, f: impl FnMut(&str) + Send + 'static) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    /// Receive raw LLM output chunks as they are generated.
    pub fn on_llm_chunk(mut self, f: impl FnMut(&str) + Send + 'static) -> Self {
        self.on_llm_chunk = Some(Box::new(f));
        self
    }
}

/// Event vocabulary of the extraction endpoint.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ExtractEvent {
    Start {
        #[serde(default)]
        message: String,
    },
    Progress {
        #[serde(default)]
        message: String,
    },
    LlmChunk {
        #[serde(default)]
        content: String,
    },
    Done,
    Error {
        #[serde(default)]
        message: String,
    },
    #[serde(other)]
    Other,
}

pub(crate) struct ExtractDispatcher {
    callbacks: ExtractCallbacks,
    settlement: Settlement,
}

impl ExtractDispatcher {
    pub(crate) fn new(callbacks: ExtractCallbacks) -> Self {
        Self {
            callbacks,
            settlement: Settlement::new(),
        }
    }
}

impl Dispatch for ExtractDispatcher {
    fn dispatch(&mut self, payload: Value) -> Flow {
        let event = match serde_json::from_value(payload.clone()) {
            Ok(event) => event,
            Err(err) => {
                debug!("unrecognized extraction payload: {}", err);
                return Flow::Continue;
            }
        };

        match event {
            ExtractEvent::Start { message } | ExtractEvent::Progress { message } => {
                if let Some(f) = &mut self.callbacks.on_progress {
                    f(&message);
                }
                Flow::Continue
            }
            ExtractEvent::LlmChunk { content } => {
                if let Some(f) = &mut self.callbacks.on_llm_chunk {
                    f(&content);
                }
                Flow::Continue
            }
            ExtractEvent::Done => {
                // The full payload, not just the tag, is the result.
                self.settlement.resolve(payload);
                Flow::Finished
            }
            ExtractEvent::Error { message } => {
                self.settlement.reject(ClientError::Protocol(error_text(message)));
                Flow::Finished
            }
            ExtractEvent::Other => Flow::Continue,
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
        "extraction stream failed".to_string()
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

    fn recording_callbacks() -> (ExtractCallbacks, Arc<Mutex<Vec<String>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let progress_log = log.clone();
        let chunk_log = log.clone();

        let callbacks = ExtractCallbacks::new()
            .on_progress(move |msg| progress_log.lock().unwrap().push(format!("progress:{}", msg)))
            .on_llm_chunk(move |chunk| chunk_log.lock().unwrap().push(format!("chunk:{}", chunk)));

        (callbacks, log)
    }

    #[tokio::test]
    async fn test_extraction_stream_end_to_end() {
        let (callbacks, log) = recording_callbacks();
        let source = ScriptSource::new([
            "data: {\"type\":\"start\",\"message\":\"go\"}\n",
            "data: {\"type\":\"llm_chunk\",\"content\":\"hel\"}\n",
            "data: {\"type\":\"llm_chunk\",\"content\":\"lo\"}\n",
            "data: {\"type\":\"done\",\"x\":1}\n",
        ]);

        let result = drive(async { Ok(source) }, ExtractDispatcher::new(callbacks), None)
            .await
            .unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["progress:go", "chunk:hel", "chunk:lo"]
        );
        let payload = result.unwrap();
        assert_eq!(payload["type"], "done");
        assert_eq!(payload["x"], 1);
    }

    #[tokio::test]
    async fn test_duplicate_done_settles_once() {
        let (callbacks, log) = recording_callbacks();
        let source = ScriptSource::new([
            "data: {\"type\":\"done\",\"first\":true}\ndata: {\"type\":\"done\",\"first\":false}\ndata: {\"type\":\"llm_chunk\",\"content\":\"late\"}\n",
        ]);

        let result = drive(async { Ok(source) }, ExtractDispatcher::new(callbacks), None)
            .await
            .unwrap();

        let payload = result.unwrap();
        assert_eq!(payload["first"], true);
        // Nothing behind the terminal event is delivered.
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_error_event_rejects_with_server_message() {
        let (callbacks, _log) = recording_callbacks();
        let source = ScriptSource::new(["data: {\"type\":\"error\",\"message\":\"llm unavailable\"}\n"]);

        let result = drive(async { Ok(source) }, ExtractDispatcher::new(callbacks), None).await;

        match result {
            Err(ClientError::Protocol(message)) => assert_eq!(message, "llm unavailable"),
            other => panic!("expected protocol error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_error_event_without_message_uses_fallback() {
        let (callbacks, _log) = recording_callbacks();
        let source = ScriptSource::new(["data: {\"type\":\"error\"}\n"]);

        let result = drive(async { Ok(source) }, ExtractDispatcher::new(callbacks), None).await;

        match result {
            Err(ClientError::Protocol(message)) => assert_eq!(message, "extraction stream failed"),
            other => panic!("expected protocol error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_benign_close_resolves_none() {
        let (callbacks, log) = recording_callbacks();
        let source = ScriptSource::new(["data: {\"type\":\"progress\",\"message\":\"half way\"}\n"]);

        let result = drive(async { Ok(source) }, ExtractDispatcher::new(callbacks), None)
            .await
            .unwrap();

        assert!(result.is_none());
        assert_eq!(*log.lock().unwrap(), vec!["progress:half way"]);
    }

    #[tokio::test]
    async fn test_progress_split_across_utf8_boundary() {
        let (callbacks, log) = recording_callbacks();
        // "данные" split mid-character across two chunks.
        let line = "data: {\"type\":\"progress\",\"message\":\"данные\"}\n".as_bytes();
        let (a, b) = line.split_at(37);
        let source = ScriptSource::new([a, b]);

        drive(async { Ok(source) }, ExtractDispatcher::new(callbacks), None)
            .await
            .unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["progress:данные"]);
    }
}
