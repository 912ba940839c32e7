//! Batch event-extraction stream.
//!
//! Unlike the other endpoints, the batch stream's payloads carry no
//! explicit `type` tag; variants are told apart by which fields are
//! present. Classification precedence is fixed and significant:
//!
//! 1. an explicit `error` field wins over everything else,
//! 2. a terminal `completed` status,
//! 3. a `user_id` field (one user's result, possibly carrying a nested
//!    `progress` payload that is forwarded after the result itself),
//! 4. a `processing` status.
//!
//! The upstream protocol is loose here; reordering these checks misroutes
//! ambiguous payloads.

use serde_json::Value;
use tracing::debug;

use crate::client::ClientError;
use crate::dispatch::{Dispatch, Flow, MessageCallback, PayloadCallback, Settlement};

/// Callbacks for the batch extraction stream.
#[derive(Default)]
pub struct BatchCallbacks {
    on_status: Option<PayloadCallback>,
    on_user_result: Option<PayloadCallback>,
    on_progress: Option<PayloadCallback>,
    on_completed: Option<PayloadCallback>,
    on_error: Option<MessageCallback>,
}

impl BatchCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive processing-status payloads.
    pub fn on_status(mut self, f: impl FnMut(&Value) + Send + 'static) -> Self {
        self.on_status = Some(Box::new(f));
        self
    }

    /// Receive one payload per finished user.
    pub fn on_user_result(mut self, f: impl FnMut(&Value) + Send + 'static) -> Self {
        self.on_user_result = Some(Box::new(f));
        self
    }

    /// Receive the nested progress object of a per-user result.
    pub fn on_progress(mut self, f: impl FnMut(&Value) + Send + 'static) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    /// Receive the terminal completion payload.
    pub fn on_completed(mut self, f: impl FnMut(&Value) + Send + 'static) -> Self {
        self.on_completed = Some(Box::new(f));
        self
    }

    /// Receive the terminal error message.
    pub fn on_error(mut self, f: impl FnMut(&str) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatchEvent {
    Error,
    Completed,
    UserResult,
    Processing,
    Unknown,
}

/// Priority-ordered classification over the untagged payload.
fn classify(payload: &Value) -> BatchEvent {
    if payload.get("error").is_some() {
        return BatchEvent::Error;
    }
    if payload.get("status").and_then(Value::as_str) == Some("completed") {
        return BatchEvent::Completed;
    }
    if payload.get("user_id").is_some() {
        return BatchEvent::UserResult;
    }
    if payload.get("status").and_then(Value::as_str) == Some("processing") {
        return BatchEvent::Processing;
    }
    BatchEvent::Unknown
}

fn error_text(payload: &Value) -> String {
    match payload.get("error") {
        Some(Value::String(message)) => message.clone(),
        Some(other) => other.to_string(),
        None => "batch extraction stream failed".to_string(),
    }
}

pub(crate) struct BatchDispatcher {
    callbacks: BatchCallbacks,
    settlement: Settlement,
}

impl BatchDispatcher {
    pub(crate) fn new(callbacks: BatchCallbacks) -> Self {
        Self {
            callbacks,
            settlement: Settlement::new(),
        }
    }
}

impl Dispatch for BatchDispatcher {
    fn dispatch(&mut self, payload: Value) -> Flow {
        match classify(&payload) {
            BatchEvent::Error => {
                let message = error_text(&payload);
                if self.settlement.reject(ClientError::Protocol(message.clone())) {
                    if let Some(f) = &mut self.callbacks.on_error {
                        f(&message);
                    }
                }
                Flow::Finished
            }
            BatchEvent::Completed => {
                if self.settlement.resolve(payload.clone()) {
                    if let Some(f) = &mut self.callbacks.on_completed {
                        f(&payload);
                    }
                }
                Flow::Finished
            }
            BatchEvent::UserResult => {
                if let Some(f) = &mut self.callbacks.on_user_result {
                    f(&payload);
                }
                // A per-user result may carry its own progress payload;
                // forward it after the result.
                if let Some(progress) = payload.get("progress") {
                    if let Some(f) = &mut self.callbacks.on_progress {
                        f(progress);
                    }
                }
                Flow::Continue
            }
            BatchEvent::Processing => {
                if let Some(f) = &mut self.callbacks.on_status {
                    f(&payload);
                }
                Flow::Continue
            }
            BatchEvent::Unknown => {
                debug!("unrecognized batch payload: {}", payload);
                Flow::Continue
            }
        }
    }

    fn fail(&mut self, err: ClientError) {
        let message = err.to_string();
        if self.settlement.reject(err) {
            if let Some(f) = &mut self.callbacks.on_error {
                f(&message);
            }
        }
    }

    fn finish(self) -> Result<Option<Value>, ClientError> {
        self.settlement.into_outcome()
    }
}
