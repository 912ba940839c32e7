//! Event dispatch machinery shared by the stream call sites.
//!
//! Each streaming endpoint speaks its own event vocabulary, so each call
//! site implements [`Dispatch`] with its own classification and callback
//! set. The session read loop is generic over the dispatcher and knows
//! nothing about any particular schema.
//!
//! Sessions that model a single eventual result have two completion
//! channels: a repeatable notify channel (the callbacks) and a one-shot
//! settle channel (the returned payload). Both are guarded by the same
//! [`Settlement`] latch, so only the first terminal event has effect.

use serde_json::Value;

use crate::client::ClientError;

/// Callback receiving a borrowed text field (progress messages, chunks).
pub type MessageCallback = Box<dyn FnMut(&str) + Send>;

/// Callback receiving a borrowed JSON payload.
pub type PayloadCallback = Box<dyn FnMut(&Value) + Send>;

/// Whether the read loop should keep going after a dispatched payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Finished,
}

/// Routes parsed payloads to caller callbacks for one session.
pub trait Dispatch: Send {
    /// Classify one payload and invoke the matching callback, if any is
    /// registered. Returns [`Flow::Finished`] on a terminal event.
    fn dispatch(&mut self, payload: Value) -> Flow;

    /// Record a terminal transport failure (request failure, non-success
    /// status, read error). Guarded by the settlement latch.
    fn fail(&mut self, err: ClientError);

    /// Consume the dispatcher when the session ends, yielding the final
    /// outcome: `Ok(Some(_))` for a settled result, `Ok(None)` for a
    /// benign close or a notify-only stream.
    fn finish(self) -> Result<Option<Value>, ClientError>;
}

/// One-shot terminal latch for a session.
///
/// Transitions are monotonic: once settled, later resolutions, rejections
/// and cancellations are ignored.
#[derive(Debug, Default)]
pub struct Settlement {
    settled: bool,
    outcome: Option<Result<Value, ClientError>>,
}

impl Settlement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Settle with a success payload. Returns whether this call settled.
    pub fn resolve(&mut self, payload: Value) -> bool {
        if self.settled {
            return false;
        }
        self.settled = true;
        self.outcome = Some(Ok(payload));
        true
    }

    /// Settle with a failure. Returns whether this call settled.
    pub fn reject(&mut self, err: ClientError) -> bool {
        if self.settled {
            return false;
        }
        self.settled = true;
        self.outcome = Some(Err(err));
        true
    }

    /// Latch without an outcome; used on caller-initiated cancellation so
    /// that a racing terminal frame can no longer fire.
    pub fn cancel(&mut self) {
        self.settled = true;
    }

    /// Final outcome of the session.
    pub fn into_outcome(self) -> Result<Option<Value>, ClientError> {
        match self.outcome {
            Some(Ok(payload)) => Ok(Some(payload)),
            Some(Err(err)) => Err(err),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_settlement_resolves_once() {
        let mut settlement = Settlement::new();
        assert!(settlement.resolve(json!({"n": 1})));
        assert!(!settlement.resolve(json!({"n": 2})));
        assert!(!settlement.reject(ClientError::Protocol("late".to_string())));

        assert_eq!(settlement.into_outcome().unwrap(), Some(json!({"n": 1})));
    }

    #[test]
    fn test_settlement_rejects_once() {
        let mut settlement = Settlement::new();
        assert!(settlement.reject(ClientError::Protocol("boom".to_string())));
        assert!(!settlement.resolve(json!({})));

        assert!(settlement.into_outcome().is_err());
    }

    #[test]
    fn test_settlement_unsettled_is_benign() {
        let settlement = Settlement::new();
        assert_eq!(settlement.into_outcome().unwrap(), None);
    }

    #[test]
    fn test_settlement_cancel_latches() {
        let mut settlement = Settlement::new();
        settlement.cancel();
        assert!(settlement.is_settled());
        assert!(!settlement.resolve(json!({})));
        assert_eq!(settlement.into_outcome().unwrap(), None);
    }
}
