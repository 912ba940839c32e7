//! Frame parsing for the backend's event-stream wire format.
//!
//! The backend emits newline-separated lines; lines of interest carry one
//! JSON object each behind a `data:` prefix:
//!
//! ```text
//! data: {"type": "progress", "message": "..."}
//!
//! data: {"type": "done"}
//! ```
//!
//! The prefix is written both as `data: ` and as `data:` depending on the
//! endpoint; both forms are accepted. Anything else on the stream
//! (blank keep-alive lines, comments) is padding and is skipped silently.

use serde_json::Value;
use tracing::warn;

/// One parsed protocol unit extracted from a single `data:` line.
#[derive(Debug, Clone)]
pub struct Frame {
    /// The line as received, without the trailing newline.
    pub raw: String,
    /// The decoded JSON payload.
    pub payload: Value,
}

impl Frame {
    /// Parse a line into a frame.
    ///
    /// Returns `None` both for padding (no `data:` prefix) and for frames
    /// whose payload fails to parse; a malformed payload is logged and
    /// skipped so that one bad line never aborts a healthy stream.
    pub fn parse(line: &str) -> Option<Frame> {
        let data = parse_data_line(line)?;

        match serde_json::from_str(data) {
            Ok(payload) => Some(Frame {
                raw: line.to_string(),
                payload,
            }),
            Err(err) => {
                warn!("skipping malformed frame: {} | line: {}", err, line);
                None
            }
        }
    }
}

/// Extract the data portion of a `data:`-prefixed line.
///
/// An optional space after the prefix is stripped.
///
/// # Example
/// ```
/// use evograph::sse::parse_data_line;
///
/// assert_eq!(parse_data_line("data: {\"a\":1}"), Some("{\"a\":1}"));
/// assert_eq!(parse_data_line("data:{\"a\":1}"), Some("{\"a\":1}"));
/// assert_eq!(parse_data_line(": keep-alive"), None);
/// ```
pub fn parse_data_line(line: &str) -> Option<&str> {
    line.trim().strip_prefix("data:").map(|s| s.trim_start())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_data_line() {
        assert_eq!(parse_data_line("data: hello"), Some("hello"));
        assert_eq!(
            parse_data_line("data: {\"key\": \"value\"}"),
            Some("{\"key\": \"value\"}")
        );
        assert_eq!(parse_data_line("data:{\"key\": 1}"), Some("{\"key\": 1}"));
        assert_eq!(parse_data_line("data:   spaces"), Some("spaces"));
        assert_eq!(parse_data_line(""), None);
        assert_eq!(parse_data_line(": comment"), None);
        assert_eq!(parse_data_line("event: progress"), None);
    }

    #[test]
    fn test_frame_parse_well_formed() {
        let frame = Frame::parse("data: {\"type\":\"start\",\"message\":\"go\"}").unwrap();
        assert_eq!(frame.payload, json!({"type": "start", "message": "go"}));
        assert_eq!(frame.raw, "data: {\"type\":\"start\",\"message\":\"go\"}");
    }

    #[test]
    fn test_frame_parse_without_prefix_space() {
        let frame = Frame::parse("data:{\"type\":\"done\"}").unwrap();
        assert_eq!(frame.payload, json!({"type": "done"}));
    }

    #[test]
    fn test_frame_parse_malformed_is_skipped() {
        assert!(Frame::parse("data: {not json").is_none());
    }

    #[test]
    fn test_frame_parse_padding_is_skipped() {
        assert!(Frame::parse("").is_none());
        assert!(Frame::parse(": ping").is_none());
        assert!(Frame::parse("retry: 3000").is_none());
    }
}
