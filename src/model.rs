//! Wire models for the event-analysis backend.

use serde::{Deserialize, Serialize};

/// Standard JSON envelope wrapping the backend's plain responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,

    /// Endpoint-specific payload, absent on some error responses.
    #[serde(default)]
    pub data: Option<T>,

    /// Human-readable status message.
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of `POST /qa/query`.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionRequest {
    pub question: String,
}

/// Body of `POST /events/extract/stream`.
///
/// `user_ids: None` asks the backend to process every user that has not
/// been extracted yet.
#[derive(Debug, Clone, Serialize, Default)]
pub struct ExtractBatchRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_ids: Option<Vec<String>>,
}

impl ExtractBatchRequest {
    /// Request extraction for an explicit set of users.
    pub fn for_users<I, S>(user_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            user_ids: Some(user_ids.into_iter().map(Into::into).collect()),
        }
    }

    /// Request extraction for all pending users.
    pub fn all_pending() -> Self {
        Self::default()
    }
}

/// Body of `POST /causal-graph/generate/stream`.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateGraphRequest {
    /// High-frequency pattern ids to build from; `None` uses all patterns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern_ids: Option<Vec<i64>>,

    /// Analysis focus: `comprehensive`, `conversion`, `churn` or `profile`.
    pub analysis_focus: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph_name: Option<String>,
}

impl Default for GenerateGraphRequest {
    fn default() -> Self {
        Self {
            pattern_ids: None,
            analysis_focus: "comprehensive".to_string(),
            graph_name: None,
        }
    }
}

impl GenerateGraphRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict generation to specific pattern ids.
    pub fn with_patterns(mut self, pattern_ids: Vec<i64>) -> Self {
        self.pattern_ids = Some(pattern_ids);
        self
    }

    /// Set the analysis focus.
    pub fn with_focus(mut self, focus: impl Into<String>) -> Self {
        self.analysis_focus = focus.into();
        self
    }

    /// Name the generated graph.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.graph_name = Some(name.into());
        self
    }
}
