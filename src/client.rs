//! Client entry points and error types.

use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::http::{add_extra_headers, build_http_client};
use crate::model::{ApiEnvelope, ExtractBatchRequest, GenerateGraphRequest, QuestionRequest};
use crate::options::ServiceOptions;
use crate::session::{drive, spawn_session, HttpSource, SessionHandle};
use crate::streams::batch::BatchDispatcher;
use crate::streams::extract::ExtractDispatcher;
use crate::streams::graph::GraphDispatcher;
use crate::streams::{BatchCallbacks, ExtractCallbacks, GraphCallbacks};

/// Errors that can occur during client operations.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("server returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("stream error: {0}")]
    Protocol(String),

    #[error("stream cancelled")]
    StreamCancelled,

    #[error("configuration error: {0}")]
    Config(String),
}

/// FastAPI-style error body.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

/// Build a status error, preferring the server-supplied error text.
fn status_error(status: StatusCode, body: &str) -> ClientError {
    let message = match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.detail,
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => format!("request failed with status {}", status),
    };

    ClientError::Status {
        status: status.as_u16(),
        message,
    }
}

/// Send a streaming request and hand the body over as a byte source.
///
/// A non-success status fails the exchange here, before any read loop
/// starts.
pub(crate) async fn send_stream(request: RequestBuilder) -> Result<HttpSource, ClientError> {
    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(status_error(status, &body));
    }

    Ok(HttpSource::new(response))
}

async fn json_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(status_error(status, &body));
    }

    Ok(response.json().await?)
}

/// Client for the event-analysis backend.
///
/// One instance serves any number of concurrent calls; streaming sessions
/// run fully independently of each other.
///
/// # Example
/// ```no_run
/// use evograph::client::ApiClient;
/// use evograph::options::ServiceOptions;
/// use evograph::streams::ExtractCallbacks;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = ApiClient::new(ServiceOptions::default())?;
///
///     let callbacks = ExtractCallbacks::new()
///         .on_progress(|msg| println!("progress: {}", msg))
///         .on_llm_chunk(|chunk| print!("{}", chunk));
///
///     let result = client.extract_user_events("user-42", callbacks).await?;
///     println!("{:?}", result);
///     Ok(())
/// }
/// ```
pub struct ApiClient {
    http: reqwest::Client,
    options: ServiceOptions,
}

impl ApiClient {
    /// Create a client with the given options.
    pub fn new(options: ServiceOptions) -> Result<Self, ClientError> {
        if options.base_url.trim().is_empty() {
            return Err(ClientError::Config("base URL must not be empty".to_string()));
        }

        let http = build_http_client(&options)?;
        Ok(Self { http, options })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.options.base_url.trim_end_matches('/'), path)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        add_extra_headers(self.http.post(self.url(path)), &self.options)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        add_extra_headers(self.http.get(self.url(path)), &self.options)
    }

    fn delete(&self, path: &str) -> RequestBuilder {
        add_extra_headers(self.http.delete(self.url(path)), &self.options)
    }

    // --- Streaming endpoints ---

    /// Stream event extraction for a single user.
    ///
    /// Progress and LLM output are delivered through `callbacks` as they
    /// arrive; the future resolves with the final `done` payload, or
    /// `None` if the server closed the stream without one. Dropping the
    /// future tears the session down.
    pub async fn extract_user_events(
        &self,
        user_id: &str,
        callbacks: ExtractCallbacks,
    ) -> Result<Option<Value>, ClientError> {
        let request = self.post(&format!("/events/extract/{}/stream", user_id));
        drive(send_stream(request), ExtractDispatcher::new(callbacks), None).await
    }

    /// Stream batch event extraction.
    ///
    /// The session runs as a background task; the returned handle is the
    /// sole way to cancel it. Must be called from within a tokio runtime.
    pub fn extract_events_batch(
        &self,
        request: ExtractBatchRequest,
        callbacks: BatchCallbacks,
    ) -> SessionHandle {
        let request = self.post("/events/extract/stream").json(&request);
        spawn_session(send_stream(request), BatchDispatcher::new(callbacks))
    }

    /// Stream causal-graph generation.
    ///
    /// Resolves with the `result` payload carrying the stored graph, or
    /// `None` if the server closed the stream without producing one.
    pub async fn generate_causal_graph(
        &self,
        request: GenerateGraphRequest,
        callbacks: GraphCallbacks,
    ) -> Result<Option<Value>, ClientError> {
        let request = self.post("/causal-graph/generate/stream").json(&request);
        drive(send_stream(request), GraphDispatcher::new(callbacks), None).await
    }

    // --- Plain endpoints ---

    /// Current data-load status.
    pub async fn data_status(&self) -> Result<ApiEnvelope<Value>, ClientError> {
        json_response(self.get("/data/status").send().await?).await
    }

    /// Kick off a knowledge-graph build, optionally capped to a number of
    /// users.
    pub async fn build_knowledge_graph(
        &self,
        user_count: Option<u32>,
    ) -> Result<ApiEnvelope<Value>, ClientError> {
        let mut request = self.post("/graphs/knowledge/build");
        if let Some(count) = user_count {
            request = request.query(&[("user_count", count)]);
        }
        json_response(request.send().await?).await
    }

    /// Ask the Q&A engine a free-form question.
    pub async fn ask_question(&self, question: &str) -> Result<ApiEnvelope<Value>, ClientError> {
        let body = QuestionRequest {
            question: question.to_string(),
        };
        json_response(self.post("/qa/query").json(&body).send().await?).await
    }

    /// List generated causal graphs, paginated.
    pub async fn list_causal_graphs(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<ApiEnvelope<Value>, ClientError> {
        let request = self
            .get("/causal-graph/list")
            .query(&[("limit", limit), ("offset", offset)]);
        json_response(request.send().await?).await
    }

    /// Fetch one causal graph with its nodes, edges and insights.
    pub async fn get_causal_graph(&self, graph_id: i64) -> Result<ApiEnvelope<Value>, ClientError> {
        json_response(
            self.get(&format!("/causal-graph/{}", graph_id))
                .send()
                .await?,
        )
        .await
    }

    /// Delete a causal graph and its associated data.
    pub async fn delete_causal_graph(
        &self,
        graph_id: i64,
    ) -> Result<ApiEnvelope<Value>, ClientError> {
        json_response(
            self.delete(&format!("/causal-graph/{}", graph_id))
                .send()
                .await?,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_prefers_server_detail() {
        let err = status_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "{\"detail\": \"extraction failed: no data loaded\"}",
        );
        match err {
            ClientError::Status { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "extraction failed: no data loaded");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_status_error_falls_back_to_raw_body() {
        let err = status_error(StatusCode::BAD_GATEWAY, "upstream unavailable");
        match err {
            ClientError::Status { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "upstream unavailable");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_status_error_generic_message_for_empty_body() {
        let err = status_error(StatusCode::NOT_FOUND, "");
        match err {
            ClientError::Status { status, message } => {
                assert_eq!(status, 404);
                assert!(message.contains("404"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let client = ApiClient::new(ServiceOptions::new("http://localhost:8000/api/v1/")).unwrap();
        assert_eq!(
            client.url("/data/status"),
            "http://localhost:8000/api/v1/data/status"
        );
    }

    #[test]
    fn test_empty_base_url_is_rejected() {
        assert!(matches!(
            ApiClient::new(ServiceOptions::new("")),
            Err(ClientError::Config(_))
        ));
    }
}
