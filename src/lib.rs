//! # evograph - Event-Analysis Backend Client
//!
//! A small, pragmatic Rust client for a user-behavior event-analysis
//! service: streaming event extraction, streaming causal-graph generation,
//! and the service's plain JSON endpoints.
//!
//! ## Features
//! - Async-first, tokio compatible
//! - Incremental line-delimited event-stream ingestion over chunked HTTP
//! - Per-endpoint event vocabularies over one shared decode/parse/dispatch
//!   substrate
//! - Exactly-once settlement for single-result streams, cancellation
//!   handles for long-running ones
//!
//! ## Architecture
//!
//! Transport bytes flow through a fixed pipeline:
//!
//! ```text
//! chunks → Utf8Decoder → LineBuffer → Frame parser → dispatcher → callbacks
//! ```
//!
//! Each streaming endpoint ([`streams::extract`], [`streams::batch`],
//! [`streams::graph`]) plugs its own event vocabulary into the pipeline;
//! the session loop in [`session`] is schema-agnostic.
//!
//! ## Example
//! ```no_run
//! use evograph::client::ApiClient;
//! use evograph::model::GenerateGraphRequest;
//! use evograph::options::ServiceOptions;
//! use evograph::streams::GraphCallbacks;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ApiClient::new(ServiceOptions::new("http://localhost:8000/api/v1"))?;
//!
//!     let callbacks = GraphCallbacks::new()
//!         .on_progress(|msg| println!("[progress] {}", msg))
//!         .on_content(|chunk| print!("{}", chunk));
//!
//!     let request = GenerateGraphRequest::new().with_focus("churn");
//!     let result = client.generate_causal_graph(request, callbacks).await?;
//!
//!     if let Some(payload) = result {
//!         println!("graph stored: {}", payload["data"]["graph_id"]);
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod decode;
pub mod dispatch;
pub mod http;
pub mod model;
pub mod options;
pub mod session;
pub mod sse;
pub mod streams;

// Re-exports for convenience
pub use client::{ApiClient, ClientError};
pub use model::{ApiEnvelope, ExtractBatchRequest, GenerateGraphRequest};
pub use options::ServiceOptions;
pub use session::SessionHandle;
pub use streams::{BatchCallbacks, ExtractCallbacks, GraphCallbacks};
