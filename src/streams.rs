//! Streaming endpoint call sites.
//!
//! Each module configures a stream session with its endpoint's event
//! vocabulary on top of the shared decode/parse/dispatch substrate.

pub mod batch;
pub mod extract;
pub mod graph;

// Re-export for convenience
pub use batch::BatchCallbacks;
pub use extract::ExtractCallbacks;
pub use graph::GraphCallbacks;
