//! Adapter interfaces for external systems.
//!
//! Adapters provide a unified interface for the collaborators the
//! pipeline talks to: the label suggestion service and document storage.

pub mod chat;
pub mod heuristic;
pub mod store;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use chat::{ChatConfig, ChatSuggester};
pub use heuristic::HeuristicSuggester;
pub use store::{JsonStore, StoreError};

/// Context handed to a suggester for one fill position
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelRequest {
    /// Text before the position (trimmed, bounded)
    pub before: String,

    /// Text after the position (trimmed, bounded)
    pub after: String,

    /// The full line the position sits on
    pub line: String,
}

/// A suggester could not produce a label.
///
/// Never fatal: the pipeline substitutes the sentinel label.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelLookupFailure {
    #[error("Label lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("Label service error: {0}")]
    Service(String),

    #[error("Unusable label service response: {0}")]
    InvalidResponse(String),

    #[error("No field name found in context")]
    NoSuggestion,
}

/// Trait for label suggestion services
#[async_trait]
pub trait LabelSuggester: Send + Sync {
    /// Human-readable suggester name
    fn name(&self) -> &str;

    /// Suggest a bare label (no markers) for the position described by `request`
    async fn suggest(&self, request: &LabelRequest) -> Result<String, LabelLookupFailure>;
}
