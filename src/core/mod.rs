//! Core detection and rewrite logic.
//!
//! This module contains:
//! - RunIndex: flattened text to run/offset mapping
//! - Detectors: independent placeholder matchers
//! - MatchResolver: conflict resolution between candidates
//! - ContextWindow: before/after text for label lookups
//! - SpliceEngine: position-preserving run rewrites
//! - DetectionPipeline: per-paragraph and per-document orchestration

pub mod context;
pub mod detectors;
pub mod label;
pub mod pipeline;
pub mod resolver;
pub mod run_index;
pub mod splice;
pub mod tables;

// Re-export commonly used types
pub use context::{Context, ContextWindow};
pub use detectors::{
    CustomPattern, DetectionConfig, DetectionError, Detector, DetectorName, DetectorSet,
    FillerAlphabet, ParagraphView, Priorities, Slot,
};
pub use label::LabelFormat;
pub use pipeline::{DetectionPipeline, PipelineSettings};
pub use resolver::MatchResolver;
pub use run_index::{RunIndex, RunIndexError};
pub use splice::{SpliceEngine, SpliceError};
pub use tables::{EmptyCellTarget, TableConfig};
