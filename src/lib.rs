//! neutralfill - Neutral labels for fill-in blanks
//!
//! Finds the blanks in a formatted document (underscore runs, underlined
//! whitespace, empty `Field:` slots, repeated filler characters) and
//! rewrites each one as a `{{label}}` without disturbing the formatting
//! of the surrounding runs.
//!
//! # Architecture
//!
//! A paragraph is a sequence of runs. Detection works on the flattened
//! text, and every edit is mapped back to run-local offsets:
//! - Detectors propose candidate matches independently
//! - The resolver keeps a conflict-free, ordered subset
//! - Labels are requested with the surrounding context
//! - The splice engine rewrites runs in ascending order
//!
//! # Modules
//!
//! - `adapters`: Label suggesters (chat service, heuristic) and storage
//! - `core`: Run index, detectors, resolver, splice engine, pipeline
//! - `domain`: Documents, matches, fill records
//! - `config`: Config file discovery and environment overrides
//! - `report`: Markdown fill report
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Fill a document, writing form_filled.json and form_filled.json.md
//! neutralfill fill form.json
//!
//! # Preview detections
//! neutralfill detect form.json
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod report;

// Re-export main types at crate root for convenience
pub use adapters::{HeuristicSuggester, JsonStore, LabelRequest, LabelSuggester};
pub use config::ResolvedConfig;
pub use core::{DetectionConfig, DetectionPipeline, LabelFormat, PipelineSettings};
pub use domain::{Document, DocumentReport, Match, MatchKind, Paragraph, Run};
