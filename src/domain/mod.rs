//! Domain types for neutralfill.
//!
//! This module contains the core data structures:
//! - Document: paragraphs, runs and tables
//! - Matches: detector output and splice results
//! - Fill: per-document processing report

pub mod document;
pub mod fill;
pub mod matches;

// Re-export commonly used types
pub use document::{Cell, CellText, Color, Document, Paragraph, Row, RowBatch, Run, Table};
pub use fill::{
    DocumentReport, FillRecord, Location, ParagraphOutcome, PassState, PlannedFill, SkipReason,
    SkippedMatch,
};
pub use matches::{Match, MatchKind, ReplacementResult, ResolvedMatchSet, RunSpan};
