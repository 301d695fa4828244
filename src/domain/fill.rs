//! Fill records and the per-document processing report.
//!
//! A `DocumentReport` represents a single pass of the pipeline over one
//! document: what was filled where, and what had to be skipped.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::matches::MatchKind;

/// Where a paragraph lives inside a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "in", rename_all = "snake_case")]
pub enum Location {
    /// Body paragraph by index
    Body { paragraph: usize },

    /// Paragraph inside a table cell
    Cell {
        table: usize,
        row: usize,
        column: usize,
        paragraph: usize,
    },
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Body { paragraph } => write!(f, "paragraph {}", paragraph),
            Location::Cell {
                table,
                row,
                column,
                paragraph,
            } => write!(
                f,
                "table {} row {} column {} paragraph {}",
                table, row, column, paragraph
            ),
        }
    }
}

/// One completed fill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillRecord {
    pub location: Location,
    pub kind: MatchKind,

    /// Span in the paragraph text as it was before any fill
    pub original_span: (usize, usize),

    /// Text that was replaced (empty for insertions)
    pub original_text: String,

    /// Bare label (without markers)
    pub label: String,

    /// Rendered text written into the paragraph
    pub replacement_text: String,

    /// The sentinel was used because no valid label was obtained
    pub fallback: bool,

    pub cross_run: bool,

    pub before: String,
    pub after: String,
}

/// A detection reported by a dry run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedFill {
    pub location: Location,
    pub kind: MatchKind,
    pub span: (usize, usize),
    pub original_text: String,
    pub before: String,
    pub after: String,

    /// Label known without a lookup (empty table cells)
    pub label: Option<String>,
}

/// Why a detected match did not end up spliced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Job cancelled while waiting for the label
    Cancelled,
    /// Splice rejected the match (index inconsistency)
    SpliceFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedMatch {
    pub location: Location,
    pub kind: MatchKind,
    pub span: (usize, usize),
    pub reason: SkipReason,
}

/// Final state of a document pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PassState {
    Running,
    Completed,
    Cancelled,
}

/// Outcome of processing one document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReport {
    pub id: Uuid,
    pub state: PassState,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,

    /// Paragraphs that went through detection
    pub paragraphs_scanned: usize,

    pub fills: Vec<FillRecord>,
    pub skipped: Vec<SkippedMatch>,
}

impl Default for DocumentReport {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentReport {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: PassState::Running,
            started_at: Utc::now(),
            completed_at: None,
            paragraphs_scanned: 0,
            fills: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Number of fills that fell back to the sentinel
    pub fn fallback_count(&self) -> usize {
        self.fills.iter().filter(|f| f.fallback).count()
    }

    /// Fold one paragraph's outcome into the report
    pub fn absorb(&mut self, outcome: ParagraphOutcome) {
        self.paragraphs_scanned += 1;
        self.fills.extend(outcome.fills);
        self.skipped.extend(outcome.skipped);
    }

    /// Mark the pass finished and sort records into document order
    pub fn finish(&mut self, cancelled: bool) {
        self.fills
            .sort_by(|a, b| (a.location, a.original_span).cmp(&(b.location, b.original_span)));
        self.skipped
            .sort_by(|a, b| (a.location, a.span).cmp(&(b.location, b.span)));
        self.state = if cancelled {
            PassState::Cancelled
        } else {
            PassState::Completed
        };
        self.completed_at = Some(Utc::now());
    }
}

/// Result of processing a single paragraph
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParagraphOutcome {
    pub fills: Vec<FillRecord>,
    pub skipped: Vec<SkippedMatch>,
}
