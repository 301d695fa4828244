//! In-memory document model: paragraphs made of independently formatted runs.
//!
//! A document owns its paragraphs (body and table cells). Each paragraph
//! owns an ordered list of runs; the flattened paragraph text is derived
//! from the runs and cached until a run is mutated.

use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// Hex RGB color (e.g. `FFFF00`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(String);

impl Color {
    pub const YELLOW: &'static str = "FFFF00";

    /// Create a color from a hex string, normalising case and a leading `#`
    pub fn new(hex: impl AsRef<str>) -> Self {
        Self(hex.as_ref().trim_start_matches('#').to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::new(Self::YELLOW)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A contiguous, independently formatted text fragment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Run {
    /// Visible text of the run
    pub text: String,

    /// Single underline formatting
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub underline: bool,

    /// Highlight (background) color
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<Color>,

    /// Remaining formatting attributes, carried through untouched
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl Run {
    /// Create a plain run
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Create an underlined run
    pub fn underlined(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            underline: true,
            ..Default::default()
        }
    }

    /// Copy of this run's formatting carrying different text
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..self.clone()
        }
    }

    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// An ordered sequence of runs with a cached flattened text
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Paragraph {
    runs: Vec<Run>,

    #[serde(skip)]
    flattened: OnceLock<String>,
}

impl PartialEq for Paragraph {
    fn eq(&self, other: &Self) -> bool {
        self.runs == other.runs
    }
}

impl Paragraph {
    /// Create a paragraph from runs
    pub fn new(runs: Vec<Run>) -> Self {
        Self {
            runs,
            flattened: OnceLock::new(),
        }
    }

    /// Convenience constructor from plain run texts
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(texts.into_iter().map(Run::new).collect())
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    /// Mutable access to runs; invalidates the cached flattened text.
    pub(crate) fn runs_mut(&mut self) -> &mut Vec<Run> {
        self.flattened = OnceLock::new();
        &mut self.runs
    }

    /// Flattened text (concatenation of all run texts)
    pub fn text(&self) -> &str {
        self.flattened
            .get_or_init(|| self.runs.iter().map(|r| r.text.as_str()).collect())
    }

    /// Flattened text length in characters
    pub fn char_len(&self) -> usize {
        self.text().chars().count()
    }

    pub fn is_blank(&self) -> bool {
        self.text().trim().is_empty()
    }
}

/// A table cell
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    #[serde(default)]
    pub paragraphs: Vec<Paragraph>,

    /// Continuation of a horizontally merged region (mirrors the cell to its left)
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub merged: bool,
}

impl Cell {
    pub fn new(paragraphs: Vec<Paragraph>) -> Self {
        Self {
            paragraphs,
            merged: false,
        }
    }

    /// Cell text, paragraphs joined by newlines
    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(Paragraph::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn is_blank(&self) -> bool {
        self.paragraphs.iter().all(Paragraph::is_blank)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    #[serde(default)]
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    #[serde(default)]
    pub rows: Vec<Row>,
}

/// One cell's text as handed to the per-row batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellText {
    pub column: usize,
    pub text: String,
}

/// Non-empty, de-duplicated cells of one table row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowBatch {
    pub row: usize,
    pub cells: Vec<CellText>,
}

impl Table {
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(|r| r.cells.len()).max().unwrap_or(0)
    }

    /// Group each row's non-empty cells for batched processing.
    ///
    /// Merged continuation cells are dropped so a merged region is handled
    /// once; rows with nothing left are skipped entirely.
    pub fn row_batches(&self) -> Vec<RowBatch> {
        self.rows
            .iter()
            .enumerate()
            .filter_map(|(row, r)| {
                let cells: Vec<CellText> = r
                    .cells
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| !c.merged && !c.is_blank())
                    .map(|(column, c)| CellText {
                        column,
                        text: c.text(),
                    })
                    .collect();
                (!cells.is_empty()).then_some(RowBatch { row, cells })
            })
            .collect()
    }
}

/// A complete document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub paragraphs: Vec<Paragraph>,

    #[serde(default)]
    pub tables: Vec<Table>,
}

impl Document {
    /// Total number of paragraphs including those inside table cells
    pub fn paragraph_count(&self) -> usize {
        self.paragraphs.len()
            + self
                .tables
                .iter()
                .flat_map(|t| &t.rows)
                .flat_map(|r| &r.cells)
                .map(|c| c.paragraphs.len())
                .sum::<usize>()
    }

    /// Plain text of the body, one line per paragraph
    pub fn plain_text(&self) -> String {
        self.paragraphs
            .iter()
            .map(Paragraph::text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
