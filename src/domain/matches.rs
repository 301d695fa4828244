//! Match values produced by detectors and consumed by the resolver and
//! splice engine.
//!
//! All offsets are character offsets into a paragraph's flattened text,
//! end-exclusive. A zero-length match is an insertion point.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What kind of blank a match represents
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Underlined whitespace inside underline-formatted runs
    Underline,
    /// A run of filler characters (`____`, `xxx`)
    RepeatedCharacter,
    /// `label:` with nothing after it
    ColonField,
    /// `label: content`, insertion right after the colon
    ColonFieldWithContent,
    /// User-configured named pattern
    Custom(String),
    /// Empty table cell below a header
    EmptyCell,
}

impl MatchKind {
    pub fn as_str(&self) -> &str {
        match self {
            MatchKind::Underline => "underline",
            MatchKind::RepeatedCharacter => "repeated_character",
            MatchKind::ColonField => "colon_field",
            MatchKind::ColonFieldWithContent => "colon_field_with_content",
            MatchKind::Custom(name) => name,
            MatchKind::EmptyCell => "empty_cell",
        }
    }
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate fill position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub kind: MatchKind,

    /// Start offset (chars, inclusive)
    pub start: usize,

    /// End offset (chars, exclusive); equals `start` for insertion points
    pub end: usize,

    /// Higher wins on conflict
    pub priority: i32,

    /// Registration index of the emitting detector; lower wins a priority tie
    pub detector: usize,
}

impl Match {
    pub fn new(kind: MatchKind, start: usize, end: usize, priority: i32, detector: usize) -> Self {
        Self {
            kind,
            start,
            end,
            priority,
            detector,
        }
    }

    /// Zero-length insertion point
    pub fn insertion(kind: MatchKind, at: usize, priority: i32, detector: usize) -> Self {
        Self::new(kind, at, at, priority, detector)
    }

    pub fn is_insertion(&self) -> bool {
        self.start == self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether two matches compete for the same text positions.
    ///
    /// Insertions only conflict with a replacement that starts at, or
    /// strictly contains, the insertion offset.
    pub fn conflicts_with(&self, other: &Match) -> bool {
        match (self.is_insertion(), other.is_insertion()) {
            (true, true) => self.start == other.start,
            (true, false) => other.start <= self.start && self.start < other.end,
            (false, true) => self.start <= other.start && other.start < self.end,
            (false, false) => self.start < other.end && other.start < self.end,
        }
    }

    /// True when `self` beats `other` under priority then registration order
    pub fn outranks(&self, other: &Match) -> bool {
        (self.priority, std::cmp::Reverse(self.detector))
            > (other.priority, std::cmp::Reverse(other.detector))
    }

    /// Same match moved by `delta` characters
    pub fn shifted(&self, delta: isize) -> Option<Match> {
        let start = self.start.checked_add_signed(delta)?;
        let end = self.end.checked_add_signed(delta)?;
        Some(Match {
            start,
            end,
            ..self.clone()
        })
    }
}

/// Ordered, non-overlapping matches sorted by start offset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedMatchSet {
    matches: Vec<Match>,
}

impl ResolvedMatchSet {
    /// Wrap matches that are already sorted and conflict-free.
    pub(crate) fn from_sorted(matches: Vec<Match>) -> Self {
        debug_assert!(matches
            .windows(2)
            .all(|w| w[0].end <= w[1].start && !w[0].conflicts_with(&w[1])));
        Self { matches }
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Match> {
        self.matches.iter()
    }

    pub fn as_slice(&self) -> &[Match] {
        &self.matches
    }

    pub fn into_vec(self) -> Vec<Match> {
        self.matches
    }
}

impl IntoIterator for ResolvedMatchSet {
    type Item = Match;
    type IntoIter = std::vec::IntoIter<Match>;

    fn into_iter(self) -> Self::IntoIter {
        self.matches.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResolvedMatchSet {
    type Item = &'a Match;
    type IntoIter = std::slice::Iter<'a, Match>;

    fn into_iter(self) -> Self::IntoIter {
        self.matches.iter()
    }
}

/// A view of part of one run; never owns text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSpan {
    pub run_id: usize,
    pub start_in_run: usize,
    pub end_in_run: usize,
}

/// What a single splice did, for reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementResult {
    pub original_span: (usize, usize),
    pub replacement_text: String,
    pub cross_run: bool,
}
