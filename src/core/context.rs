//! Bounded before/after context around a match, fed to the label suggester.

use super::run_index::slice_chars;
use crate::domain::Match;

/// Text on either side of a fill position
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    pub before: String,
    pub after: String,
}

#[derive(Debug, Clone, Copy)]
pub struct ContextWindow {
    size: usize,
}

impl Default for ContextWindow {
    fn default() -> Self {
        Self::new(100)
    }
}

impl ContextWindow {
    pub fn new(size: usize) -> Self {
        Self { size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Up to `size` characters before `m.start` and after `m.end`, trimmed.
    ///
    /// Never fails: spans past the end of the text are clamped.
    pub fn extract(&self, text: &str, m: &Match) -> Context {
        let len = text.chars().count();
        let start = m.start.min(len);
        let end = m.end.clamp(start, len);

        let before = slice_chars(text, start.saturating_sub(self.size), start);
        let after = slice_chars(text, end, end.saturating_add(self.size).min(len));

        Context {
            before: before.trim().to_string(),
            after: after.trim().to_string(),
        }
    }
}
