//! Offset table between a paragraph's flattened text and its runs.
//!
//! Built fresh for each detection pass and after every splice; never
//! persisted. Offsets are character offsets.

use thiserror::Error;

use crate::domain::{Run, RunSpan};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunIndexError {
    #[error("Offset {offset} is beyond text length {len}")]
    OutOfRange { offset: usize, len: usize },

    #[error("Paragraph has no runs")]
    NoRuns,
}

/// Flattened text plus per-run `[start, end)` character boundaries
#[derive(Debug, Clone)]
pub struct RunIndex {
    text: String,
    bounds: Vec<(usize, usize)>,
    char_len: usize,
}

impl RunIndex {
    /// Build the index over an ordered run sequence
    pub fn build(runs: &[Run]) -> Self {
        let mut text = String::new();
        let mut bounds = Vec::with_capacity(runs.len());
        let mut pos = 0;

        for run in runs {
            let len = run.char_len();
            bounds.push((pos, pos + len));
            text.push_str(&run.text);
            pos += len;
        }

        Self {
            text,
            bounds,
            char_len: pos,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Flattened length in characters
    pub fn char_len(&self) -> usize {
        self.char_len
    }

    pub fn run_count(&self) -> usize {
        self.bounds.len()
    }

    /// `[start, end)` of a run in flattened offsets
    pub fn bounds(&self, run_id: usize) -> Option<(usize, usize)> {
        self.bounds.get(run_id).copied()
    }

    /// Run containing `offset`, skipping empty runs.
    ///
    /// `offset == len` resolves to the last non-empty run (or the last run
    /// when every run is empty).
    pub fn find_run(&self, offset: usize) -> Result<usize, RunIndexError> {
        if offset > self.char_len {
            return Err(RunIndexError::OutOfRange {
                offset,
                len: self.char_len,
            });
        }
        if self.bounds.is_empty() {
            return Err(RunIndexError::NoRuns);
        }

        if offset == self.char_len {
            return Ok(self
                .bounds
                .iter()
                .rposition(|&(s, e)| e > s)
                .unwrap_or(self.bounds.len() - 1));
        }

        // Paragraphs are short; linear scan is fine.
        self.bounds
            .iter()
            .position(|&(s, e)| s <= offset && offset < e)
            .ok_or(RunIndexError::OutOfRange {
                offset,
                len: self.char_len,
            })
    }

    /// Per-run pieces covering `[start, end)`; empty runs are left out.
    pub fn spans(&self, start: usize, end: usize) -> Result<Vec<RunSpan>, RunIndexError> {
        if end > self.char_len || start > end {
            return Err(RunIndexError::OutOfRange {
                offset: end.max(start),
                len: self.char_len,
            });
        }

        Ok(self
            .bounds
            .iter()
            .enumerate()
            .filter(|&(_, &(s, e))| e > s && s < end && start < e)
            .map(|(run_id, &(s, e))| RunSpan {
                run_id,
                start_in_run: start.max(s) - s,
                end_in_run: end.min(e) - s,
            })
            .collect())
    }

    /// Byte offset in the flattened text for a character offset
    pub fn byte_offset(&self, char_offset: usize) -> usize {
        byte_offset(&self.text, char_offset)
    }

    /// Substring by character offsets, clamped to the text
    pub fn slice(&self, start: usize, end: usize) -> &str {
        slice_chars(&self.text, start, end)
    }
}

/// Byte offset of the `char_offset`-th character (clamped to the end)
pub fn byte_offset(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map(|(b, _)| b)
        .unwrap_or(text.len())
}

/// Character offset of a byte offset that lies on a char boundary
pub fn char_offset(text: &str, byte_offset: usize) -> usize {
    text[..byte_offset].chars().count()
}

/// Substring by character offsets, clamped to the text
pub fn slice_chars(text: &str, start: usize, end: usize) -> &str {
    let end = end.max(start);
    let b_start = byte_offset(text, start);
    let b_end = byte_offset(text, end);
    &text[b_start..b_end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runs(texts: &[&str]) -> Vec<Run> {
        texts.iter().map(|t| Run::new(*t)).collect()
    }

    #[test]
    fn test_build_boundaries() {
        let index = RunIndex::build(&runs(&["姓名", "：", "____"]));
        assert_eq!(index.text(), "姓名：____");
        assert_eq!(index.char_len(), 7);
        assert_eq!(index.bounds(0), Some((0, 2)));
        assert_eq!(index.bounds(1), Some((2, 3)));
        assert_eq!(index.bounds(2), Some((3, 7)));
    }

    #[test]
    fn test_find_run_skips_empty_runs() {
        let index = RunIndex::build(&runs(&["ab", "", "cd", ""]));
        assert_eq!(index.find_run(0), Ok(0));
        assert_eq!(index.find_run(1), Ok(0));
        assert_eq!(index.find_run(2), Ok(2));
        assert_eq!(index.find_run(3), Ok(2));
        // End of text resolves to the last non-empty run
        assert_eq!(index.find_run(4), Ok(2));
    }

    #[test]
    fn test_find_run_all_empty() {
        let index = RunIndex::build(&runs(&["", ""]));
        assert_eq!(index.find_run(0), Ok(1));
    }

    #[test]
    fn test_find_run_out_of_range() {
        let index = RunIndex::build(&runs(&["abc"]));
        assert_eq!(
            index.find_run(4),
            Err(RunIndexError::OutOfRange { offset: 4, len: 3 })
        );
        let empty = RunIndex::build(&[]);
        assert_eq!(empty.find_run(0), Err(RunIndexError::NoRuns));
    }

    #[test]
    fn test_spans_cross_runs() {
        let index = RunIndex::build(&runs(&["ab", "", "cde", "f"]));
        let spans = index.spans(1, 5).unwrap();
        assert_eq!(
            spans,
            vec![
                RunSpan {
                    run_id: 0,
                    start_in_run: 1,
                    end_in_run: 2
                },
                RunSpan {
                    run_id: 2,
                    start_in_run: 0,
                    end_in_run: 3
                },
            ]
        );
        assert!(index.spans(2, 9).is_err());
    }

    #[test]
    fn test_char_byte_conversion() {
        let text = "电话：abc";
        assert_eq!(byte_offset(text, 3), 9);
        assert_eq!(char_offset(text, 9), 3);
        assert_eq!(byte_offset(text, 100), text.len());
        assert_eq!(slice_chars(text, 1, 4), "话：a");
        assert_eq!(slice_chars(text, 5, 50), "c");
    }
}
