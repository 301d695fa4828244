//! Position-preserving rewrite of a paragraph's runs.
//!
//! Every splice validates the match against a freshly built `RunIndex`
//! before touching any run, so a rejected splice leaves the paragraph
//! exactly as it was. Runs emptied by a cross-run replacement are kept
//! (as empty runs) rather than removed.

use thiserror::Error;
use tracing::debug;

use super::run_index::{byte_offset, RunIndex, RunIndexError};
use crate::domain::{Color, Match, Paragraph, ReplacementResult, Run};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpliceError {
    #[error("Span {start}..{end} is outside paragraph text of length {len}")]
    OutOfRange { start: usize, end: usize, len: usize },

    #[error("Span {start}..{end} is inverted")]
    Inverted { start: usize, end: usize },

    #[error("No run covers span {start}..{end}")]
    Uncovered { start: usize, end: usize },

    #[error("Run index inconsistency: {0}")]
    Index(#[from] RunIndexError),
}

#[derive(Debug, Clone, Default)]
pub struct SpliceEngine {
    highlight: Color,
}

fn split_chars(text: &str, at: usize) -> (&str, &str) {
    text.split_at(byte_offset(text, at))
}

impl SpliceEngine {
    pub fn new(highlight: Color) -> Self {
        Self { highlight }
    }

    pub fn highlight_color(&self) -> &Color {
        &self.highlight
    }

    /// Replace `m`'s span (or insert at it) with `replacement`.
    pub fn splice(
        &self,
        paragraph: &mut Paragraph,
        m: &Match,
        replacement: &str,
        highlight: bool,
    ) -> Result<ReplacementResult, SpliceError> {
        let index = RunIndex::build(paragraph.runs());
        let len = index.char_len();

        if m.start > m.end {
            return Err(SpliceError::Inverted {
                start: m.start,
                end: m.end,
            });
        }
        if m.end > len {
            return Err(SpliceError::OutOfRange {
                start: m.start,
                end: m.end,
                len,
            });
        }

        if m.is_insertion() {
            return self.insert(paragraph, &index, m.start, replacement, highlight);
        }

        let spans = index.spans(m.start, m.end)?;
        let (Some(first), Some(last)) = (spans.first().copied(), spans.last().copied()) else {
            return Err(SpliceError::Uncovered {
                start: m.start,
                end: m.end,
            });
        };
        if last.run_id >= paragraph.runs().len() {
            return Err(RunIndexError::OutOfRange {
                offset: last.run_id,
                len: paragraph.runs().len(),
            }
            .into());
        }

        let runs = paragraph.runs_mut();
        let cross_run = first.run_id != last.run_id;

        if !cross_run {
            let run = &mut runs[first.run_id];
            let b_start = byte_offset(&run.text, first.start_in_run);
            let b_end = byte_offset(&run.text, first.end_in_run);
            run.text.replace_range(b_start..b_end, replacement);
            if highlight {
                run.highlight = Some(self.highlight.clone());
            }
        } else {
            let (prefix, _) = split_chars(&runs[first.run_id].text, first.start_in_run);
            let head = format!("{}{}", prefix, replacement);
            let (_, suffix) = split_chars(&runs[last.run_id].text, last.end_in_run);
            let tail = suffix.to_string();

            runs[first.run_id].text = head;
            for run in &mut runs[first.run_id + 1..last.run_id] {
                run.text.clear();
            }
            runs[last.run_id].text = tail;

            if highlight && !replacement.is_empty() {
                runs[first.run_id].highlight = Some(self.highlight.clone());
            }
        }

        debug!(
            start = m.start,
            end = m.end,
            cross_run,
            first_run = first.run_id,
            last_run = last.run_id,
            "replaced span"
        );

        Ok(ReplacementResult {
            original_span: (m.start, m.end),
            replacement_text: replacement.to_string(),
            cross_run,
        })
    }

    /// Insert a new run at `at`, splitting the run it falls in.
    ///
    /// At a boundary between runs the new run attaches after the preceding
    /// run, so no empty fragment is left behind.
    fn insert(
        &self,
        paragraph: &mut Paragraph,
        index: &RunIndex,
        at: usize,
        replacement: &str,
        highlight: bool,
    ) -> Result<ReplacementResult, SpliceError> {
        let result = ReplacementResult {
            original_span: (at, at),
            replacement_text: replacement.to_string(),
            cross_run: false,
        };
        if replacement.is_empty() {
            return Ok(result);
        }

        let runs = paragraph.runs();
        if runs.is_empty() {
            let mut run = Run::new(replacement);
            if highlight {
                run.highlight = Some(self.highlight.clone());
            }
            paragraph.runs_mut().push(run);
            return Ok(result);
        }

        // (anchor run, local offset inside it)
        let (anchor, local) = if at == 0 {
            (index.find_run(0)?, 0)
        } else {
            let run_id = index.find_run(at - 1)?;
            let (run_start, _) = index.bounds(run_id).ok_or(SpliceError::Uncovered {
                start: at,
                end: at,
            })?;
            (run_id, at - run_start)
        };

        let original = runs[anchor].clone();
        let mut label_run = original.with_text(replacement);
        label_run.highlight = highlight.then(|| self.highlight.clone());

        let runs = paragraph.runs_mut();
        if local == 0 {
            runs.insert(anchor, label_run);
        } else {
            let (before, after) = split_chars(&original.text, local);
            let after = after.to_string();
            runs[anchor].text = before.to_string();
            runs.insert(anchor + 1, label_run);
            if !after.is_empty() {
                runs.insert(anchor + 2, original.with_text(after));
            }
        }

        debug!(at, anchor, "inserted run");
        Ok(result)
    }
}
