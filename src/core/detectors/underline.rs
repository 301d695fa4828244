//! Underlined-whitespace detector.
//!
//! Works on run formatting rather than text patterns: whitespace inside an
//! underlined run is a visible blank line to write on. Blanks split across
//! consecutive underlined runs are merged into one match.

use super::{Detector, ParagraphView, Slot};
use crate::domain::{Match, MatchKind};

/// Largest gap (in characters) bridged when merging across runs
const MERGE_TOLERANCE: usize = 1;

#[derive(Debug, Default)]
pub struct UnderlineRunDetector;

impl UnderlineRunDetector {
    pub fn new() -> Self {
        Self
    }
}

fn is_blank_char(c: char) -> bool {
    c.is_whitespace() && c != '\n' && c != '\r'
}

/// Maximal whitespace groups of a run's text, as local char ranges
fn blank_ranges(text: &str) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut open: Option<usize> = None;
    let mut len = 0;

    for (i, c) in text.chars().enumerate() {
        match (is_blank_char(c), open) {
            (true, None) => open = Some(i),
            (false, Some(start)) => {
                ranges.push((start, i));
                open = None;
            }
            _ => {}
        }
        len = i + 1;
    }
    if let Some(start) = open {
        ranges.push((start, len));
    }

    ranges
}

/// Whether the blank at `start` in `run_id` continues `last` (start, end, run).
///
/// The runs must be consecutive, ignoring empty runs, and every bridged
/// character must itself be underlined.
fn bridges(
    view: &ParagraphView<'_>,
    last: (usize, usize, usize),
    start: usize,
    run_id: usize,
) -> bool {
    let (_, last_end, last_run) = last;
    if last_run >= run_id || start > last_end + MERGE_TOLERANCE {
        return false;
    }

    let runs = view.runs();
    let between = runs.get(last_run + 1..run_id).unwrap_or_default();
    if between.iter().any(|r| !r.text.is_empty()) {
        return false;
    }

    (last_end..start).all(|offset| {
        view.index()
            .find_run(offset)
            .ok()
            .and_then(|id| runs.get(id))
            .is_some_and(|r| r.underline)
    })
}

impl Detector for UnderlineRunDetector {
    fn name(&self) -> &str {
        "underline"
    }

    fn detect(&self, view: &ParagraphView<'_>, slot: Slot) -> Vec<Match> {
        // (start, end, run_id) in flattened offsets, ascending
        let mut blanks: Vec<(usize, usize, usize)> = Vec::new();

        for (run_id, run) in view.runs().iter().enumerate() {
            if !run.underline || run.text.is_empty() {
                continue;
            }
            let Some((run_start, _)) = view.index().bounds(run_id) else {
                continue;
            };
            blanks.extend(
                blank_ranges(&run.text)
                    .into_iter()
                    .map(|(s, e)| (run_start + s, run_start + e, run_id))
                    .filter(|&(s, e, _)| !view.is_protected(s, e)),
            );
        }

        let mut merged: Vec<(usize, usize, usize)> = Vec::with_capacity(blanks.len());
        for (start, end, run_id) in blanks {
            match merged.last_mut() {
                Some(last) if bridges(view, *last, start, run_id) => {
                    last.1 = last.1.max(end);
                    last.2 = run_id;
                }
                _ => merged.push((start, end, run_id)),
            }
        }

        merged
            .into_iter()
            .map(|(s, e, _)| slot.span(MatchKind::Underline, s, e))
            .collect()
    }
}
