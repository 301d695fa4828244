//! Detection pipeline.
//!
//! Per paragraph: flatten, run every detector, resolve conflicts, then for
//! each resolved match extract context, obtain a label and splice it in.
//! Matches are spliced in ascending order; each splice rebuilds the run
//! index and later matches are shifted by the length change so far.
//!
//! Paragraphs are independent, so a document is processed as a bounded
//! concurrent stream of paragraph jobs.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::adapters::{LabelRequest, LabelSuggester};
use crate::domain::{
    Color, Document, DocumentReport, FillRecord, Location, Match, MatchKind, Paragraph,
    ParagraphOutcome, PlannedFill, ResolvedMatchSet, SkipReason, SkippedMatch,
};

use super::context::ContextWindow;
use super::detectors::{DetectionConfig, DetectionError, DetectorSet, ParagraphView};
use super::label::LabelFormat;
use super::resolver::MatchResolver;
use super::run_index::{byte_offset, slice_chars, RunIndex};
use super::splice::{SpliceEngine, SpliceError};
use super::tables::{empty_cell_targets, TableConfig};

/// Pipeline tuning (`pipeline:` section of the config file)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Characters of context on each side of a match
    #[serde(default = "default_context_window")]
    pub context_window: usize,

    /// Paragraph jobs in flight at once
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Per-lookup timeout
    #[serde(default = "default_lookup_timeout_seconds")]
    pub lookup_timeout_seconds: u64,

    #[serde(default)]
    pub highlight_color: Color,
}

fn default_context_window() -> usize {
    100
}
fn default_max_concurrency() -> usize {
    8
}
fn default_lookup_timeout_seconds() -> u64 {
    30
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            context_window: default_context_window(),
            max_concurrency: default_max_concurrency(),
            lookup_timeout_seconds: default_lookup_timeout_seconds(),
            highlight_color: Color::default(),
        }
    }
}

/// Result of one label lookup
enum Lookup {
    Label(String),
    Fallback,
    Cancelled,
}

pub struct DetectionPipeline {
    detectors: DetectorSet,
    resolver: MatchResolver,
    window: ContextWindow,
    splicer: SpliceEngine,
    labels: LabelFormat,
    tables: TableConfig,
    max_concurrency: usize,
    lookup_timeout: Duration,
    suggester: Arc<dyn LabelSuggester>,
}

impl std::fmt::Debug for DetectionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionPipeline")
            .field("detectors", &self.detectors)
            .field("window", &self.window.size())
            .field("suggester", &self.suggester.name())
            .finish()
    }
}

/// Whether a paragraph can contain anything to fill
fn needs_scan(paragraph: &Paragraph) -> bool {
    !paragraph.text().is_empty()
        && (!paragraph.is_blank() || paragraph.runs().iter().any(|r| r.underline))
}

/// The line of `text` holding `[start, end)`, trimmed
fn line_around(text: &str, start: usize, end: usize) -> &str {
    let b_start = byte_offset(text, start);
    let b_end = byte_offset(text, end);
    let line_start = text[..b_start].rfind('\n').map_or(0, |i| i + 1);
    let line_end = text[b_end..].find('\n').map_or(text.len(), |i| b_end + i);
    text[line_start..line_end].trim()
}

/// Mutable handles to the scheduled paragraphs
fn paragraphs_mut<'d>(
    document: &'d mut Document,
    wanted: &HashSet<Location>,
) -> Vec<(Location, &'d mut Paragraph)> {
    let mut work = Vec::with_capacity(wanted.len());

    for (paragraph, p) in document.paragraphs.iter_mut().enumerate() {
        let location = Location::Body { paragraph };
        if wanted.contains(&location) {
            work.push((location, p));
        }
    }

    for (table, t) in document.tables.iter_mut().enumerate() {
        for (row, r) in t.rows.iter_mut().enumerate() {
            for (column, c) in r.cells.iter_mut().enumerate() {
                for (paragraph, p) in c.paragraphs.iter_mut().enumerate() {
                    let location = Location::Cell {
                        table,
                        row,
                        column,
                        paragraph,
                    };
                    if wanted.contains(&location) {
                        work.push((location, p));
                    }
                }
            }
        }
    }

    work
}

impl DetectionPipeline {
    /// Build a pipeline; invalid detector configuration is fatal here
    pub fn new(
        detection: &DetectionConfig,
        labels: LabelFormat,
        settings: &PipelineSettings,
        suggester: Arc<dyn LabelSuggester>,
    ) -> Result<Self, DetectionError> {
        let detectors = DetectorSet::from_config(detection, &labels)?;
        debug!(detectors = ?detectors.names(), "Registered detectors");

        Ok(Self {
            detectors,
            resolver: MatchResolver::new(),
            window: ContextWindow::new(settings.context_window),
            splicer: SpliceEngine::new(settings.highlight_color.clone()),
            labels,
            tables: TableConfig::default(),
            max_concurrency: settings.max_concurrency.max(1),
            lookup_timeout: Duration::from_secs(settings.lookup_timeout_seconds),
            suggester,
        })
    }

    pub fn with_tables(mut self, tables: TableConfig) -> Self {
        self.tables = tables;
        self
    }

    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    pub fn suggester_name(&self) -> &str {
        self.suggester.name()
    }

    pub fn detector_names(&self) -> Vec<&str> {
        self.detectors.names()
    }

    /// Detect and resolve matches in one paragraph, without mutating it
    pub fn detect(&self, paragraph: &Paragraph) -> ResolvedMatchSet {
        let index = RunIndex::build(paragraph.runs());
        let view = ParagraphView::new(paragraph.runs(), &index, &self.labels);
        self.resolver.resolve(self.detectors.detect_all(&view))
    }

    /// Paragraphs the pipeline will visit, in document order.
    ///
    /// Table cells come from the row batches, so merged continuation cells
    /// and blank cells are not visited here.
    fn schedule(&self, document: &Document) -> Vec<Location> {
        let mut locations: Vec<Location> = document
            .paragraphs
            .iter()
            .enumerate()
            .filter(|(_, p)| needs_scan(p))
            .map(|(paragraph, _)| Location::Body { paragraph })
            .collect();

        for (table, t) in document.tables.iter().enumerate() {
            for batch in t.row_batches() {
                for cell_text in &batch.cells {
                    let Some(cell) = t
                        .rows
                        .get(batch.row)
                        .and_then(|r| r.cells.get(cell_text.column))
                    else {
                        continue;
                    };
                    locations.extend(
                        cell.paragraphs
                            .iter()
                            .enumerate()
                            .filter(|(_, p)| needs_scan(p))
                            .map(|(paragraph, _)| Location::Cell {
                                table,
                                row: batch.row,
                                column: cell_text.column,
                                paragraph,
                            }),
                    );
                }
            }
        }

        locations
    }

    fn paragraph_at<'d>(document: &'d Document, location: &Location) -> Option<&'d Paragraph> {
        match *location {
            Location::Body { paragraph } => document.paragraphs.get(paragraph),
            Location::Cell {
                table,
                row,
                column,
                paragraph,
            } => document
                .tables
                .get(table)?
                .rows
                .get(row)?
                .cells
                .get(column)?
                .paragraphs
                .get(paragraph),
        }
    }

    /// Dry run: every fill position with its context, document untouched
    pub fn plan(&self, document: &Document) -> Vec<PlannedFill> {
        let mut planned = Vec::new();

        for location in self.schedule(document) {
            let Some(paragraph) = Self::paragraph_at(document, &location) else {
                continue;
            };
            let text = paragraph.text();
            for m in self.detect(paragraph) {
                let context = self.window.extract(text, &m);
                planned.push(PlannedFill {
                    location,
                    span: (m.start, m.end),
                    original_text: slice_chars(text, m.start, m.end).to_string(),
                    kind: m.kind,
                    before: context.before,
                    after: context.after,
                    label: None,
                });
            }
        }

        if self.tables.fill_empty_cells {
            for (table, t) in document.tables.iter().enumerate() {
                for target in empty_cell_targets(t) {
                    let at = t
                        .rows
                        .get(target.row)
                        .and_then(|r| r.cells.get(target.column))
                        .and_then(|c| c.paragraphs.first())
                        .map_or(0, Paragraph::char_len);
                    planned.push(PlannedFill {
                        location: Location::Cell {
                            table,
                            row: target.row,
                            column: target.column,
                            paragraph: 0,
                        },
                        kind: MatchKind::EmptyCell,
                        span: (at, at),
                        original_text: String::new(),
                        before: target.header,
                        after: String::new(),
                        label: Some(target.label),
                    });
                }
            }
        }

        planned
    }

    /// Ask the suggester for a label, bounded by the timeout and the cancel token
    async fn lookup(&self, request: &LabelRequest, cancel: &CancellationToken) -> Lookup {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Lookup::Cancelled,
            result = tokio::time::timeout(self.lookup_timeout, self.suggester.suggest(request)) => {
                match result {
                    Ok(Ok(raw)) => match self.labels.clean(&raw) {
                        Some(label) => Lookup::Label(label),
                        None => {
                            debug!(raw = %raw, "Suggested label unusable");
                            Lookup::Fallback
                        }
                    },
                    Ok(Err(e)) => {
                        warn!(suggester = self.suggester.name(), error = %e, "Label lookup failed");
                        Lookup::Fallback
                    }
                    Err(_) => {
                        warn!(
                            suggester = self.suggester.name(),
                            timeout_ms = self.lookup_timeout.as_millis() as u64,
                            "Label lookup timed out"
                        );
                        Lookup::Fallback
                    }
                }
            }
        }
    }

    /// Run the full detect/label/splice cycle over one paragraph
    pub async fn process_paragraph(
        &self,
        paragraph: &mut Paragraph,
        location: Location,
        cancel: &CancellationToken,
    ) -> ParagraphOutcome {
        let mut outcome = ParagraphOutcome::default();
        let resolved = self.detect(paragraph);
        if resolved.is_empty() {
            return outcome;
        }

        let original = paragraph.text().to_string();
        debug!(%location, matches = resolved.len(), "Resolved matches");

        let mut shift: isize = 0;
        for m in resolved {
            let context = self.window.extract(&original, &m);
            let request = LabelRequest {
                before: context.before.clone(),
                after: context.after.clone(),
                line: line_around(&original, m.start, m.end).to_string(),
            };

            let (label, fallback) = match self.lookup(&request, cancel).await {
                Lookup::Label(label) => (label, false),
                Lookup::Fallback => (self.labels.sentinel.clone(), true),
                Lookup::Cancelled => {
                    outcome.skipped.push(SkippedMatch {
                        location,
                        kind: m.kind,
                        span: (m.start, m.end),
                        reason: SkipReason::Cancelled,
                    });
                    continue;
                }
            };

            let replacement = self.labels.render(&label);
            let highlight = fallback || self.labels.highlight_all;

            let spliced = match m.shifted(shift) {
                Some(target) => self.splicer.splice(paragraph, &target, &replacement, highlight),
                None => Err(SpliceError::OutOfRange {
                    start: m.start,
                    end: m.end,
                    len: paragraph.char_len(),
                }),
            };

            match spliced {
                Ok(result) => {
                    shift += replacement.chars().count() as isize - m.len() as isize;
                    outcome.fills.push(FillRecord {
                        location,
                        original_span: (m.start, m.end),
                        original_text: slice_chars(&original, m.start, m.end).to_string(),
                        kind: m.kind,
                        label,
                        replacement_text: result.replacement_text,
                        fallback,
                        cross_run: result.cross_run,
                        before: context.before,
                        after: context.after,
                    });
                }
                Err(e) => {
                    warn!(%location, start = m.start, end = m.end, error = %e, "Splice failed, skipping match");
                    outcome.skipped.push(SkippedMatch {
                        location,
                        kind: m.kind,
                        span: (m.start, m.end),
                        reason: SkipReason::SpliceFailed,
                    });
                }
            }
        }

        outcome
    }

    /// Label blank table cells from their headers
    fn fill_empty_cells(&self, document: &mut Document) -> ParagraphOutcome {
        let mut outcome = ParagraphOutcome::default();

        for (table, t) in document.tables.iter_mut().enumerate() {
            for target in empty_cell_targets(t) {
                let Some(cell) = t
                    .rows
                    .get_mut(target.row)
                    .and_then(|r| r.cells.get_mut(target.column))
                else {
                    continue;
                };
                if cell.paragraphs.is_empty() {
                    cell.paragraphs.push(Paragraph::default());
                }
                let Some(paragraph) = cell.paragraphs.first_mut() else {
                    continue;
                };

                let location = Location::Cell {
                    table,
                    row: target.row,
                    column: target.column,
                    paragraph: 0,
                };
                let at = paragraph.char_len();
                let m = Match::insertion(MatchKind::EmptyCell, at, 0, 0);
                let replacement = self.labels.render(&target.label);

                match self
                    .splicer
                    .splice(paragraph, &m, &replacement, self.labels.highlight_all)
                {
                    Ok(result) => outcome.fills.push(FillRecord {
                        location,
                        kind: MatchKind::EmptyCell,
                        original_span: (at, at),
                        original_text: String::new(),
                        label: target.label,
                        replacement_text: result.replacement_text,
                        fallback: false,
                        cross_run: false,
                        before: target.header,
                        after: String::new(),
                    }),
                    Err(e) => {
                        warn!(%location, error = %e, "Empty cell fill failed");
                        outcome.skipped.push(SkippedMatch {
                            location,
                            kind: MatchKind::EmptyCell,
                            span: (at, at),
                            reason: SkipReason::SpliceFailed,
                        });
                    }
                }
            }
        }

        outcome
    }

    /// Process every body and cell paragraph of `document` in place.
    ///
    /// Never fails: lookup failures become sentinel fills, splice failures
    /// and cancelled lookups are listed in the report as skipped.
    #[instrument(skip_all, fields(paragraphs = document.paragraph_count()))]
    pub async fn process_document(
        &self,
        document: &mut Document,
        cancel: &CancellationToken,
    ) -> DocumentReport {
        let mut report = DocumentReport::new();
        let wanted: HashSet<Location> = self.schedule(document).into_iter().collect();

        let work = paragraphs_mut(document, &wanted);
        info!(scheduled = work.len(), suggester = self.suggester.name(), "Processing document");

        let outcomes: Vec<ParagraphOutcome> = stream::iter(work)
            .map(|(location, paragraph)| self.process_paragraph(paragraph, location, cancel))
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        for outcome in outcomes {
            report.absorb(outcome);
        }

        if self.tables.fill_empty_cells && !cancel.is_cancelled() {
            let cells = self.fill_empty_cells(document);
            report.fills.extend(cells.fills);
            report.skipped.extend(cells.skipped);
        }

        report.finish(cancel.is_cancelled());
        info!(
            fills = report.fills.len(),
            fallbacks = report.fallback_count(),
            skipped = report.skipped.len(),
            "Document processed"
        );

        report
    }
}
