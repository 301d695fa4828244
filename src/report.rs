//! Markdown processing report written next to the filled document.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::domain::{DocumentReport, PassState, SkipReason};

/// `<output>.md`
pub fn report_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".md");
    PathBuf::from(name)
}

fn or_dash(text: &str) -> &str {
    if text.is_empty() {
        "-"
    } else {
        text
    }
}

pub fn render_markdown(report: &DocumentReport, source: &Path) -> String {
    let state = match report.state {
        PassState::Running => "running",
        PassState::Completed => "completed",
        PassState::Cancelled => "cancelled",
    };

    let mut out = format!("# Fill report: {}\n\n", source.display());
    out.push_str(&format!("- Run: {}\n", report.id));
    out.push_str(&format!("- State: {}\n", state));
    out.push_str(&format!("- Started: {}\n", report.started_at.to_rfc3339()));
    if let Some(done) = report.completed_at {
        out.push_str(&format!("- Completed: {}\n", done.to_rfc3339()));
    }
    out.push_str(&format!("- Paragraphs scanned: {}\n", report.paragraphs_scanned));
    out.push_str(&format!(
        "- Fills: {} ({} without a label)\n",
        report.fills.len(),
        report.fallback_count()
    ));
    out.push_str(&format!("- Skipped: {}\n\n", report.skipped.len()));

    for (i, fill) in report.fills.iter().enumerate() {
        out.push_str(&format!("## Fill {}: {}\n\n", i + 1, fill.replacement_text));
        out.push_str(&format!("- Kind: {}\n", fill.kind));
        out.push_str(&format!("- Location: {}\n", fill.location));
        out.push_str(&format!(
            "- Span: {}..{}\n",
            fill.original_span.0, fill.original_span.1
        ));
        if !fill.original_text.is_empty() {
            out.push_str(&format!("- Replaced: `{}`\n", fill.original_text));
        }
        out.push_str(&format!("- Label: {}\n", fill.label));
        if fill.fallback {
            out.push_str("- Needs review: no label was obtained\n");
        }
        if fill.cross_run {
            out.push_str("- Spans several runs\n");
        }
        out.push_str("\n### Context\n\n");
        out.push_str(&format!("Before: {}\n\n", or_dash(&fill.before)));
        out.push_str(&format!("After: {}\n\n", or_dash(&fill.after)));
        out.push_str("---\n\n");
    }

    if !report.skipped.is_empty() {
        out.push_str("## Skipped\n\n");
        for skip in &report.skipped {
            let reason = match skip.reason {
                SkipReason::Cancelled => "cancelled",
                SkipReason::SpliceFailed => "splice failed",
            };
            out.push_str(&format!(
                "- {} at {}..{} in {}: {}\n",
                skip.kind, skip.span.0, skip.span.1, skip.location, reason
            ));
        }
    }

    out
}

/// Render and write the report, creating parent directories
pub async fn write_markdown(report: &DocumentReport, source: &Path, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create report directory: {}", parent.display()))?;
    }

    tokio::fs::write(path, render_markdown(report, source))
        .await
        .with_context(|| format!("Failed to write report: {}", path.display()))
}
