//! Command-line interface for neutralfill.
//!
//! Provides commands for filling a document, previewing detections,
//! and showing the resolved configuration.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use crate::adapters::{ChatSuggester, HeuristicSuggester, JsonStore, LabelSuggester};
use crate::config::{self, ResolvedConfig};
use crate::report;

/// neutralfill - Replace form blanks with neutral field labels
#[derive(Parser, Debug)]
#[command(name = "neutralfill")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detect blanks and rewrite them with labels
    Fill {
        /// Input document (JSON)
        input: PathBuf,

        /// Output path (defaults to <stem>_filled.<ext> next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Derive labels locally without calling the chat service
        #[arg(long)]
        offline: bool,

        /// Skip writing the markdown report
        #[arg(long)]
        no_report: bool,
    },

    /// List detected blanks without modifying the document
    Detect {
        /// Input document (JSON)
        input: PathBuf,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Fill {
                input,
                output,
                offline,
                no_report,
            } => fill(&input, output, offline, no_report).await,
            Commands::Detect { input } => detect(&input).await,
            Commands::Config => show_config(),
        }
    }
}

/// `<stem>_filled.<ext>` next to the input
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let name = match input.extension() {
        Some(ext) => format!("{}_filled.{}", stem, ext.to_string_lossy()),
        None => format!("{}_filled", stem),
    };
    input.with_file_name(name)
}

/// Chat service when configured, local heuristic otherwise
fn select_suggester(cfg: &ResolvedConfig, offline: bool) -> Arc<dyn LabelSuggester> {
    if offline {
        return Arc::new(HeuristicSuggester::new());
    }
    match ChatSuggester::new(cfg.llm.clone()) {
        Ok(chat) => Arc::new(chat),
        Err(e) => {
            tracing::warn!(error = %e, "Chat service unavailable, using heuristic labels");
            Arc::new(HeuristicSuggester::new())
        }
    }
}

async fn fill(input: &Path, output: Option<PathBuf>, offline: bool, no_report: bool) -> Result<()> {
    let cfg = config::load_config()?;
    let suggester = select_suggester(&cfg, offline);
    let pipeline = cfg
        .build_pipeline(suggester)
        .context("Invalid detection configuration")?;

    let store = JsonStore::new();
    let mut document = store.load(input).await?;
    let output = output.unwrap_or_else(|| default_output_path(input));

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing current fills");
            interrupt.cancel();
        }
    });

    eprintln!(
        "Filling {} (labels from {})",
        input.display(),
        pipeline.suggester_name()
    );
    let result = pipeline.process_document(&mut document, &cancel).await;

    store.save(&document, &output).await?;

    eprintln!("\n[Run {} {:?}]", result.id, result.state);
    eprintln!("   Paragraphs scanned: {}", result.paragraphs_scanned);
    eprintln!(
        "   Fills: {} ({} without a label)",
        result.fills.len(),
        result.fallback_count()
    );
    if !result.skipped.is_empty() {
        eprintln!("   Skipped: {}", result.skipped.len());
    }
    eprintln!("   Output: {}", output.display());

    if !no_report {
        let report_path = report::report_path(&output);
        report::write_markdown(&result, input, &report_path).await?;
        eprintln!("   Report: {}", report_path.display());
    }

    Ok(())
}

async fn detect(input: &Path) -> Result<()> {
    let cfg = config::load_config()?;
    let pipeline = cfg
        .build_pipeline(Arc::new(HeuristicSuggester::new()))
        .context("Invalid detection configuration")?;

    let document = JsonStore::new().load(input).await?;
    let planned = pipeline.plan(&document);

    if planned.is_empty() {
        println!("No blanks found");
        return Ok(());
    }

    println!("{:<22} {:<26} {:<12} {}", "LOCATION", "KIND", "SPAN", "CONTEXT");
    println!("{}", "-".repeat(90));
    for fill in &planned {
        let span = format!("{}..{}", fill.span.0, fill.span.1);
        let context = match &fill.label {
            Some(label) => format!("-> {}", label),
            None => format!("{}[...]{}", tail(&fill.before, 16), head(&fill.after, 16)),
        };
        println!(
            "{:<22} {:<26} {:<12} {}",
            fill.location.to_string(),
            fill.kind.as_str(),
            span,
            context
        );
    }
    println!("\n{} blank(s) in {} paragraph(s)", planned.len(), document.paragraph_count());

    Ok(())
}

fn head(text: &str, n: usize) -> String {
    text.chars().take(n).collect()
}

fn tail(text: &str, n: usize) -> String {
    let len = text.chars().count();
    text.chars().skip(len.saturating_sub(n)).collect()
}

fn show_config() -> Result<()> {
    let cfg = config::load_config()?;

    println!("neutralfill configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!(
        "API key:     {}",
        if cfg.llm.api_key.is_some() {
            "set"
        } else {
            "not set (heuristic labels)"
        }
    );
    println!();
    print!("{}", cfg.to_yaml()?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("forms/apply.json")),
            PathBuf::from("forms/apply_filled.json")
        );
        assert_eq!(
            default_output_path(Path::new("apply")),
            PathBuf::from("apply_filled")
        );
    }

    #[test]
    fn test_offline_uses_heuristic() {
        let suggester = select_suggester(&ResolvedConfig::default(), true);
        assert_eq!(suggester.name(), "heuristic");
    }

    #[test]
    fn test_missing_key_falls_back() {
        let mut cfg = ResolvedConfig::default();
        cfg.llm.api_key = None;
        assert_eq!(select_suggester(&cfg, false).name(), "heuristic");
    }

    #[test]
    fn test_parse_fill_args() {
        let cli = Cli::parse_from(["neutralfill", "fill", "a.json", "-o", "b.json", "--offline"]);
        match cli.command {
            Commands::Fill {
                input,
                output,
                offline,
                no_report,
            } => {
                assert_eq!(input, PathBuf::from("a.json"));
                assert_eq!(output, Some(PathBuf::from("b.json")));
                assert!(offline);
                assert!(!no_report);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_context_trim() {
        assert_eq!(tail("申请人姓名：", 3), "姓名：");
        assert_eq!(head("ab", 5), "ab");
    }
}
