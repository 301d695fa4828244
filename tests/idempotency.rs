//! Idempotency Integration Tests
//!
//! A filled document contains only labels, so a second pass finds nothing
//! and leaves the document byte-for-byte unchanged.

use std::sync::Arc;

use neutralfill::core::{DetectionConfig, DetectionPipeline, LabelFormat, PipelineSettings};
use neutralfill::domain::{Cell, Document, Paragraph, Row, Run, Table};
use neutralfill::HeuristicSuggester;
use tokio_util::sync::CancellationToken;

fn pipeline() -> DetectionPipeline {
    DetectionPipeline::new(
        &DetectionConfig::default(),
        LabelFormat::default(),
        &PipelineSettings::default(),
        Arc::new(HeuristicSuggester::new()),
    )
    .unwrap()
}

fn mixed_form() -> Document {
    Document {
        paragraphs: vec![
            Paragraph::from_texts(["姓名：____  性别：", "", "xxx"]),
            Paragraph::new(vec![
                Run::new("日期："),
                Run::underlined("   "),
                Run::new("年"),
                Run::underlined("  "),
                Run::new("月"),
            ]),
            Paragraph::from_texts(["备注（如有）：＿＿＿＿"]),
            Paragraph::from_texts(["联系电话："]),
        ],
        tables: vec![Table {
            rows: vec![
                Row {
                    cells: vec![
                        Cell::new(vec![Paragraph::from_texts(["项目"])]),
                        Cell::new(vec![Paragraph::from_texts(["数量"])]),
                    ],
                },
                Row {
                    cells: vec![Cell::default(), Cell::default()],
                },
            ],
        }],
    }
}

#[tokio::test]
async fn test_second_pass_is_a_no_op() {
    let p = pipeline();
    let mut doc = mixed_form();

    let first = p.process_document(&mut doc, &CancellationToken::new()).await;
    assert!(!first.fills.is_empty());
    let after_first = serde_json::to_string(&doc).unwrap();

    let second = p.process_document(&mut doc, &CancellationToken::new()).await;
    assert!(second.fills.is_empty(), "refilled: {:?}", second.fills);
    assert!(second.skipped.is_empty());
    assert_eq!(serde_json::to_string(&doc).unwrap(), after_first);
}

#[tokio::test]
async fn test_plan_after_fill_is_empty() {
    let p = pipeline();
    let mut doc = mixed_form();
    assert!(!p.plan(&doc).is_empty());

    p.process_document(&mut doc, &CancellationToken::new()).await;
    assert!(p.plan(&doc).is_empty());
}

#[tokio::test]
async fn test_sentinel_fill_is_stable() {
    let p = pipeline();
    let mut doc = Document {
        paragraphs: vec![Paragraph::from_texts(["____"])],
        tables: Vec::new(),
    };

    p.process_document(&mut doc, &CancellationToken::new()).await;
    assert_eq!(doc.paragraphs[0].text(), "{{???}}");

    let again = p.process_document(&mut doc, &CancellationToken::new()).await;
    assert!(again.fills.is_empty());
    assert_eq!(doc.paragraphs[0].text(), "{{???}}");
}
