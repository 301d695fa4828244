//! Offline label suggester.
//!
//! Inherits the field name written just before the blank (`姓名：____`
//! gives `姓名`), else a parenthesised annotation right after it
//! (`____（签字）` gives `签字`). Anything else is reported as no
//! suggestion, which the pipeline turns into the sentinel label.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use super::{LabelLookupFailure, LabelRequest, LabelSuggester};

static RE_PRECEDING_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([\p{Han}A-Za-z0-9]{2,8})[ \t\u{3000}]*[：:][ \t\u{3000}]*$")
        .expect("valid preceding field regex")
});
static RE_ANNOTATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[（(][ \t]*([\p{Han}A-Za-z0-9 ]{2,12}?)[ \t]*[)）]")
        .expect("valid annotation regex")
});

#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicSuggester;

impl HeuristicSuggester {
    pub fn new() -> Self {
        Self
    }

    /// Pure lookup shared by the async trait impl
    pub fn field_name(&self, request: &LabelRequest) -> Option<String> {
        let from_before = RE_PRECEDING_FIELD
            .captures(&request.before)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());

        from_before.or_else(|| {
            RE_ANNOTATION
                .captures(&request.after)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
        })
    }
}

#[async_trait]
impl LabelSuggester for HeuristicSuggester {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn suggest(&self, request: &LabelRequest) -> Result<String, LabelLookupFailure> {
        self.field_name(request)
            .ok_or(LabelLookupFailure::NoSuggestion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(before: &str, after: &str) -> LabelRequest {
        LabelRequest {
            before: before.to_string(),
            after: after.to_string(),
            line: format!("{}{}", before, after),
        }
    }

    #[test]
    fn test_inherits_preceding_field() {
        let s = HeuristicSuggester::new();
        assert_eq!(s.field_name(&request("姓名：", "")), Some("姓名".to_string()));
        assert_eq!(
            s.field_name(&request("申请人姓名：", "（签字）")),
            Some("申请人姓名".to_string())
        );
        assert_eq!(s.field_name(&request("Phone:", "")), Some("Phone".to_string()));
    }

    #[test]
    fn test_falls_back_to_annotation() {
        let s = HeuristicSuggester::new();
        assert_eq!(s.field_name(&request("", "（签字）")), Some("签字".to_string()));
        assert_eq!(s.field_name(&request("由", "公司")), None);
    }

    #[tokio::test]
    async fn test_suggest_reports_no_suggestion() {
        let s = HeuristicSuggester::new();
        let err = s.suggest(&request("", "")).await.unwrap_err();
        assert_eq!(err, LabelLookupFailure::NoSuggestion);
    }
}
