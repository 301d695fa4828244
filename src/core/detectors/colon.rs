//! Colon-field detectors (`姓名：`).
//!
//! Both detectors emit insertion points immediately after the colon; the
//! label text and any existing content are never overwritten.

use regex::{Captures, Regex};

use super::{DetectionError, Detector, FillerAlphabet, ParagraphView, Slot};
use crate::domain::{Match, MatchKind};

/// 2-8 letters, digits or Han ideographs
const LABEL: &str = r"[\p{Han}A-Za-z0-9]{2,8}";

/// Horizontal whitespace, including the ideographic space
const HSPACE: &str = r"[ \t\u{3000}\u{00A0}]";

fn colon_class(colons: &str) -> Result<String, DetectionError> {
    if colons.is_empty() {
        return Err(DetectionError::NoColons);
    }
    let class: String = colons
        .chars()
        .map(|c| regex::escape(&c.to_string()))
        .collect();
    Ok(format!("[{}]", class))
}

fn compile(name: &str, pattern: &str) -> Result<Regex, DetectionError> {
    Regex::new(pattern).map_err(|source| DetectionError::InvalidPattern {
        name: name.to_string(),
        source,
    })
}

/// Insertion point right after the captured colon
fn after_colon(view: &ParagraphView<'_>, caps: &Captures<'_>) -> Option<usize> {
    caps.name("colon").map(|c| view.char_at(c.end()))
}

/// `label:` followed only by whitespace up to end of line or text
pub struct ColonFieldDetector {
    pattern: Regex,
}

impl ColonFieldDetector {
    pub fn new(colons: &str) -> Result<Self, DetectionError> {
        let pattern = format!(
            r"(?m){label}(?P<colon>{colon}){hspace}*$",
            label = LABEL,
            colon = colon_class(colons)?,
            hspace = HSPACE,
        );
        Ok(Self {
            pattern: compile("colon_field", &pattern)?,
        })
    }
}

impl Detector for ColonFieldDetector {
    fn name(&self) -> &str {
        "colon_field"
    }

    fn detect(&self, view: &ParagraphView<'_>, slot: Slot) -> Vec<Match> {
        self.pattern
            .captures_iter(view.text())
            .filter_map(|caps| after_colon(view, &caps))
            .filter(|&at| !view.is_protected(at, at))
            .map(|at| slot.insertion(MatchKind::ColonField, at))
            .collect()
    }
}

/// `label: content` where the content is real text.
///
/// Content that is itself a filler run, an already written label or the
/// start of the next field does not count, nor do URL schemes and clock
/// times behind an ASCII colon.
pub struct ColonFieldWithContentDetector {
    pattern: Regex,
    field_start: Regex,
    fillers: Vec<FillerAlphabet>,
    min_repetition: usize,
    label_open: String,
}

fn is_hspace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\u{3000}' | '\u{00A0}')
}

impl ColonFieldWithContentDetector {
    pub fn new(
        colons: &str,
        fillers: &[FillerAlphabet],
        min_repetition: usize,
        label_open: &str,
    ) -> Result<Self, DetectionError> {
        let class = colon_class(colons)?;
        let pattern = format!(r"{label}(?P<colon>{colon})", label = LABEL, colon = class);
        let field_start = format!(r"^{label}{colon}", label = LABEL, colon = class);
        Ok(Self {
            pattern: compile("colon_field_with_content", &pattern)?,
            field_start: compile("colon_field_with_content", &field_start)?,
            fillers: fillers.to_vec(),
            min_repetition,
            label_open: label_open.to_string(),
        })
    }

    fn is_real_content(&self, colon: &str, content: &str) -> bool {
        if content.is_empty() || self.field_start.is_match(content) {
            return false;
        }
        if !self.label_open.is_empty() && content.starts_with(&self.label_open) {
            return false;
        }
        if self
            .fillers
            .iter()
            .any(|f| f.starts_run(content, self.min_repetition))
        {
            return false;
        }
        if colon == ":" {
            let first = content.chars().next();
            if content.starts_with("//") || first.is_some_and(|c| c.is_ascii_digit()) {
                return false;
            }
        }
        true
    }
}

impl Detector for ColonFieldWithContentDetector {
    fn name(&self) -> &str {
        "colon_field_with_content"
    }

    fn detect(&self, view: &ParagraphView<'_>, slot: Slot) -> Vec<Match> {
        let text = view.text();
        self.pattern
            .captures_iter(text)
            .filter_map(|caps| {
                let colon = caps.name("colon")?;
                let content = text[colon.end()..]
                    .trim_start_matches(is_hspace)
                    .split(char::is_whitespace)
                    .next()
                    .unwrap_or_default();
                self.is_real_content(colon.as_str(), content)
                    .then(|| view.char_at(colon.end()))
            })
            .filter(|&at| !view.is_protected(at, at))
            .map(|at| slot.insertion(MatchKind::ColonFieldWithContent, at))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::label::LabelFormat;
    use crate::core::run_index::RunIndex;
    use crate::domain::Run;

    const SLOT: Slot = Slot {
        priority: 10,
        index: 0,
    };

    fn detect(detector: &dyn Detector, texts: &[&str]) -> Vec<usize> {
        let runs: Vec<Run> = texts.iter().map(|t| Run::new(*t)).collect();
        let index = RunIndex::build(&runs);
        let view = ParagraphView::new(&runs, &index, &LabelFormat::default());
        detector
            .detect(&view, SLOT)
            .into_iter()
            .inspect(|m| assert!(m.is_insertion()))
            .map(|m| m.start)
            .collect()
    }

    fn with_content() -> ColonFieldWithContentDetector {
        ColonFieldWithContentDetector::new(
            "：:",
            &[FillerAlphabet::new("_＿"), FillerAlphabet::new("xX")],
            3,
            "{{",
        )
        .unwrap()
    }

    #[test]
    fn test_colon_field_at_end_of_text() {
        let d = ColonFieldDetector::new("：:").unwrap();
        assert_eq!(detect(&d, &["姓名："]), vec![3]);
        assert_eq!(detect(&d, &["电话：", "   "]), vec![3]);
        assert_eq!(detect(&d, &["Name:"]), vec![5]);
    }

    #[test]
    fn test_colon_field_per_line() {
        let d = ColonFieldDetector::new("：").unwrap();
        assert_eq!(detect(&d, &["姓名：\n电话：123"]), vec![3]);
    }

    #[test]
    fn test_colon_field_requires_label() {
        let d = ColonFieldDetector::new("：").unwrap();
        assert_eq!(detect(&d, &["名："]), Vec::<usize>::new());
        assert_eq!(detect(&d, &["：  "]), Vec::<usize>::new());
    }

    #[test]
    fn test_colon_field_ignores_filled_label() {
        let d = ColonFieldDetector::new("：").unwrap();
        assert_eq!(detect(&d, &["姓名：{{姓名}}"]), Vec::<usize>::new());
    }

    #[test]
    fn test_with_content_inserts_after_colon() {
        let d = with_content();
        assert_eq!(detect(&d, &["姓名：张三"]), vec![3]);
        assert_eq!(detect(&d, &["姓名： 张三"]), vec![3]);
        assert_eq!(detect(&d, &["姓名：张三 性别：男"]), vec![3, 9]);
    }

    #[test]
    fn test_with_content_skips_fillers_and_labels() {
        let d = with_content();
        assert_eq!(detect(&d, &["姓名：____"]), Vec::<usize>::new());
        assert_eq!(detect(&d, &["公司：xxxx"]), Vec::<usize>::new());
        assert_eq!(detect(&d, &["姓名：{{姓名}}"]), Vec::<usize>::new());
        assert_eq!(detect(&d, &["姓名：   "]), Vec::<usize>::new());
    }

    #[test]
    fn test_with_content_skips_next_field() {
        let d = with_content();
        assert_eq!(detect(&d, &["日期：    备注：无"]), vec![10]);
    }

    #[test]
    fn test_with_content_skips_urls_and_times() {
        let d = with_content();
        assert_eq!(detect(&d, &["see https://example.com"]), Vec::<usize>::new());
        assert_eq!(detect(&d, &["at 10:30"]), Vec::<usize>::new());
    }

    #[test]
    fn test_empty_colon_set_rejected() {
        assert!(matches!(
            ColonFieldDetector::new(""),
            Err(DetectionError::NoColons)
        ));
    }
}
