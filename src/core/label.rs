//! Neutral label rendering (`{{field}}`) and recognition.

use serde::{Deserialize, Serialize};

use super::detectors::DetectionError;
use super::run_index::char_offset;

/// How labels are written back into the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelFormat {
    #[serde(default = "default_open")]
    pub open: String,

    #[serde(default = "default_close")]
    pub close: String,

    /// Marker used when no valid label could be obtained
    #[serde(default = "default_sentinel")]
    pub sentinel: String,

    /// Highlight every fill, not just sentinel fills
    #[serde(default)]
    pub highlight_all: bool,
}

fn default_open() -> String {
    "{{".to_string()
}
fn default_close() -> String {
    "}}".to_string()
}
fn default_sentinel() -> String {
    "???".to_string()
}

impl Default for LabelFormat {
    fn default() -> Self {
        Self {
            open: default_open(),
            close: default_close(),
            sentinel: default_sentinel(),
            highlight_all: false,
        }
    }
}

impl LabelFormat {
    pub fn open(&self) -> &str {
        &self.open
    }

    pub fn validate(&self) -> Result<(), DetectionError> {
        if self.open.is_empty() || self.close.is_empty() {
            return Err(DetectionError::EmptyMarkers);
        }
        Ok(())
    }

    /// Normalise a suggested label; `None` when it is unusable
    pub fn clean(&self, raw: &str) -> Option<String> {
        let stripped: String = raw
            .chars()
            .filter(|c| !matches!(c, '{' | '}' | '"' | '\'' | '“' | '”' | '`'))
            .collect();
        let label = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
        let label = label.trim_end_matches([':', '：']).trim();

        if label.is_empty() || label == self.sentinel {
            None
        } else {
            Some(label.to_string())
        }
    }

    /// Wrap a label in the markers
    pub fn render(&self, label: &str) -> String {
        format!("{}{}{}", self.open, label, self.close)
    }

    /// Rendered sentinel (`{{???}}`)
    pub fn render_sentinel(&self) -> String {
        self.render(&self.sentinel)
    }

    /// Character ranges of every rendered label already present in `text`
    pub fn label_ranges(&self, text: &str) -> Vec<(usize, usize)> {
        let mut ranges = Vec::new();
        if self.open.is_empty() || self.close.is_empty() {
            return ranges;
        }

        let mut from = 0;
        while let Some(rel) = text[from..].find(&self.open) {
            let open_at = from + rel;
            let body = open_at + self.open.len();
            let Some(close_rel) = text[body..].find(&self.close) else {
                break;
            };
            let close_end = body + close_rel + self.close.len();
            ranges.push((char_offset(text, open_at), char_offset(text, close_end)));
            from = close_end;
        }

        ranges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_label() {
        let format = LabelFormat::default();
        assert_eq!(format.clean("  姓名 "), Some("姓名".to_string()));
        assert_eq!(format.clean("{{公司名称}}"), Some("公司名称".to_string()));
        assert_eq!(format.clean("\"联系  电话\""), Some("联系 电话".to_string()));
        assert_eq!(format.clean("日期："), Some("日期".to_string()));
        assert_eq!(format.clean("???"), None);
        assert_eq!(format.clean("   "), None);
    }

    #[test]
    fn test_render() {
        let format = LabelFormat::default();
        assert_eq!(format.render("姓名"), "{{姓名}}");
        assert_eq!(format.render_sentinel(), "{{???}}");
    }

    #[test]
    fn test_label_ranges() {
        let format = LabelFormat::default();
        assert_eq!(
            format.label_ranges("姓名：{{姓名}} 电话：{{电话}}"),
            vec![(3, 9), (13, 19)]
        );
        assert!(format.label_ranges("{{unterminated").is_empty());
    }

    #[test]
    fn test_validate_markers() {
        let format = LabelFormat {
            open: String::new(),
            ..Default::default()
        };
        assert!(format.validate().is_err());
    }
}
