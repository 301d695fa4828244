//! Character-pattern detectors: repeated filler characters and
//! user-configured named patterns.

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{CustomPattern, DetectionError, Detector, ParagraphView, Slot};
use crate::domain::{Match, MatchKind};

/// A set of interchangeable filler characters (e.g. `_＿`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillerAlphabet {
    pub chars: String,

    /// Overrides the detector-wide minimum run length
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_len: Option<usize>,
}

impl FillerAlphabet {
    pub fn new(chars: impl Into<String>) -> Self {
        Self {
            chars: chars.into(),
            min_len: None,
        }
    }

    pub fn with_min_len(mut self, min_len: usize) -> Self {
        self.min_len = Some(min_len);
        self
    }

    pub fn contains(&self, c: char) -> bool {
        self.chars.contains(c)
    }

    /// Regex matching a run of at least `min_len` alphabet characters
    fn compile(&self, index: usize, default_min: usize) -> Result<Regex, DetectionError> {
        if self.chars.is_empty() {
            return Err(DetectionError::EmptyAlphabet { index });
        }
        let min_len = self.min_len.unwrap_or(default_min);
        if min_len == 0 {
            return Err(DetectionError::ZeroThreshold { index });
        }

        let class: String = self
            .chars
            .chars()
            .map(|c| regex::escape(&c.to_string()))
            .collect();
        let pattern = format!("[{}]{{{},}}", class, min_len);
        Regex::new(&pattern).map_err(|source| DetectionError::InvalidPattern {
            name: format!("filler[{}]", index),
            source,
        })
    }

    /// Whether `text` opens with a filler run long enough to count
    pub(crate) fn starts_run(&self, text: &str, default_min: usize) -> bool {
        let min_len = self.min_len.unwrap_or(default_min).max(1);
        text.chars().take_while(|&c| self.contains(c)).count() >= min_len
    }
}

/// Runs of filler characters (`____`, `xxxx`); one regex per alphabet
pub struct RepeatedCharacterDetector {
    patterns: Vec<Regex>,
}

impl RepeatedCharacterDetector {
    pub fn new(alphabets: &[FillerAlphabet], min_repetition: usize) -> Result<Self, DetectionError> {
        let patterns = alphabets
            .iter()
            .enumerate()
            .map(|(i, a)| a.compile(i, min_repetition))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }
}

impl Detector for RepeatedCharacterDetector {
    fn name(&self) -> &str {
        "repeated_character"
    }

    fn detect(&self, view: &ParagraphView<'_>, slot: Slot) -> Vec<Match> {
        let text = view.text();
        let mut found: Vec<Match> = self
            .patterns
            .iter()
            .flat_map(|re| re.find_iter(text))
            .map(|m| (view.char_at(m.start()), view.char_at(m.end())))
            .filter(|&(s, e)| !view.is_protected(s, e))
            .map(|(s, e)| slot.span(MatchKind::RepeatedCharacter, s, e))
            .collect();

        // Alphabets are matched independently; merge identical spans
        found.sort_by_key(|m| (m.start, m.end));
        found.dedup_by_key(|m| (m.start, m.end));
        found
    }
}

/// A named user pattern; the whole regex match is the fill target
pub struct CustomPatternDetector {
    name: String,
    pattern: Regex,
}

impl CustomPatternDetector {
    pub fn new(custom: &CustomPattern) -> Result<Self, DetectionError> {
        let pattern =
            Regex::new(&custom.pattern).map_err(|source| DetectionError::InvalidPattern {
                name: custom.name.clone(),
                source,
            })?;
        if pattern.is_match("") {
            return Err(DetectionError::EmptyMatch {
                name: custom.name.clone(),
            });
        }
        Ok(Self {
            name: custom.name.clone(),
            pattern,
        })
    }
}

impl Detector for CustomPatternDetector {
    fn name(&self) -> &str {
        &self.name
    }

    fn detect(&self, view: &ParagraphView<'_>, slot: Slot) -> Vec<Match> {
        self.pattern
            .find_iter(view.text())
            .filter(|m| !m.is_empty())
            .map(|m| (view.char_at(m.start()), view.char_at(m.end())))
            .filter(|&(s, e)| !view.is_protected(s, e))
            .map(|(s, e)| slot.span(MatchKind::Custom(self.name.clone()), s, e))
            .collect()
    }
}
