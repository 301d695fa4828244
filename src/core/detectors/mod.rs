//! Placeholder detectors.
//!
//! Each detector scans a read-only view of one paragraph and emits
//! candidate matches. Detectors never see each other's output and never
//! mutate text; conflicts are settled later by the resolver.
//!
//! Registration order is significant: it is the final tie-break between
//! equal-priority matches.

pub mod character;
pub mod colon;
pub mod underline;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::label::LabelFormat;
use crate::core::run_index::{char_offset, RunIndex};
use crate::domain::{Match, MatchKind, Run};

pub use character::{CustomPatternDetector, FillerAlphabet, RepeatedCharacterDetector};
pub use colon::{ColonFieldDetector, ColonFieldWithContentDetector};
pub use underline::UnderlineRunDetector;

/// Invalid detector configuration (fatal at startup)
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("Filler alphabet {index} is empty")]
    EmptyAlphabet { index: usize },

    #[error("Minimum repetition must be at least 1 (alphabet {index})")]
    ZeroThreshold { index: usize },

    #[error("Colon character set is empty")]
    NoColons,

    #[error("Invalid pattern '{name}': {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("Pattern '{name}' matches empty text")]
    EmptyMatch { name: String },

    #[error("Detector '{0}' registered more than once")]
    DuplicateDetector(String),

    #[error("Label markers must not be empty")]
    EmptyMarkers,
}

/// Read-only snapshot of a paragraph handed to every detector
#[derive(Debug)]
pub struct ParagraphView<'a> {
    runs: &'a [Run],
    index: &'a RunIndex,
    protected: Vec<(usize, usize)>,
}

impl<'a> ParagraphView<'a> {
    pub fn new(runs: &'a [Run], index: &'a RunIndex, labels: &LabelFormat) -> Self {
        Self {
            runs,
            index,
            protected: labels.label_ranges(index.text()),
        }
    }

    /// Flattened text
    pub fn text(&self) -> &'a str {
        self.index.text()
    }

    pub fn runs(&self) -> &'a [Run] {
        self.runs
    }

    pub fn index(&self) -> &'a RunIndex {
        self.index
    }

    /// Whether `[start, end)` touches an already written neutral label.
    ///
    /// An insertion point is protected only when strictly inside a label.
    pub fn is_protected(&self, start: usize, end: usize) -> bool {
        self.protected.iter().any(|&(ps, pe)| {
            if start == end {
                ps < start && start < pe
            } else {
                start < pe && ps < end
            }
        })
    }

    /// Character offset for a byte offset in the flattened text
    pub fn char_at(&self, byte: usize) -> usize {
        char_offset(self.text(), byte)
    }
}

/// Priority and registration index stamped onto a detector's matches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub priority: i32,
    pub index: usize,
}

impl Slot {
    pub fn span(&self, kind: MatchKind, start: usize, end: usize) -> Match {
        Match::new(kind, start, end, self.priority, self.index)
    }

    pub fn insertion(&self, kind: MatchKind, at: usize) -> Match {
        Match::insertion(kind, at, self.priority, self.index)
    }
}

/// Capability shared by all detectors
pub trait Detector: Send + Sync {
    /// Stable detector name (used in logs)
    fn name(&self) -> &str;

    /// Scan one paragraph; an empty result means nothing to fill
    fn detect(&self, view: &ParagraphView<'_>, slot: Slot) -> Vec<Match>;
}

/// Built-in detectors, listed in registration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorName {
    Underline,
    RepeatedCharacter,
    Custom,
    ColonFieldWithContent,
    ColonField,
}

impl DetectorName {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectorName::Underline => "underline",
            DetectorName::RepeatedCharacter => "repeated_character",
            DetectorName::Custom => "custom",
            DetectorName::ColonFieldWithContent => "colon_field_with_content",
            DetectorName::ColonField => "colon_field",
        }
    }
}

/// A user-supplied named regex
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomPattern {
    pub name: String,
    pub pattern: String,

    /// Overrides the shared custom priority
    pub priority: Option<i32>,
}

/// Per-detector priorities (higher wins)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Priorities {
    #[serde(default = "default_underline_priority")]
    pub underline: i32,
    #[serde(default = "default_repeated_priority")]
    pub repeated_character: i32,
    #[serde(default = "default_custom_priority")]
    pub custom: i32,
    #[serde(default = "default_with_content_priority")]
    pub colon_field_with_content: i32,
    #[serde(default = "default_colon_priority")]
    pub colon_field: i32,
}

fn default_underline_priority() -> i32 {
    40
}
fn default_repeated_priority() -> i32 {
    30
}
fn default_custom_priority() -> i32 {
    25
}
fn default_with_content_priority() -> i32 {
    20
}
fn default_colon_priority() -> i32 {
    10
}

impl Default for Priorities {
    fn default() -> Self {
        Self {
            underline: default_underline_priority(),
            repeated_character: default_repeated_priority(),
            custom: default_custom_priority(),
            colon_field_with_content: default_with_content_priority(),
            colon_field: default_colon_priority(),
        }
    }
}

impl Priorities {
    fn of(&self, name: DetectorName) -> i32 {
        match name {
            DetectorName::Underline => self.underline,
            DetectorName::RepeatedCharacter => self.repeated_character,
            DetectorName::Custom => self.custom,
            DetectorName::ColonFieldWithContent => self.colon_field_with_content,
            DetectorName::ColonField => self.colon_field,
        }
    }
}

/// Detector settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Enabled detectors in registration order
    #[serde(default = "default_order")]
    pub detectors: Vec<DetectorName>,

    /// Filler alphabets for the repeated-character detector
    #[serde(default = "default_fillers")]
    pub fillers: Vec<FillerAlphabet>,

    /// Minimum run length when an alphabet does not set its own
    #[serde(default = "default_min_repetition")]
    pub min_repetition: usize,

    /// Characters accepted as a field colon
    #[serde(default = "default_colons")]
    pub colons: String,

    #[serde(default)]
    pub custom_patterns: Vec<CustomPattern>,

    #[serde(default)]
    pub priorities: Priorities,
}

fn default_order() -> Vec<DetectorName> {
    vec![
        DetectorName::Underline,
        DetectorName::RepeatedCharacter,
        DetectorName::Custom,
        DetectorName::ColonFieldWithContent,
        DetectorName::ColonField,
    ]
}

fn default_fillers() -> Vec<FillerAlphabet> {
    vec![FillerAlphabet::new("_＿"), FillerAlphabet::new("xX")]
}

fn default_min_repetition() -> usize {
    3
}

fn default_colons() -> String {
    "：:".to_string()
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            detectors: default_order(),
            fillers: default_fillers(),
            min_repetition: default_min_repetition(),
            colons: default_colons(),
            custom_patterns: Vec::new(),
            priorities: Priorities::default(),
        }
    }
}

struct Registered {
    detector: Box<dyn Detector>,
    slot: Slot,
}

/// Ordered detector registry
pub struct DetectorSet {
    entries: Vec<Registered>,
}

impl std::fmt::Debug for DetectorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| (e.detector.name(), e.slot.priority)))
            .finish()
    }
}

impl Default for DetectorSet {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorSet {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append a detector; its registration index is its position
    pub fn register(&mut self, detector: Box<dyn Detector>, priority: i32) -> &mut Self {
        let slot = Slot {
            priority,
            index: self.entries.len(),
        };
        self.entries.push(Registered { detector, slot });
        self
    }

    /// Build the configured detectors, validating the configuration
    pub fn from_config(
        config: &DetectionConfig,
        labels: &LabelFormat,
    ) -> Result<Self, DetectionError> {
        labels.validate()?;

        let mut set = Self::new();
        let mut seen = Vec::new();

        for &name in &config.detectors {
            if seen.contains(&name) {
                return Err(DetectionError::DuplicateDetector(name.as_str().to_string()));
            }
            seen.push(name);

            let priority = config.priorities.of(name);
            match name {
                DetectorName::Underline => {
                    set.register(Box::new(UnderlineRunDetector::new()), priority);
                }
                DetectorName::RepeatedCharacter => {
                    let detector =
                        RepeatedCharacterDetector::new(&config.fillers, config.min_repetition)?;
                    set.register(Box::new(detector), priority);
                }
                DetectorName::Custom => {
                    for pattern in &config.custom_patterns {
                        let detector = CustomPatternDetector::new(pattern)?;
                        set.register(Box::new(detector), pattern.priority.unwrap_or(priority));
                    }
                }
                DetectorName::ColonFieldWithContent => {
                    let detector = ColonFieldWithContentDetector::new(
                        &config.colons,
                        &config.fillers,
                        config.min_repetition,
                        labels.open(),
                    )?;
                    set.register(Box::new(detector), priority);
                }
                DetectorName::ColonField => {
                    set.register(Box::new(ColonFieldDetector::new(&config.colons)?), priority);
                }
            }
        }

        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Detector names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.detector.name()).collect()
    }

    /// Run every detector over the view and collect all candidates
    pub fn detect_all(&self, view: &ParagraphView<'_>) -> Vec<Match> {
        let mut candidates = Vec::new();
        for entry in &self.entries {
            let found = entry.detector.detect(view, entry.slot);
            if !found.is_empty() {
                tracing::trace!(detector = entry.detector.name(), count = found.len(), "candidates");
            }
            candidates.extend(found);
        }
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> LabelFormat {
        LabelFormat::default()
    }

    #[test]
    fn test_default_registration_order() {
        let set = DetectorSet::from_config(&DetectionConfig::default(), &labels()).unwrap();
        assert_eq!(
            set.names(),
            vec![
                "underline",
                "repeated_character",
                "colon_field_with_content",
                "colon_field"
            ]
        );
    }

    #[test]
    fn test_custom_patterns_registered_in_place() {
        let config = DetectionConfig {
            custom_patterns: vec![CustomPattern {
                name: "bracket".to_string(),
                pattern: r"\[\s*\]".to_string(),
                priority: None,
            }],
            ..Default::default()
        };
        let set = DetectorSet::from_config(&config, &labels()).unwrap();
        assert_eq!(set.names()[2], "bracket");
        assert_eq!(set.len(), 5);
    }

    #[test]
    fn test_invalid_pattern_is_fatal() {
        let config = DetectionConfig {
            custom_patterns: vec![CustomPattern {
                name: "broken".to_string(),
                pattern: "(unclosed".to_string(),
                priority: None,
            }],
            ..Default::default()
        };
        let err = DetectorSet::from_config(&config, &labels()).unwrap_err();
        assert!(matches!(err, DetectionError::InvalidPattern { ref name, .. } if name == "broken"));
    }

    #[test]
    fn test_empty_matching_pattern_is_fatal() {
        for pattern in ["_*", "(?:x{3})?", "^"] {
            let config = DetectionConfig {
                custom_patterns: vec![CustomPattern {
                    name: "blank".to_string(),
                    pattern: pattern.to_string(),
                    priority: None,
                }],
                ..Default::default()
            };
            let err = DetectorSet::from_config(&config, &labels()).unwrap_err();
            assert!(
                matches!(err, DetectionError::EmptyMatch { ref name } if name == "blank"),
                "accepted {}",
                pattern
            );
        }
    }

    #[test]
    fn test_duplicate_detector_rejected() {
        let config = DetectionConfig {
            detectors: vec![DetectorName::ColonField, DetectorName::ColonField],
            ..Default::default()
        };
        assert!(matches!(
            DetectorSet::from_config(&config, &labels()),
            Err(DetectionError::DuplicateDetector(_))
        ));
    }

    #[test]
    fn test_config_yaml_defaults() {
        let config: DetectionConfig = serde_yaml::from_str("min_repetition: 5").unwrap();
        assert_eq!(config.min_repetition, 5);
        assert_eq!(config.detectors, default_order());
        assert_eq!(config.priorities.underline, 40);
    }

    #[test]
    fn test_view_protects_labels() {
        let runs = vec![Run::new("姓名：{{姓名}}")];
        let index = RunIndex::build(&runs);
        let view = ParagraphView::new(&runs, &index, &labels());
        assert!(view.is_protected(4, 6));
        assert!(view.is_protected(5, 5));
        assert!(!view.is_protected(3, 3));
        assert!(!view.is_protected(0, 3));
    }
}
