//! Configuration for neutralfill.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (NEUTRALFILL_CONFIG, DASHSCOPE_API_KEY /
//!    OPENAI_API_KEY, DASHSCOPE_API_BASE / OPENAI_API_BASE, LLM_MODEL_NAME)
//! 2. Config file (.neutralfill/config.yaml)
//! 3. Defaults
//!
//! Config file discovery:
//! - NEUTRALFILL_CONFIG names the file explicitly
//! - Otherwise the current directory and its parents are searched for
//!   .neutralfill/config.yaml
//! - Finally ~/.neutralfill/config.yaml
//!
//! The resolved configuration is loaded once by the CLI and passed down
//! explicitly.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::adapters::{ChatConfig, LabelSuggester};
use crate::core::{
    DetectionConfig, DetectionError, DetectionPipeline, LabelFormat, PipelineSettings, TableConfig,
};

/// Directory holding the config file
pub const CONFIG_DIR: &str = ".neutralfill";

/// Config file name inside `CONFIG_DIR`
pub const CONFIG_FILE: &str = "config.yaml";

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "NEUTRALFILL_CONFIG";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub llm: ChatConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub labels: LabelFormat,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub tables: TableConfig,
}

/// Configuration after file discovery and environment overrides
#[derive(Debug, Clone, Default)]
pub struct ResolvedConfig {
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub llm: ChatConfig,
    pub detection: DetectionConfig,
    pub labels: LabelFormat,
    pub pipeline: PipelineSettings,
    pub tables: TableConfig,
}

impl ResolvedConfig {
    fn from_file(config_file: Option<PathBuf>, file: ConfigFile) -> Self {
        Self {
            config_file,
            llm: file.llm,
            detection: file.detection,
            labels: file.labels,
            pipeline: file.pipeline,
            tables: file.tables,
        }
    }

    /// Build the detection pipeline described by this configuration
    pub fn build_pipeline(
        &self,
        suggester: Arc<dyn LabelSuggester>,
    ) -> Result<DetectionPipeline, DetectionError> {
        Ok(DetectionPipeline::new(
            &self.detection,
            self.labels.clone(),
            &self.pipeline,
            suggester,
        )?
        .with_tables(self.tables.clone()))
    }

    /// The file sections as YAML (API key omitted)
    pub fn to_yaml(&self) -> Result<String> {
        let file = ConfigFile {
            version: None,
            llm: self.llm.clone(),
            detection: self.detection.clone(),
            labels: self.labels.clone(),
            pipeline: self.pipeline.clone(),
            tables: self.tables.clone(),
        };
        serde_yaml::to_string(&file).context("Failed to serialize configuration")
    }
}

/// Find config file by searching `start` and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_DIR).join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Apply LLM environment overrides; `var` looks up one variable
fn apply_llm_env(llm: &mut ChatConfig, var: impl Fn(&str) -> Option<String>) {
    let first = |names: &[&str]| names.iter().find_map(|n| var(n).filter(|v| !v.is_empty()));

    if let Some(key) = first(&["DASHSCOPE_API_KEY", "OPENAI_API_KEY"]) {
        llm.api_key = Some(key);
    }
    if let Some(base) = first(&["DASHSCOPE_API_BASE", "OPENAI_API_BASE"]) {
        llm.api_base = base;
    }
    if let Some(model) = first(&["LLM_MODEL_NAME"]) {
        llm.model = model;
    }
}

/// User-level config file under the home directory
fn user_config_file(home: Option<&Path>) -> Option<PathBuf> {
    home.map(|h| h.join(CONFIG_DIR).join(CONFIG_FILE))
        .filter(|p| p.exists())
}

/// Resolve configuration starting the file search at `start`
fn resolve(
    start: &Path,
    home: Option<&Path>,
    var: impl Fn(&str) -> Option<String>,
) -> Result<ResolvedConfig> {
    let config_file = match var(CONFIG_ENV).filter(|v| !v.is_empty()) {
        Some(explicit) => {
            let path = PathBuf::from(explicit);
            if !path.exists() {
                anyhow::bail!("{} points to a missing file: {}", CONFIG_ENV, path.display());
            }
            Some(path)
        }
        None => find_config_file(start).or_else(|| user_config_file(home)),
    };

    let file = match config_file {
        Some(ref path) => load_config_file(path)?,
        None => ConfigFile::default(),
    };

    let mut config = ResolvedConfig::from_file(config_file, file);
    apply_llm_env(&mut config.llm, var);
    Ok(config)
}

/// Load configuration from all sources
pub fn load_config() -> Result<ResolvedConfig> {
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    let home = dirs::home_dir();
    resolve(&cwd, home.as_deref(), |name| std::env::var(name).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_config(root: &Path, body: &str) -> PathBuf {
        let dir = root.join(CONFIG_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(CONFIG_FILE);
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "{}", body).unwrap();
        path
    }

    #[test]
    fn test_defaults_without_file() {
        let temp = TempDir::new().unwrap();
        let config = resolve(temp.path(), None, no_env).unwrap();

        assert!(config.config_file.is_none());
        assert_eq!(config.pipeline.context_window, 100);
        assert_eq!(config.pipeline.max_concurrency, 8);
        assert_eq!(config.pipeline.lookup_timeout_seconds, 30);
        assert_eq!(config.labels.sentinel, "???");
        assert!(config.tables.fill_empty_cells);
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let path = write_config(
            temp.path(),
            r#"
version: "1.0"
llm:
  model: qwen-plus
detection:
  min_repetition: 4
  colons: "："
  custom_patterns:
    - name: bracket
      pattern: '\[\s+\]'
labels:
  highlight_all: true
pipeline:
  context_window: 40
tables:
  fill_empty_cells: false
"#,
        );

        let file = load_config_file(&path).unwrap();
        assert_eq!(file.version.as_deref(), Some("1.0"));
        assert_eq!(file.llm.model, "qwen-plus");
        assert_eq!(file.detection.min_repetition, 4);
        assert_eq!(file.detection.custom_patterns[0].name, "bracket");
        assert!(file.labels.highlight_all);
        assert_eq!(file.labels.open, "{{");
        assert_eq!(file.pipeline.context_window, 40);
        assert_eq!(file.pipeline.max_concurrency, 8);
        assert!(!file.tables.fill_empty_cells);
    }

    #[test]
    fn test_discovery_walks_up() {
        let temp = TempDir::new().unwrap();
        let path = write_config(temp.path(), "pipeline:\n  max_concurrency: 2");
        let nested = temp.path().join("forms").join("2024");
        std::fs::create_dir_all(&nested).unwrap();

        let config = resolve(&nested, None, no_env).unwrap();
        assert_eq!(config.config_file, Some(path));
        assert_eq!(config.pipeline.max_concurrency, 2);
    }

    #[test]
    fn test_env_overrides() {
        let temp = TempDir::new().unwrap();
        let explicit = temp.path().join("custom.yaml");
        std::fs::write(&explicit, "llm:\n  model: from-file\n  api_base: http://file").unwrap();

        let env: HashMap<&str, String> = [
            (CONFIG_ENV, explicit.display().to_string()),
            ("OPENAI_API_KEY", "sk-openai".to_string()),
            ("OPENAI_API_BASE", "http://openai".to_string()),
            ("DASHSCOPE_API_BASE", "http://dashscope".to_string()),
        ]
        .into_iter()
        .collect();

        let config = resolve(temp.path(), None, |k| env.get(k).cloned()).unwrap();
        assert_eq!(config.config_file, Some(explicit));
        assert_eq!(config.llm.model, "from-file");
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-openai"));
        assert_eq!(config.llm.api_base, "http://dashscope");
    }

    #[test]
    fn test_home_fallback() {
        let project = TempDir::new().unwrap();
        let home = TempDir::new().unwrap();
        let path = write_config(home.path(), "labels:\n  sentinel: TBD");

        let config = resolve(project.path(), Some(home.path()), no_env).unwrap();
        assert_eq!(config.config_file, Some(path));
        assert_eq!(config.labels.sentinel, "TBD");
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.yaml").display().to_string();
        let result = resolve(temp.path(), None, |k| (k == CONFIG_ENV).then(|| missing.clone()));
        assert!(result.is_err());
    }

    #[test]
    fn test_yaml_dump_hides_api_key() {
        let mut config = ResolvedConfig::default();
        config.llm.api_key = Some("sk-secret".to_string());
        let yaml = config.to_yaml().unwrap();
        assert!(!yaml.contains("sk-secret"));
        assert!(yaml.contains("context_window: 100"));
    }
}
