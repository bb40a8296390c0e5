//! Pipeline configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file at all) gives a
//! working configuration that reads `data/` and writes `processed/`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use flowlab_core::data::ColumnMapping;
use flowlab_core::indicators::{WindowSet, DEFAULT_WINDOWS};
use flowlab_core::ledger::MissingPolicy;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// File names of the emitted artifacts, relative to `output_dir`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactNames {
    pub ledger: String,
    pub summary: String,
    pub entities: String,
    pub manifest: String,
    /// Columnar copy of the enriched ledger. Not written when `None`.
    pub parquet: Option<String>,
}

impl Default for ArtifactNames {
    fn default() -> Self {
        Self {
            ledger: "all_data_clean.csv".into(),
            summary: "by_stock_summary.csv".into(),
            entities: "stocks.txt".into(),
            manifest: "manifest.json".into(),
            parquet: None,
        }
    }
}

impl ArtifactNames {
    fn all(&self) -> impl Iterator<Item = &str> {
        [
            self.ledger.as_str(),
            self.summary.as_str(),
            self.entities.as_str(),
            self.manifest.as_str(),
        ]
        .into_iter()
        .chain(self.parquet.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Literal prefix before the `YYYYMMDD` stem of each raw export.
    pub file_prefix: String,
    /// Accepted extensions, without the dot, matched case-insensitively.
    pub extensions: Vec<String>,
    /// Moving-average window sizes; deduplicated and sorted by [`Self::window_set`].
    pub windows: Vec<usize>,
    pub missing_values: MissingPolicy,
    pub columns: ColumnMapping,
    pub artifacts: ArtifactNames,
    /// Optional `영문명,한글명` CSV used for display names.
    pub name_map: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("processed"),
            file_prefix: "re".into(),
            extensions: vec!["xls".into(), "xlsx".into()],
            windows: DEFAULT_WINDOWS.to_vec(),
            missing_values: MissingPolicy::default(),
            columns: ColumnMapping::default(),
            artifacts: ArtifactNames::default(),
            name_map: None,
        }
    }
}

impl PipelineConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.window_set()?;
        if self.columns.has_overlap() {
            return Err(ConfigError::Invalid(format!(
                "column positions must be distinct (entity={}, buy={}, sell={})",
                self.columns.entity, self.columns.buy, self.columns.sell
            )));
        }
        if self.extensions.iter().all(|e| e.trim().is_empty()) {
            return Err(ConfigError::Invalid("extensions must not be empty".into()));
        }
        let mut names: Vec<&str> = self.artifacts.all().collect();
        if names.iter().any(|n| n.trim().is_empty()) {
            return Err(ConfigError::Invalid("artifact names must not be empty".into()));
        }
        names.sort_unstable();
        if names.windows(2).any(|pair| pair[0] == pair[1]) {
            return Err(ConfigError::Invalid("artifact names must be distinct".into()));
        }
        Ok(())
    }

    /// Extensions normalised for matching: trimmed, no leading dot, lowercase.
    pub fn normalized_extensions(&self) -> Vec<String> {
        self.extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect()
    }

    /// Validated window set.
    pub fn window_set(&self) -> Result<WindowSet, ConfigError> {
        let windows = WindowSet::new(self.windows.iter().copied())
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if windows.is_empty() {
            return Err(ConfigError::Invalid("at least one window is required".into()));
        }
        Ok(windows)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.output_dir.join(&self.artifacts.ledger)
    }
}
