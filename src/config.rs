//! Run configuration passed explicitly into every stage.

use std::fmt;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Dataset granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Level {
    #[default]
    Hour,
    Day,
}

impl Level {
    pub const ALL: [Level; 2] = [Level::Hour, Level::Day];

    /// Parses a selector strictly; `None` for anything outside `{hour, day}`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hour" => Some(Level::Hour),
            "day" => Some(Level::Day),
            _ => None,
        }
    }

    /// Parses a selector, falling back to [`Level::Hour`] with a warning.
    pub fn from_selector(s: &str) -> Self {
        Self::parse(s).unwrap_or_else(|| {
            warn!(level = s, "Level not recognized, falling back to 'hour'");
            Level::Hour
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Hour => "hour",
            Level::Day => "day",
        }
    }

    /// File name of the CSV for this level inside the archive and the cache.
    pub fn csv_name(&self) -> String {
        format!("{}.csv", self.as_str())
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hyper-parameters of the two baselines.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub ridge_alpha: f64,
    pub forest_trees: usize,
    pub forest_max_depth: Option<usize>,
    pub seed: u64,
    pub train_fraction: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            ridge_alpha: 1.0,
            forest_trees: 200,
            forest_max_depth: None,
            seed: 42,
            train_fraction: 0.8,
        }
    }
}

/// Everything a pipeline run needs to know about its environment.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub level: Level,
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub target: String,
    pub date_column: String,
    pub category_column: String,
    /// Columns never used as model features besides the target.
    pub excluded_features: Vec<String>,
    pub model: ModelConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            level: Level::Hour,
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("outputs"),
            reports_dir: PathBuf::from("reports"),
            target: "cnt".to_string(),
            date_column: "dteday".to_string(),
            category_column: "season".to_string(),
            excluded_features: ["casual", "registered", "instant", "dteday"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            model: ModelConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Roots all data, output and report directories under `root`.
    pub fn rooted_at(mut self, root: &Path) -> Self {
        self.data_dir = root.join("data");
        self.output_dir = root.join("outputs");
        self.reports_dir = root.join("reports");
        self
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.data_dir.join("raw")
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.data_dir.join("processed")
    }

    pub fn processed_path(&self) -> PathBuf {
        self.processed_dir()
            .join(format!("{}_processed.csv", self.level))
    }

    pub fn report_path(&self) -> PathBuf {
        self.reports_dir.join("REPORT.md")
    }
}
