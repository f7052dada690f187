use crate::transform::{
    Limits, HEATMAP_LIMIT, PIPELINE_COLUMNS, PREPROCESSING_ROWS, SCATTER_LIMIT_CHART,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const BASE_URL_ENV: &str = "NSL_DASH_BASE_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    pub base_url: String,
    /// Paired scatter samples shown in both the chart and the table.
    pub scatter_limit: usize,
    pub heatmap_limit: usize,
    pub preprocessing_rows: usize,
    pub pipeline_columns: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            scatter_limit: SCATTER_LIMIT_CHART,
            heatmap_limit: HEATMAP_LIMIT,
            preprocessing_rows: PREPROCESSING_ROWS,
            pipeline_columns: PIPELINE_COLUMNS,
        }
    }
}

impl DashboardConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Defaults, then `path` if given, then the environment.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        let config = config.with_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(BASE_URL_ENV).filter(|url| !url.trim().is_empty()) {
            self.base_url = url;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.base_url.trim();
        if url.is_empty() {
            return Err(ConfigError::Invalid("base_url is empty".into()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "base_url must start with http:// or https://, got '{url}'"
            )));
        }
        for (name, value) in [
            ("scatter_limit", self.scatter_limit),
            ("heatmap_limit", self.heatmap_limit),
            ("preprocessing_rows", self.preprocessing_rows),
            ("pipeline_columns", self.pipeline_columns),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be at least 1")));
            }
        }
        Ok(())
    }

    pub fn limits(&self) -> Limits {
        Limits {
            heatmap: self.heatmap_limit,
            scatter: self.scatter_limit,
            preprocessing_rows: self.preprocessing_rows,
            pipeline_columns: self.pipeline_columns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::SCATTER_LIMIT_TABLE;
    use std::io::Write;

    #[test]
    fn defaults_match_display_limits() {
        let config = DashboardConfig::default();
        assert_eq!(config.base_url, "http://127.0.0.1:8000");
        assert_eq!(config.limits(), Limits::default());
        config.validate().unwrap();
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = DashboardConfig::from_toml_str(&format!(
            "scatter_limit = {SCATTER_LIMIT_TABLE}\nbase_url = \"http://ids.local:9000/\"\n"
        ))
        .unwrap();
        assert_eq!(config.limits().scatter, 20);
        assert_eq!(config.heatmap_limit, 9);
        assert_eq!(config.base_url, "http://ids.local:9000/");
    }

    #[test]
    fn rejects_zero_limits_and_unknown_keys() {
        let err = DashboardConfig::from_toml_str("heatmap_limit = 0").unwrap_err();
        assert!(err.to_string().contains("heatmap_limit"));
        assert!(matches!(
            DashboardConfig::from_toml_str("scatter_k = 5"),
            Err(ConfigError::Parse(_))
        ));
        assert!(DashboardConfig::from_toml_str("base_url = \"ftp://x\"").is_err());
    }

    #[test]
    fn env_overrides_base_url() {
        let config = DashboardConfig::default().with_env(|key| {
            (key == BASE_URL_ENV).then(|| "https://nsl.example.org".to_string())
        });
        assert_eq!(config.base_url, "https://nsl.example.org");
        let config = DashboardConfig::default().with_env(|_| Some("  ".to_string()));
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "preprocessing_rows = 5").unwrap();
        let config = DashboardConfig::load(file.path()).unwrap();
        assert_eq!(config.limits().preprocessing_rows, 5);
        let missing = DashboardConfig::load(Path::new("/nonexistent/nsl.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }
}
