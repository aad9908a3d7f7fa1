use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::db::Database;
use crate::error::MvqError;
use crate::output::table::Layout;
use crate::query::Quoting;

pub const DB_ENV: &str = "MVQ_DB";
pub const DATA_DIR_ENV: &str = "MVQ_DATA_DIR";

/// Width of the column-name field in record layout.
pub const DEFAULT_LABEL_WIDTH: usize = 25;

#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct LoaderConfig {
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct QueryConfig {
    pub quoting: Option<Quoting>,
}

#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct OutputConfig {
    pub label_width: Option<usize>,
    pub layout: Option<Layout>,
}

/// Top-level mvq config file structure.
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct MvqConfig {
    pub database: Option<DatabaseConfig>,
    pub loader: Option<LoaderConfig>,
    pub query: Option<QueryConfig>,
    pub output: Option<OutputConfig>,
}

impl MvqConfig {
    /// Load config from ~/.mvq/config.toml. Returns default if file doesn't exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(MvqConfig::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: MvqConfig = toml::from_str(content)
            .map_err(|e| MvqError::Config(e.message().to_string()))
            .with_context(|| "Failed to parse config.toml")?;
        if config.output.as_ref().and_then(|o| o.label_width) == Some(0) {
            return Err(MvqError::Config("output.label_width must be at least 1".into()).into());
        }
        Ok(config)
    }

    /// Database path: CLI flag > MVQ_DB > config > ~/.mvq/mvq.db
    pub fn db_path(&self, cli_flag: Option<&Path>) -> Result<PathBuf> {
        let configured = self.database.as_ref().and_then(|d| d.path.as_deref());
        match resolve_path(cli_flag, DB_ENV, configured) {
            Some(p) => Ok(p),
            None => Database::default_db_path(),
        }
    }

    /// Data directory: CLI flag > MVQ_DATA_DIR > config > ./data
    pub fn data_dir(&self, cli_flag: Option<&Path>) -> PathBuf {
        let configured = self.loader.as_ref().and_then(|l| l.data_dir.as_deref());
        resolve_path(cli_flag, DATA_DIR_ENV, configured).unwrap_or_else(|| PathBuf::from("data"))
    }

    pub fn quoting(&self) -> Quoting {
        self.query
            .as_ref()
            .and_then(|q| q.quoting)
            .unwrap_or_default()
    }

    pub fn label_width(&self) -> usize {
        self.output
            .as_ref()
            .and_then(|o| o.label_width)
            .unwrap_or(DEFAULT_LABEL_WIDTH)
    }

    pub fn layout(&self) -> Layout {
        self.output
            .as_ref()
            .and_then(|o| o.layout)
            .unwrap_or_default()
    }

    /// Effective settings, one per line.
    pub fn display(&self) -> String {
        let or_default = |p: Option<&PathBuf>| {
            p.map(|p| p.display().to_string())
                .unwrap_or_else(|| "(default)".to_string())
        };
        let mut lines = Vec::new();
        lines.push("[database]".to_string());
        lines.push(format!(
            "  path = {}",
            or_default(self.database.as_ref().and_then(|d| d.path.as_ref()))
        ));
        lines.push("[loader]".to_string());
        lines.push(format!(
            "  data_dir = {}",
            or_default(self.loader.as_ref().and_then(|l| l.data_dir.as_ref()))
        ));
        lines.push("[query]".to_string());
        lines.push(format!("  quoting = {:?}", self.quoting()));
        lines.push("[output]".to_string());
        lines.push(format!("  label_width = {}", self.label_width()));
        lines.push(format!("  layout = {:?}", self.layout()));
        lines.join("\n")
    }
}

/// Resolve a path through the chain: CLI flag > env var > config value.
pub fn resolve_path(
    cli_flag: Option<&Path>,
    env_var_name: &str,
    configured: Option<&Path>,
) -> Option<PathBuf> {
    if let Some(p) = cli_flag {
        if !p.as_os_str().is_empty() {
            return Some(p.to_path_buf());
        }
    }

    if let Ok(val) = std::env::var(env_var_name) {
        if !val.is_empty() {
            return Some(PathBuf::from(val));
        }
    }

    configured
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

/// Path to the config file: ~/.mvq/config.toml
pub fn config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".mvq").join("config.toml"))
}

/// Default config template content.
pub fn default_config_template() -> &'static str {
    r#"# ~/.mvq/config.toml
# Path resolution order: CLI flag > env var (MVQ_DB, MVQ_DATA_DIR) > this file > default

[database]
# path = "/home/you/.mvq/mvq.db"

[loader]
# Directory holding movies.dat, movie_genres.dat, ...
# data_dir = "data"

[query]
# "escaped" doubles single quotes in values; "verbatim" inserts them untouched
# quoting = "escaped"

[output]
# label_width = 25
# layout = "records"   # or "table"
"#
}

/// Create the default config file if it doesn't already exist.
pub fn init_config() -> Result<bool> {
    let path = config_path()?;
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, default_config_template())?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNSET_ENV: &str = "MVQ_TEST_UNSET_VARIABLE";

    #[test]
    fn test_template_parses_to_defaults() {
        let config = MvqConfig::parse(default_config_template()).unwrap();
        assert_eq!(config.quoting(), Quoting::Escaped);
        assert_eq!(config.label_width(), DEFAULT_LABEL_WIDTH);
        assert_eq!(config.layout(), Layout::Records);
    }

    #[test]
    fn test_parse_all_sections() {
        let config = MvqConfig::parse(
            r#"
            [database]
            path = "/tmp/movies.db"
            [loader]
            data_dir = "/srv/dumps"
            [query]
            quoting = "verbatim"
            [output]
            label_width = 30
            layout = "table"
            "#,
        )
        .unwrap();
        assert_eq!(config.quoting(), Quoting::Verbatim);
        assert_eq!(config.label_width(), 30);
        assert_eq!(config.layout(), Layout::Table);
        assert!(config.display().contains("/srv/dumps"));
    }

    #[test]
    fn test_resolve_prefers_flag_over_config() {
        let flag = PathBuf::from("/from/flag");
        let configured = PathBuf::from("/from/config");
        assert_eq!(
            resolve_path(Some(&flag), UNSET_ENV, Some(&configured)),
            Some(flag)
        );
        assert_eq!(
            resolve_path(None, UNSET_ENV, Some(&configured)),
            Some(configured)
        );
        assert_eq!(resolve_path(None, UNSET_ENV, None), None);
    }

    #[test]
    fn test_missing_file_gives_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = MvqConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert!(config.database.is_none());
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(MvqConfig::parse("[output]\nlabel_width = \"wide\"").is_err());
        let err = MvqConfig::parse("[output]\nlabel_width = 0").unwrap_err();
        assert!(err.downcast_ref::<MvqError>().is_some());
    }
}
