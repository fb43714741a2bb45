use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Optional TOML config file. Values set here override the CLI defaults.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    pub library_db_path: Option<String>,
    pub user_db_path: Option<String>,
    pub port: Option<u16>,
    pub logging_level: Option<String>,
    pub requests_logging: Option<String>,
    pub recent_reviews_limit: Option<usize>,

    pub search: Option<SearchConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SearchConfig {
    /// Search engine to use: "fts5", "noop"
    pub engine: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_leaves_missing_fields_unset() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "port = 9090\n\n[search]\nengine = \"noop\"\n"
        )
        .unwrap();

        let config = FileConfig::load(file.path()).unwrap();
        assert_eq!(config.port, Some(9090));
        assert_eq!(config.search.unwrap().engine.as_deref(), Some("noop"));
        assert!(config.library_db_path.is_none());
        assert!(config.logging_level.is_none());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(FileConfig::load(Path::new("/nonexistent/config.toml")).is_err());
    }
}
