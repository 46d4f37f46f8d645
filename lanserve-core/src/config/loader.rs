//! Configuration loader

use crate::config::ServeConfig;
use crate::error::{Error, Result};
use std::path::Path;

/// Configuration loader for the supported formats
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file and fix the serving root to the
    /// directory containing it
    ///
    /// A missing file is not an error: defaults apply, rooted at the
    /// parent directory of the given path. The root must exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<ServeConfig> {
        let path = path.as_ref();

        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            match ext {
                "json" => Self::from_json(&content)?,
                "toml" | "" => Self::from_toml(&content)?,
                _ => return Err(Error::Config(format!("Unknown config format: {}", ext))),
            }
        } else {
            ServeConfig::default()
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        config.root = dir
            .canonicalize()
            .map_err(|e| Error::Config(format!("Invalid serving root {}: {}", dir.display(), e)))?;

        Ok(config)
    }

    /// Parse JSON configuration
    pub fn from_json(content: &str) -> Result<ServeConfig> {
        serde_json::from_str(content).map_err(|e| Error::Config(format!("Invalid JSON: {}", e)))
    }

    /// Parse TOML configuration
    pub fn from_toml(content: &str) -> Result<ServeConfig> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_loading() {
        let config = ConfigLoader::from_toml("port = 9000\n").unwrap();
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn test_json_loading() {
        let config = ConfigLoader::from_json(r#"{"port": 9000}"#).unwrap();
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(ConfigLoader::from_toml("port = \"not a number\"").is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults_and_parent_root() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigLoader::load(dir.path().join("lanserve.toml")).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.root, dir.path().canonicalize().unwrap());
    }

    #[test]
    fn test_root_is_config_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lanserve.toml");
        std::fs::write(&path, "port = 9000\n").unwrap();
        let config = ConfigLoader::load(&path).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.root, dir.path().canonicalize().unwrap());
        assert_eq!(config.log_path(), config.root.join("server.log"));
    }
}
