//! Configuration management for the deepsim CLI

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CliError, CliResult};

/// Global CLI configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Default logging level
    pub log_level: Option<String>,

    /// Trials to run when neither the network file nor the command line sets them
    pub default_trials: Option<usize>,

    /// User preferences
    pub preferences: UserPreferences,
}

/// Output preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreferences {
    /// Pretty-print JSON results
    pub pretty_json: bool,

    /// Print a per-trial summary after a run
    pub show_summary: bool,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            pretty_json: true,
            show_summary: true,
        }
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            default_trials: None,
            preferences: UserPreferences::default(),
        }
    }
}

impl CliConfig {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> CliResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content).map_err(|e| CliError::config(format!("Invalid config file: {}", e)))
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: &Path) -> CliResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| CliError::config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> CliResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CliError::config("Could not determine config directory"))?;
        Ok(config_dir.join("deepsim").join("config.toml"))
    }

    /// Load from an explicit path, else from the default location
    pub fn resolve(path: Option<&Path>) -> CliResult<Self> {
        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(CliError::missing_resource(format!(
                        "config file {}",
                        path.display()
                    )));
                }
                Self::load_from_file(path)
            }
            None => match Self::default_config_path() {
                Ok(path) => Self::load_from_file(&path),
                Err(_) => Ok(Self::default()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = CliConfig {
            log_level: Some("debug".to_string()),
            default_trials: Some(7),
            preferences: UserPreferences {
                pretty_json: false,
                show_summary: true,
            },
        };
        config.save_to_file(&path).unwrap();
        assert_eq!(CliConfig::load_from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_and_partial_config() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("none.toml");
        assert_eq!(CliConfig::load_from_file(&missing).unwrap(), CliConfig::default());
        assert!(matches!(
            CliConfig::resolve(Some(&missing)),
            Err(CliError::MissingResource(_))
        ));

        let partial = dir.path().join("partial.toml");
        std::fs::write(&partial, "default_trials = 3\n").unwrap();
        let config = CliConfig::resolve(Some(&partial)).unwrap();
        assert_eq!(config.default_trials, Some(3));
        assert!(config.preferences.pretty_json);
    }
}
