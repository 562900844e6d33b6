//! Configuration management
//!
//! Application settings live in a TOML file; rules and variables are YAML
//! resources below the resources directory.

mod loader;
pub mod resource;
mod schema;
pub mod validation;

pub use loader::{ConfigLoader, LoadedConfig};
pub use resource::{API_VERSION, ObjectMeta, Resource};
pub use schema::{Config, GeneralConfig};
pub use validation::{ConfigIssue, ConfigValidator, Severity, ValidatedConfig};

use anyhow::{Context, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::rules::RuleEngine;

impl Config {
    /// Load configuration from a file or default location
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path
            .map(PathBuf::from)
            .or_else(Self::default_path)
            .context("Could not determine config path")?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config from {}", config_path.display()))?;

            let config: Config = toml::from_str(&content).with_context(|| {
                format!("Failed to parse config from {}", config_path.display())
            })?;

            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Get the default config file path
    /// Uses the platform config directory (via dirs::config_dir), falling back to ~/.config
    pub fn default_path() -> Option<PathBuf> {
        Self::config_base().map(|d| d.join("config.toml"))
    }

    fn config_base() -> Option<PathBuf> {
        let config_base =
            dirs::config_dir().or_else(|| dirs::home_dir().map(|d| d.join(".config")))?;
        Some(config_base.join("paporg"))
    }

    /// Directory holding the YAML resources
    pub fn resources_dir(&self) -> Option<PathBuf> {
        match &self.general.resources_dir {
            Some(dir) => Some(expand_path(dir)),
            None => Self::config_base().map(|d| d.join("resources")),
        }
    }

    /// Load, validate and assemble the rule engine from the resources
    /// directory. Invalid resources are skipped and reported as issues.
    pub fn build_engine(&self) -> Result<(RuleEngine, Vec<ConfigIssue>)> {
        let dir = self
            .resources_dir()
            .context("Could not determine resources directory")?;
        build_engine_from(&dir, &self.unsorted)
    }
}

/// Load and validate the resources below `dir`
pub fn build_engine_from(
    dir: &Path,
    fallback: &crate::rules::FallbackOutput,
) -> Result<(RuleEngine, Vec<ConfigIssue>)> {
    let loaded = ConfigLoader::new(dir).load()?;
    Ok(validation::validate(loaded).into_engine(fallback.clone()))
}

/// Expand ~ and environment variables ($VAR, ${VAR}) in a path
pub fn expand_path(path: &Path) -> PathBuf {
    static ENV_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\$\{([^}]+)\}|\$([A-Za-z_][A-Za-z0-9_]*)").expect("invalid env regex")
    });

    let raw = path.to_string_lossy();
    let home = dirs::home_dir().map(|h| h.to_string_lossy().into_owned());

    let with_home = match (raw.strip_prefix('~'), home) {
        (Some(rest), Some(home)) if rest.is_empty() || rest.starts_with('/') => {
            format!("{home}{rest}")
        }
        _ => raw.to_string(),
    };

    let expanded = ENV_RE.replace_all(&with_home, |caps: &regex::Captures| {
        let name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map_or("", |m| m.as_str());
        // Unset variables are left as written
        std::env::var(name).unwrap_or_else(|_| caps[0].to_string())
    });

    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_home() {
        let expanded = expand_path(Path::new("~/paporg"));
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.ends_with("paporg"));

        assert_eq!(expand_path(Path::new("~user/x")), PathBuf::from("~user/x"));
    }

    #[test]
    fn test_expand_unset_variable_kept() {
        let expanded = expand_path(Path::new("/data/$PAPORG_SURELY_UNSET_VAR/x"));
        assert_eq!(expanded, PathBuf::from("/data/$PAPORG_SURELY_UNSET_VAR/x"));
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("none.toml"))).unwrap();
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_resources_dir_override() {
        let mut config = Config::default();
        config.general.resources_dir = Some(PathBuf::from("/srv/paporg"));
        assert_eq!(config.resources_dir(), Some(PathBuf::from("/srv/paporg")));
    }

    #[test]
    fn test_load_invalid_toml_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[general\nlog_level = 1").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }
}
