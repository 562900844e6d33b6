//! Resource loader - reads every YAML file below the resources directory

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::resource::{self, ObjectMeta, Resource};
use super::validation::{ConfigIssue, Severity};
use crate::rules::{RuleSpec, VariableSpec};

/// Raw resources read from disk, before cross-resource validation
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    pub rules: Vec<(ObjectMeta, RuleSpec)>,
    pub variables: Vec<(ObjectMeta, VariableSpec)>,
    /// Files or documents that could not be parsed
    pub issues: Vec<ConfigIssue>,
}

impl LoadedConfig {
    /// Add the resources of one YAML source; `origin` labels parse failures
    pub fn add_source(&mut self, source: &str, origin: &str) {
        for (index, parsed) in resource::parse_documents(source).into_iter().enumerate() {
            match parsed {
                Ok(Resource::Rule { metadata, spec }) => self.rules.push((metadata, spec)),
                Ok(Resource::Variable { metadata, spec }) => self.variables.push((metadata, spec)),
                Ok(Resource::Other { kind, metadata }) => {
                    debug!("Skipping {} '{}' in {}", kind, metadata.name, origin);
                }
                Err(e) => {
                    warn!("Failed to parse document {} of {}: {}", index + 1, origin, e);
                    self.issues.push(ConfigIssue::new(
                        format!("{origin}#{}", index + 1),
                        Severity::Error,
                        e,
                    ));
                }
            }
        }
    }
}

/// Loads rule and variable resources from a directory tree
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    root: PathBuf,
}

impl ConfigLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All `*.yaml` / `*.yml` files below the root, sorted
    pub fn resource_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for ext in ["yaml", "yml"] {
            let root = glob::Pattern::escape(&self.root.to_string_lossy());
            let pattern = format!("{root}/**/*.{ext}");
            for entry in glob::glob(&pattern)
                .with_context(|| format!("Invalid resource glob: {}", pattern))?
            {
                match entry {
                    Ok(path) if path.is_file() => files.push(path),
                    Ok(_) => {}
                    Err(e) => warn!("Skipping unreadable path: {}", e),
                }
            }
        }
        files.sort();
        Ok(files)
    }

    /// Read and parse every resource file.
    ///
    /// A missing root yields an empty configuration. Unreadable or malformed
    /// files are reported as issues rather than failing the whole load.
    pub fn load(&self) -> Result<LoadedConfig> {
        let mut loaded = LoadedConfig::default();

        if !self.root.exists() {
            debug!(
                "Resources directory not found, skipping: {}",
                self.root.display()
            );
            return Ok(loaded);
        }

        let files = self.resource_files()?;
        for path in &files {
            let origin = path
                .strip_prefix(&self.root)
                .unwrap_or(path)
                .display()
                .to_string();

            match std::fs::read_to_string(path) {
                Ok(content) => loaded.add_source(&content, &origin),
                Err(e) => {
                    warn!("Failed to read {}: {}", path.display(), e);
                    loaded.issues.push(ConfigIssue::new(
                        origin,
                        Severity::Error,
                        crate::error::ConfigError::Parse(e.to_string()),
                    ));
                }
            }
        }

        info!(
            "Loaded {} rules and {} variables from {} files in {}",
            loaded.rules.len(),
            loaded.variables.len(),
            files.len(),
            self.root.display()
        );
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_source_collects_issues() {
        let mut loaded = LoadedConfig::default();
        loaded.add_source(
            "apiVersion: paporg.io/v1\nkind: Variable\nmetadata: {name: y2}\nspec: {pattern: '\\d+'}\n---\nkind: Rule\nmetadata: {name: x}",
            "vars.yaml",
        );
        assert_eq!(loaded.variables.len(), 1);
        assert_eq!(loaded.issues.len(), 1);
        assert_eq!(loaded.issues[0].name, "vars.yaml#2");
        assert_eq!(loaded.issues[0].severity, Severity::Error);
    }

    #[test]
    fn test_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = ConfigLoader::new(dir.path().join("absent")).load().unwrap();
        assert!(loaded.rules.is_empty());
        assert!(loaded.issues.is_empty());
    }
}
