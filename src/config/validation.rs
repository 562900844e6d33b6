//! Cross-resource validation - turns loaded resources into a rule engine

use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;
use tracing::{error, warn};

use super::loader::LoadedConfig;
use crate::error::ConfigError;
use crate::rules::{
    FallbackOutput, Rule, RuleEngine, RuleSpec, VariableSet, VariableSpec, pattern, template,
};

/// Deepest match condition accepted
pub const MAX_CONDITION_DEPTH: usize = 64;

/// Largest match condition accepted, in nodes
pub const MAX_CONDITION_NODES: usize = 10_000;

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_-]*$").expect("invalid name regex"));

/// How serious a configuration issue is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The entity was skipped
    Error,
    /// The entity is active but may not behave as intended
    Warning,
}

/// A problem with one rule, variable or file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    /// Rule or variable name, or the file the problem was found in
    pub name: String,
    pub severity: Severity,
    pub error: ConfigError,
}

impl ConfigIssue {
    pub fn new(name: impl Into<String>, severity: Severity, error: ConfigError) -> Self {
        Self {
            name: name.into(),
            severity,
            error,
        }
    }

    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "[{}] {}: {}", level, self.name, self.error)
    }
}

/// Outcome of validation: the usable rules and variables plus every issue
#[derive(Debug, Clone, Default)]
pub struct ValidatedConfig {
    pub rules: Vec<Rule>,
    pub variables: VariableSet,
    pub issues: Vec<ConfigIssue>,
}

impl ValidatedConfig {
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    /// Build the immutable engine from the surviving resources.
    ///
    /// The fallback templates only see builtins, so any other token in them
    /// is reported as a warning.
    pub fn into_engine(mut self, fallback: FallbackOutput) -> (RuleEngine, Vec<ConfigIssue>) {
        self.issues.extend(check_fallback(&fallback));
        let engine = RuleEngine::new(self.rules, self.variables).with_fallback(fallback);
        (engine, self.issues)
    }
}

/// Validates loaded resources
#[derive(Debug, Default)]
pub struct ConfigValidator {
    issues: Vec<ConfigIssue>,
}

impl ConfigValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate everything, skipping entities with errors
    pub fn validate(mut self, loaded: LoadedConfig) -> ValidatedConfig {
        self.issues = loaded.issues;

        let mut variables = VariableSet::new();
        for (metadata, spec) in loaded.variables {
            if self.check_variable(&metadata.name, &spec, &variables) {
                variables.insert(metadata.name, spec);
            }
        }

        let variable_names: Vec<&str> = variables.keys().map(String::as_str).collect();
        let mut seen = HashSet::new();
        let mut rules = Vec::new();
        for (metadata, spec) in loaded.rules {
            if self.check_rule(&metadata.name, &spec, &variable_names, &mut seen) {
                rules.push(Rule::new(metadata.name, spec));
            }
        }

        ValidatedConfig {
            rules,
            variables,
            issues: self.issues,
        }
    }

    fn error(&mut self, name: &str, error: ConfigError) {
        self.issues.push(ConfigIssue::new(name, Severity::Error, error));
    }

    fn warning(&mut self, name: &str, error: ConfigError) {
        self.issues.push(ConfigIssue::new(name, Severity::Warning, error));
    }

    fn check_name(&mut self, name: &str) -> bool {
        if NAME_RE.is_match(name) {
            true
        } else {
            self.error(name, ConfigError::InvalidName { name: name.into() });
            false
        }
    }

    fn check_variable(&mut self, name: &str, spec: &VariableSpec, existing: &VariableSet) -> bool {
        if !self.check_name(name) {
            return false;
        }
        if template::is_builtin(name) {
            self.error(name, ConfigError::ReservedVariableName { name: name.into() });
            return false;
        }
        if existing.contains_key(name) {
            self.error(
                name,
                ConfigError::DuplicateName {
                    kind: "Variable",
                    name: name.into(),
                },
            );
            return false;
        }
        // Kept: an unusable pattern simply never matches
        if let Err(e) = pattern::compile(&spec.pattern) {
            self.warning(name, e.into());
        }
        true
    }

    fn check_rule(
        &mut self,
        name: &str,
        spec: &RuleSpec,
        variables: &[&str],
        seen: &mut HashSet<String>,
    ) -> bool {
        if !self.check_name(name) {
            return false;
        }
        if !seen.insert(name.to_string()) {
            self.error(
                name,
                ConfigError::DuplicateName {
                    kind: "Rule",
                    name: name.into(),
                },
            );
            return false;
        }

        let mut valid = true;
        if spec.output.directory.trim().is_empty() {
            self.error(name, ConfigError::EmptyField { field: "output.directory" });
            valid = false;
        }
        if spec.output.filename.trim().is_empty() {
            self.error(name, ConfigError::EmptyField { field: "output.filename" });
            valid = false;
        }

        let depth = spec.condition.depth();
        if depth > MAX_CONDITION_DEPTH {
            self.error(
                name,
                ConfigError::ConditionTooDeep {
                    depth,
                    limit: MAX_CONDITION_DEPTH,
                },
            );
            valid = false;
        }
        let nodes = spec.condition.node_count();
        if nodes > MAX_CONDITION_NODES {
            self.error(
                name,
                ConfigError::ConditionTooLarge {
                    nodes,
                    limit: MAX_CONDITION_NODES,
                },
            );
            valid = false;
        }

        let mut pattern_errors = Vec::new();
        spec.condition.for_each_pattern(&mut |source, case_sensitive| {
            if let Err(e) = pattern::compile_with(source, case_sensitive) {
                pattern_errors.push(e);
            }
        });
        if !pattern_errors.is_empty() {
            valid = false;
        }
        for e in pattern_errors {
            self.error(name, e.into());
        }

        for tmpl in spec.templates() {
            for token in template::unknown_tokens(tmpl, variables) {
                self.warning(
                    name,
                    ConfigError::UnknownTemplateVariable {
                        template: tmpl.to_string(),
                        token: token.to_string(),
                    },
                );
            }
        }

        valid
    }
}

/// Name under which `[unsorted]` template issues are reported
const FALLBACK_NAME: &str = "unsorted";

fn check_fallback(fallback: &FallbackOutput) -> Vec<ConfigIssue> {
    [fallback.directory.as_str(), fallback.filename.as_str()]
        .into_iter()
        .flat_map(|tmpl| {
            template::unknown_tokens(tmpl, &[]).into_iter().map(move |token| {
                ConfigIssue::new(
                    FALLBACK_NAME,
                    Severity::Warning,
                    ConfigError::UnknownTemplateVariable {
                        template: tmpl.to_string(),
                        token: token.to_string(),
                    },
                )
            })
        })
        .collect()
}

/// Validate with a fresh [`ConfigValidator`]
pub fn validate(loaded: LoadedConfig) -> ValidatedConfig {
    ConfigValidator::new().validate(loaded)
}

/// Log every issue at a level matching its severity
pub fn log_issues(issues: &[ConfigIssue]) {
    for issue in issues {
        match issue.severity {
            Severity::Error => error!("Configuration: {}", issue),
            Severity::Warning => warn!("Configuration: {}", issue),
        }
    }
}
