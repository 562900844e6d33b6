//! Rule engine - match conditions, variables and output templates

mod condition;
mod engine;
pub mod pattern;
pub mod template;
mod variable;

pub use condition::{MatchCondition, MatchKind};
pub use engine::{RuleEngine, select};
pub use pattern::CompiledPattern;
pub use template::{BuiltinContext, RenderContext};
pub use variable::{Transform, VariableSet, VariableSpec, extract, slugify};

use serde::{Deserialize, Serialize};

/// A named rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Unique identifier, also the tie-breaker between equal priorities
    pub name: String,

    pub spec: RuleSpec,
}

impl Rule {
    pub fn new(name: impl Into<String>, spec: RuleSpec) -> Self {
        Self {
            name: name.into(),
            spec,
        }
    }
}

/// What a rule matches and where matching documents go
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSpec {
    /// Higher priorities are evaluated first
    #[serde(default)]
    pub priority: i32,

    #[serde(default)]
    pub category: String,

    /// Whether the rule is active
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(rename = "match")]
    pub condition: MatchCondition,

    pub output: OutputSpec,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symlinks: Vec<SymlinkSpec>,
}

fn default_enabled() -> bool {
    true
}

impl RuleSpec {
    pub fn new(condition: MatchCondition, output: OutputSpec) -> Self {
        Self {
            priority: 0,
            category: String::new(),
            enabled: true,
            condition,
            output,
            symlinks: Vec::new(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_symlink(mut self, template: impl Into<String>) -> Self {
        self.symlinks.push(SymlinkSpec::Template(template.into()));
        self
    }

    /// Every template string this rule renders
    pub fn templates(&self) -> impl Iterator<Item = &str> {
        [self.output.directory.as_str(), self.output.filename.as_str()]
            .into_iter()
            .chain(self.symlinks.iter().map(SymlinkSpec::template))
    }
}

/// Directory and filename templates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSpec {
    pub directory: String,
    pub filename: String,
}

impl OutputSpec {
    pub fn new(directory: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            filename: filename.into(),
        }
    }
}

/// Symlink target template, written either as a plain string or `{ target: ... }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SymlinkSpec {
    Template(String),
    Target { target: String },
}

impl SymlinkSpec {
    pub fn template(&self) -> &str {
        match self {
            SymlinkSpec::Template(t) | SymlinkSpec::Target { target: t } => t,
        }
    }
}

/// Placement used when no rule matches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackOutput {
    #[serde(default = "default_unsorted")]
    pub category: String,

    #[serde(default = "default_unsorted")]
    pub directory: String,

    #[serde(default = "default_fallback_filename")]
    pub filename: String,
}

impl Default for FallbackOutput {
    fn default() -> Self {
        Self {
            category: default_unsorted(),
            directory: default_unsorted(),
            filename: default_fallback_filename(),
        }
    }
}

fn default_unsorted() -> String {
    "unsorted".to_string()
}

fn default_fallback_filename() -> String {
    "$original".to_string()
}

/// Where one document goes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementDecision {
    /// `None` when no rule matched and the fallback applied
    pub matched_rule: Option<String>,

    pub category: String,

    #[serde(rename = "outputDirectory")]
    pub directory: String,

    #[serde(rename = "outputFilename")]
    pub filename: String,

    pub symlinks: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rule_spec() {
        let yaml = r#"
priority: 100
category: Invoices
match:
  containsAny: [Invoice, Rechnung]
output:
  directory: $y/Tax/Invoices
  filename: $original
symlinks:
  - $y/All
  - target: Vendors/$vendor
"#;
        let spec: RuleSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.priority, 100);
        assert!(spec.enabled);
        assert_eq!(spec.symlinks.len(), 2);
        assert_eq!(spec.symlinks[1].template(), "Vendors/$vendor");
        assert_eq!(
            spec.templates().collect::<Vec<_>>(),
            vec!["$y/Tax/Invoices", "$original", "$y/All", "Vendors/$vendor"]
        );
    }

    #[test]
    fn test_rule_spec_defaults() {
        let yaml = "match: {contains: x}\noutput: {directory: d, filename: f}";
        let spec: RuleSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.priority, 0);
        assert_eq!(spec.category, "");
        assert!(spec.symlinks.is_empty());
    }

    #[test]
    fn test_decision_wire_shape() {
        let decision = PlacementDecision {
            matched_rule: None,
            category: "unsorted".into(),
            directory: "unsorted".into(),
            filename: "scan".into(),
            symlinks: vec![],
        };
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "matchedRule": null,
                "category": "unsorted",
                "outputDirectory": "unsorted",
                "outputFilename": "scan",
                "symlinks": [],
            })
        );
    }
}
