//! Variables - named regex extractors feeding output templates

use indexmap::IndexMap;
use regex::Captures;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::pattern::{self, CompiledPattern};

/// Post-processing applied to a captured value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transform {
    #[default]
    None,
    Slugify,
    Uppercase,
    Lowercase,
    Trim,
}

impl Transform {
    pub fn apply(self, value: &str) -> String {
        match self {
            Transform::None => value.to_string(),
            Transform::Slugify => slugify(value),
            Transform::Uppercase => value.to_uppercase(),
            Transform::Lowercase => value.to_lowercase(),
            Transform::Trim => value.trim().to_string(),
        }
    }
}

/// A named extractor; the name is the key it is stored under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableSpec {
    /// Regex source, may use `(?P<name>...)` groups
    pub pattern: String,

    #[serde(default)]
    pub transform: Transform,

    /// Value used when the pattern finds nothing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl VariableSpec {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            transform: Transform::None,
            default: None,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Resolve this variable against document text. Never fails: a pattern
    /// that does not compile or does not match yields the default.
    pub fn resolve(&self, text: &str) -> String {
        let captured = match pattern::compile(&self.pattern) {
            Ok(compiled) => capture_value(&compiled, text),
            Err(e) => {
                trace!("Variable pattern unusable, using default: {}", e);
                None
            }
        };

        match captured {
            Some(value) => self.transform.apply(&value),
            None => self.default.clone().unwrap_or_default(),
        }
    }
}

/// Variables keyed by name, in declaration order
pub type VariableSet = IndexMap<String, VariableSpec>;

/// Resolve every variable independently against the same text
pub fn extract(variables: &VariableSet, text: &str) -> IndexMap<String, String> {
    variables
        .iter()
        .map(|(name, spec)| (name.clone(), spec.resolve(text)))
        .collect()
}

// First match; the `value` group wins, then the first named group, then the
// whole match. A preferred group that did not take part falls back to the
// whole match.
fn capture_value(compiled: &CompiledPattern, text: &str) -> Option<String> {
    let caps = compiled.captures(text)?;
    let regex = compiled.regex()?;

    let preferred = if regex.capture_names().flatten().any(|n| n == "value") {
        Some("value")
    } else {
        regex.capture_names().flatten().next()
    };

    let group = preferred.and_then(|name| caps.name(name));
    Some(group.map_or_else(|| whole_match(&caps), |m| m.as_str().to_string()))
}

fn whole_match(caps: &Captures<'_>) -> String {
    caps.get(0).map(|m| m.as_str().to_string()).unwrap_or_default()
}

/// Lowercase, collapse runs of non-alphanumerics into one hyphen, trim hyphens
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_hyphen = false;

    for c in value.chars() {
        if c.is_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug
}
