//! Match conditions - boolean expressions evaluated against document text

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::pattern;
use crate::error::ConfigError;

const MATCH_FIELDS: &str = "contains, containsAny, containsAll, pattern, all, any, not";

/// A node of a match expression.
///
/// Every node carries its own case flag; children do not inherit it.
/// List-bearing variants are never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCondition", into = "RawCondition")]
pub struct MatchCondition {
    kind: MatchKind,
    case_sensitive: bool,
}

/// The test a [`MatchCondition`] performs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchKind {
    /// Text contains the substring
    Contains(String),
    /// Text contains at least one of the substrings
    ContainsAny(Vec<String>),
    /// Text contains every substring
    ContainsAll(Vec<String>),
    /// Regex finds a match somewhere in the text
    Pattern(String),
    /// Every child is true
    All(Vec<MatchCondition>),
    /// At least one child is true
    Any(Vec<MatchCondition>),
    /// The child is false
    Not(Box<MatchCondition>),
}

impl MatchCondition {
    /// Build a condition, rejecting empty lists.
    pub fn new(kind: MatchKind) -> Result<Self, ConfigError> {
        let empty_field = match &kind {
            MatchKind::ContainsAny(v) if v.is_empty() => Some("containsAny"),
            MatchKind::ContainsAll(v) if v.is_empty() => Some("containsAll"),
            MatchKind::All(v) if v.is_empty() => Some("all"),
            MatchKind::Any(v) if v.is_empty() => Some("any"),
            _ => None,
        };
        if let Some(field) = empty_field {
            return Err(ConfigError::EmptyCondition { field });
        }

        Ok(Self {
            kind,
            case_sensitive: false,
        })
    }

    pub fn contains(needle: impl Into<String>) -> Self {
        Self {
            kind: MatchKind::Contains(needle.into()),
            case_sensitive: false,
        }
    }

    pub fn pattern(source: impl Into<String>) -> Self {
        Self {
            kind: MatchKind::Pattern(source.into()),
            case_sensitive: false,
        }
    }

    pub fn not(child: MatchCondition) -> Self {
        Self {
            kind: MatchKind::Not(Box::new(child)),
            case_sensitive: false,
        }
    }

    pub fn contains_any<I, S>(needles: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(MatchKind::ContainsAny(
            needles.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn contains_all<I, S>(needles: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(MatchKind::ContainsAll(
            needles.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn all(children: Vec<MatchCondition>) -> Result<Self, ConfigError> {
        Self::new(MatchKind::All(children))
    }

    pub fn any(children: Vec<MatchCondition>) -> Result<Self, ConfigError> {
        Self::new(MatchKind::Any(children))
    }

    /// Set the case flag on this node only
    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn kind(&self) -> &MatchKind {
        &self.kind
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Evaluate against document text
    pub fn evaluate(&self, text: &str) -> bool {
        let cs = self.case_sensitive;
        match &self.kind {
            MatchKind::Contains(needle) => contains(text, needle, cs),
            MatchKind::ContainsAny(needles) => needles.iter().any(|n| contains(text, n, cs)),
            MatchKind::ContainsAll(needles) => needles.iter().all(|n| contains(text, n, cs)),
            MatchKind::Pattern(source) => match pattern::compile_with(source, cs) {
                Ok(compiled) => compiled.is_match(text),
                Err(e) => {
                    trace!("Treating uncompilable pattern as no match: {}", e);
                    false
                }
            },
            MatchKind::All(children) => children.iter().all(|c| c.evaluate(text)),
            MatchKind::Any(children) => children.iter().any(|c| c.evaluate(text)),
            MatchKind::Not(child) => !child.evaluate(text),
        }
    }

    /// Nesting depth; a single node has depth 1
    pub fn depth(&self) -> usize {
        match &self.kind {
            MatchKind::All(children) | MatchKind::Any(children) => {
                1 + children.iter().map(Self::depth).max().unwrap_or(0)
            }
            MatchKind::Not(child) => 1 + child.depth(),
            _ => 1,
        }
    }

    /// Total number of nodes in the tree
    pub fn node_count(&self) -> usize {
        match &self.kind {
            MatchKind::All(children) | MatchKind::Any(children) => {
                1 + children.iter().map(Self::node_count).sum::<usize>()
            }
            MatchKind::Not(child) => 1 + child.node_count(),
            _ => 1,
        }
    }

    /// Visit every regex source in the tree together with its node's case flag
    pub fn for_each_pattern(&self, f: &mut impl FnMut(&str, bool)) {
        match &self.kind {
            MatchKind::Pattern(source) => f(source, self.case_sensitive),
            MatchKind::All(children) | MatchKind::Any(children) => {
                for child in children {
                    child.for_each_pattern(f);
                }
            }
            MatchKind::Not(child) => child.for_each_pattern(f),
            _ => {}
        }
    }
}

// Case-insensitive substring tests run as an escaped literal pattern so they
// share the regex engine's simple case folding with `pattern` conditions.
fn contains(text: &str, needle: &str, case_sensitive: bool) -> bool {
    if case_sensitive || needle.is_empty() {
        return text.contains(needle);
    }
    match pattern::compile_with(&regex::escape(needle), false) {
        Ok(compiled) => compiled.is_match(text),
        Err(e) => {
            trace!("Literal too large for a pattern, no match: {}", e);
            false
        }
    }
}

/// Wire shape: an object with exactly one match field set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    contains: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    contains_any: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    contains_all: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    all: Option<Vec<MatchCondition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    any: Option<Vec<MatchCondition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    not: Option<Box<MatchCondition>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    case_sensitive: bool,
}

impl TryFrom<RawCondition> for MatchCondition {
    type Error = ConfigError;

    fn try_from(raw: RawCondition) -> Result<Self, Self::Error> {
        let found = [
            raw.contains.is_some(),
            raw.contains_any.is_some(),
            raw.contains_all.is_some(),
            raw.pattern.is_some(),
            raw.all.is_some(),
            raw.any.is_some(),
            raw.not.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count();

        if found != 1 {
            return Err(ConfigError::AmbiguousMatch {
                fields: MATCH_FIELDS,
                found,
            });
        }

        let kind = if let Some(v) = raw.contains {
            MatchKind::Contains(v)
        } else if let Some(v) = raw.contains_any {
            MatchKind::ContainsAny(v)
        } else if let Some(v) = raw.contains_all {
            MatchKind::ContainsAll(v)
        } else if let Some(v) = raw.pattern {
            MatchKind::Pattern(v)
        } else if let Some(v) = raw.all {
            MatchKind::All(v)
        } else if let Some(v) = raw.any {
            MatchKind::Any(v)
        } else if let Some(v) = raw.not {
            MatchKind::Not(v)
        } else {
            unreachable!("exactly one field is set")
        };

        Ok(Self::new(kind)?.with_case_sensitive(raw.case_sensitive))
    }
}

impl From<MatchCondition> for RawCondition {
    fn from(condition: MatchCondition) -> Self {
        let mut raw = RawCondition {
            case_sensitive: condition.case_sensitive,
            ..Default::default()
        };
        match condition.kind {
            MatchKind::Contains(v) => raw.contains = Some(v),
            MatchKind::ContainsAny(v) => raw.contains_any = Some(v),
            MatchKind::ContainsAll(v) => raw.contains_all = Some(v),
            MatchKind::Pattern(v) => raw.pattern = Some(v),
            MatchKind::All(v) => raw.all = Some(v),
            MatchKind::Any(v) => raw.any = Some(v),
            MatchKind::Not(v) => raw.not = Some(v),
        }
        raw
    }
}
