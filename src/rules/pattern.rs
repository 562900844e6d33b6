//! Pattern compilation - turns stored regex sources into cached matchers

use dashmap::DashMap;
use regex::{Captures, Regex};
use std::sync::LazyLock;
use tracing::trace;

use crate::error::PatternError;

// Process-wide cache keyed by the exact source handed to the regex engine
// (after normalization and the case flag). Failures are cached too. Pattern
// sources are user-authored and few, so entries are never evicted.
static PATTERN_CACHE: LazyLock<DashMap<String, Result<CompiledPattern, PatternError>>> =
    LazyLock::new(DashMap::new);

/// A compiled, reusable matcher. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    /// `None` for the empty pattern, which never matches
    regex: Option<Regex>,
}

impl CompiledPattern {
    /// True if the pattern finds a match anywhere in `text`
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.as_ref().is_some_and(|re| re.is_match(text))
    }

    /// Captures of the first match in `text`
    pub fn captures<'t>(&self, text: &'t str) -> Option<Captures<'t>> {
        self.regex.as_ref().and_then(|re| re.captures(text))
    }

    /// The underlying regex, if the pattern was not empty
    pub fn regex(&self) -> Option<&Regex> {
        self.regex.as_ref()
    }
}

/// Compile a stored pattern case-sensitively.
pub fn compile(source: &str) -> Result<CompiledPattern, PatternError> {
    compile_with(source, true)
}

/// Compile a stored pattern, optionally with an inline case-insensitivity toggle.
///
/// The `(?P<name>...)` group syntax of the stored format is accepted and
/// normalized first. An empty source compiles to a pattern that never matches.
pub fn compile_with(source: &str, case_sensitive: bool) -> Result<CompiledPattern, PatternError> {
    if source.is_empty() {
        return Ok(CompiledPattern { regex: None });
    }

    let normalized = normalize(source);
    let key = if case_sensitive {
        normalized
    } else {
        format!("(?i){normalized}")
    };

    if let Some(hit) = PATTERN_CACHE.get(&key) {
        return hit.value().clone();
    }

    let compiled = match Regex::new(&key) {
        Ok(regex) => {
            trace!("Compiled pattern: {}", key);
            Ok(CompiledPattern { regex: Some(regex) })
        }
        Err(e) => Err(PatternError::Syntax {
            pattern: source.to_string(),
            message: e.to_string(),
        }),
    };
    PATTERN_CACHE.entry(key).or_insert(compiled).value().clone()
}

/// Rewrite `(?P<name>` groups into the `(?<name>` form.
///
/// Escaped characters and bracket classes are copied through untouched so a
/// literal `\(?P<` or `[(?P<]` keeps its meaning.
pub fn normalize(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut in_class = false;

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                out.push(c);
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '[' if !in_class => {
                in_class = true;
                out.push(c);
                // A leading ']' (or '^]') is a literal inside the class
                if chars.peek() == Some(&'^') {
                    out.push('^');
                    chars.next();
                }
                if chars.peek() == Some(&']') {
                    out.push(']');
                    chars.next();
                }
            }
            ']' if in_class => {
                in_class = false;
                out.push(c);
            }
            '(' if !in_class => {
                out.push(c);
                let mut lookahead = chars.clone();
                if lookahead.next() == Some('?')
                    && lookahead.next() == Some('P')
                    && lookahead.next() == Some('<')
                {
                    chars.next();
                    chars.next();
                    out.push('?');
                }
            }
            _ => out.push(c),
        }
    }

    out
}
