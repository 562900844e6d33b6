//! Output templates - `$name` substitution and path sanitation

use chrono::{DateTime, Datelike, Local};
use std::collections::BTreeMap;
use std::path::Path;
use uuid::Uuid;

/// Token names that are always defined and cannot be taken by a variable
pub const BUILTIN_NAMES: [&str; 8] = ["y", "l", "m", "d", "original", "timestamp", "category", "uuid"];

/// Characters removed from every rendered path segment
const ILLEGAL_CHARS: [char; 7] = ['<', '>', ':', '"', '|', '?', '*'];

/// True if `name` is a built-in token
pub fn is_builtin(name: &str) -> bool {
    BUILTIN_NAMES.contains(&name)
}

/// Clock reading and identifier shared by every template of one decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinContext {
    pub now: DateTime<Local>,
    pub id: Uuid,
}

impl BuiltinContext {
    pub fn new(now: DateTime<Local>, id: Uuid) -> Self {
        Self { now, id }
    }

    /// Current local time and a fresh v4 identifier
    pub fn capture() -> Self {
        Self::new(Local::now(), Uuid::new_v4())
    }
}

/// Token values available to [`render`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderContext {
    values: BTreeMap<String, String>,
}

impl RenderContext {
    /// Context holding only the built-in tokens
    pub fn with_builtins(builtins: &BuiltinContext, filename: &str, category: &str) -> Self {
        let now = builtins.now;
        let original = Path::new(filename)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut values = BTreeMap::new();
        values.insert("y".to_string(), format!("{:04}", now.year()));
        values.insert("l".to_string(), format!("{:04}", now.year() - 1));
        values.insert("m".to_string(), format!("{:02}", now.month()));
        values.insert("d".to_string(), format!("{:02}", now.day()));
        values.insert("original".to_string(), original);
        // ISO 8601 basic format keeps the value free of ':'
        values.insert("timestamp".to_string(), now.format("%Y%m%dT%H%M%S").to_string());
        values.insert("category".to_string(), category.to_string());
        values.insert("uuid".to_string(), builtins.id.to_string());

        Self { values }
    }

    /// Add resolved custom variables. Built-in names are never overridden.
    pub fn with_variables<I>(mut self, variables: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in variables {
            if !is_builtin(&name) {
                self.values.insert(name, value);
            }
        }
        self
    }

    /// Add a single custom value. Built-in names are never overridden.
    pub fn set(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_variables([(name.into(), value.into())])
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a str),
    Known(&'a str),
    Unknown(&'a str),
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

// Split a template into literal text and tokens. At each `$` the longest
// known name that prefixes the rest wins; otherwise the token runs to the
// first non-identifier character.
fn scan<'a>(template: &'a str, known: &[&str]) -> Vec<Segment<'a>> {
    let mut names: Vec<&str> = known.iter().copied().filter(|n| !n.is_empty()).collect();
    names.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));

    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut pos = 0;

    while let Some(offset) = template[pos..].find('$') {
        let dollar = pos + offset;
        let rest = &template[dollar + 1..];

        let token_len = match names.iter().find(|n| rest.starts_with(**n)) {
            Some(name) => Some((name.len(), true)),
            None => {
                let len = rest
                    .char_indices()
                    .find(|(_, c)| !is_ident_char(*c))
                    .map_or(rest.len(), |(i, _)| i);
                (len > 0).then_some((len, false))
            }
        };

        match token_len {
            Some((len, is_known)) => {
                if literal_start < dollar {
                    segments.push(Segment::Literal(&template[literal_start..dollar]));
                }
                let name = &rest[..len];
                segments.push(if is_known {
                    Segment::Known(name)
                } else {
                    Segment::Unknown(name)
                });
                pos = dollar + 1 + len;
                literal_start = pos;
            }
            // A lone '$' stays literal
            None => pos = dollar + 1,
        }
    }

    if literal_start < template.len() {
        segments.push(Segment::Literal(&template[literal_start..]));
    }
    segments
}

/// Replace tokens with their values; unknown tokens become empty.
pub fn substitute(template: &str, context: &RenderContext) -> String {
    let known: Vec<&str> = context.values.keys().map(String::as_str).collect();
    let mut out = String::with_capacity(template.len());

    for segment in scan(template, &known) {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Known(name) => out.push_str(context.get(name).unwrap_or_default()),
            Segment::Unknown(_) => {}
        }
    }
    out
}

/// Substitute tokens and sanitize the result into a relative path.
pub fn render(template: &str, context: &RenderContext) -> String {
    sanitize_path(&substitute(template, context))
}

/// Substitute tokens and sanitize the result into a single file name.
pub fn render_filename(template: &str, context: &RenderContext) -> String {
    sanitize_filename(&substitute(template, context))
}

/// Token names in `template` that resolve to neither a builtin nor one of
/// `variables`.
pub fn unknown_tokens<'a>(template: &'a str, variables: &[&str]) -> Vec<&'a str> {
    let mut known: Vec<&str> = BUILTIN_NAMES.to_vec();
    known.extend_from_slice(variables);

    scan(template, &known)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Unknown(name) => Some(name),
            _ => None,
        })
        .collect()
}

/// Make a rendered string safe to use as a relative path.
///
/// Illegal and control characters are removed, `\` counts as a separator,
/// segments are trimmed, and empty, `.` and `..` segments are dropped.
pub fn sanitize_path(raw: &str) -> String {
    raw.split(['/', '\\'])
        .map(|segment| {
            segment
                .chars()
                .filter(|c| !c.is_control() && !ILLEGAL_CHARS.contains(c))
                .collect::<String>()
                .trim()
                .to_string()
        })
        .filter(|segment| !segment.is_empty() && segment != "." && segment != "..")
        .collect::<Vec<_>>()
        .join("/")
}

/// Make a rendered string safe to use as one path component.
///
/// Separators become `-`, illegal and control characters are removed and
/// the result is trimmed. `.` and `..` collapse to an empty name.
pub fn sanitize_filename(raw: &str) -> String {
    let name: String = raw
        .chars()
        .filter(|c| !c.is_control() && !ILLEGAL_CHARS.contains(c))
        .map(|c| if c == '/' || c == '\\' { '-' } else { c })
        .collect();

    match name.trim() {
        "." | ".." => String::new(),
        trimmed => trimmed.to_string(),
    }
}
