//! Error types for pattern compilation and configuration validation

use thiserror::Error;

/// A regex pattern could not be compiled
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("invalid pattern '{pattern}': {message}")]
    Syntax { pattern: String, message: String },
}

/// Problems found while loading or validating rule and variable resources
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0}")]
    InvalidPattern(#[from] PatternError),

    #[error("match condition must set exactly one of {fields}, found {found}")]
    AmbiguousMatch { fields: &'static str, found: usize },

    #[error("'{field}' must not be empty")]
    EmptyCondition { field: &'static str },

    #[error("variable name '{name}' is reserved for a built-in template token")]
    ReservedVariableName { name: String },

    #[error("invalid resource name '{name}': must match ^[a-zA-Z_][a-zA-Z0-9_-]*$")]
    InvalidName { name: String },

    #[error("duplicate {kind} name '{name}'")]
    DuplicateName { kind: &'static str, name: String },

    #[error("unsupported apiVersion '{found}', expected '{expected}'")]
    UnsupportedApiVersion {
        found: String,
        expected: &'static str,
    },

    #[error("match condition nests {depth} levels deep (limit {limit})")]
    ConditionTooDeep { depth: usize, limit: usize },

    #[error("match condition has {nodes} nodes (limit {limit})")]
    ConditionTooLarge { nodes: usize, limit: usize },

    #[error("'{field}' must not be empty")]
    EmptyField { field: &'static str },

    #[error("template '{template}' references unknown variable '${token}'")]
    UnknownTemplateVariable { template: String, token: String },

    #[error("failed to parse resource: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_error_message_carries_engine_text() {
        let err = PatternError::Syntax {
            pattern: "(abc".into(),
            message: "unclosed group".into(),
        };
        assert_eq!(err.to_string(), "invalid pattern '(abc': unclosed group");
    }

    #[test]
    fn test_invalid_pattern_is_transparent() {
        let err: ConfigError = PatternError::Syntax {
            pattern: "[".into(),
            message: "unclosed class".into(),
        }
        .into();
        assert_eq!(err.to_string(), "invalid pattern '[': unclosed class");
    }

    #[test]
    fn test_ambiguous_match_message() {
        let err = ConfigError::AmbiguousMatch {
            fields: "contains, containsAny",
            found: 2,
        };
        assert_eq!(
            err.to_string(),
            "match condition must set exactly one of contains, containsAny, found 2"
        );
    }

    #[test]
    fn test_reserved_name_message() {
        let err = ConfigError::ReservedVariableName { name: "y".into() };
        assert_eq!(
            err.to_string(),
            "variable name 'y' is reserved for a built-in template token"
        );
    }
}
