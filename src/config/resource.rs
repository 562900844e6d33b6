//! Resource documents - the `apiVersion`/`kind`/`metadata`/`spec` envelope

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ConfigError;
use crate::rules::{RuleSpec, VariableSpec};

/// The only accepted `apiVersion`
pub const API_VERSION: &str = "paporg.io/v1";

/// Identity of a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub name: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl ObjectMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labels: BTreeMap::new(),
        }
    }
}

/// One parsed resource document
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    Rule { metadata: ObjectMeta, spec: RuleSpec },
    Variable { metadata: ObjectMeta, spec: VariableSpec },
    /// A kind this engine does not consume (settings, import sources, ...)
    Other { kind: String, metadata: ObjectMeta },
}

impl Resource {
    pub fn name(&self) -> &str {
        match self {
            Resource::Rule { metadata, .. }
            | Resource::Variable { metadata, .. }
            | Resource::Other { metadata, .. } => &metadata.name,
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            Resource::Rule { .. } => "Rule",
            Resource::Variable { .. } => "Variable",
            Resource::Other { kind, .. } => kind,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    api_version: String,
    kind: String,
    metadata: ObjectMeta,
    #[serde(default)]
    spec: serde_yaml::Value,
}

/// Parse a single YAML document into a [`Resource`]
pub fn parse_document(document: serde_yaml::Value) -> Result<Resource, ConfigError> {
    let envelope: Envelope =
        serde_yaml::from_value(document).map_err(|e| ConfigError::Parse(e.to_string()))?;

    if envelope.api_version != API_VERSION {
        return Err(ConfigError::UnsupportedApiVersion {
            found: envelope.api_version,
            expected: API_VERSION,
        });
    }

    let Envelope {
        kind,
        metadata,
        spec,
        ..
    } = envelope;
    let spec_error =
        |e: serde_yaml::Error| ConfigError::Parse(format!("{kind} '{}': {e}", metadata.name));

    match kind.as_str() {
        "Rule" => {
            let spec = serde_yaml::from_value(spec).map_err(spec_error)?;
            Ok(Resource::Rule { metadata, spec })
        }
        "Variable" => {
            let spec = serde_yaml::from_value(spec).map_err(spec_error)?;
            Ok(Resource::Variable { metadata, spec })
        }
        _ => Ok(Resource::Other {
            kind: kind.clone(),
            metadata,
        }),
    }
}

/// Parse every `---` separated document in a YAML source.
///
/// Each entry is either a resource or the error for that document, so one
/// broken document does not hide its neighbours.
pub fn parse_documents(source: &str) -> Vec<Result<Resource, ConfigError>> {
    let mut results = Vec::new();

    for document in serde_yaml::Deserializer::from_str(source) {
        let value = match serde_yaml::Value::deserialize(document) {
            Ok(serde_yaml::Value::Null) => continue,
            Ok(value) => value,
            Err(e) => {
                // The stream cannot be resynchronised after a syntax error
                results.push(Err(ConfigError::Parse(e.to_string())));
                break;
            }
        };
        results.push(parse_document(value));
    }

    results
}
