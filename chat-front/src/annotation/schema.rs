//! JSON Schema validation of annotation payloads.

use super::{
    Annotation, ANNOTATION_AGENT, ANNOTATION_ARTIFACT, ANNOTATION_HUMAN_RESPONSE,
    ANNOTATION_SOURCES, ANNOTATION_SUGGESTED_QUESTIONS, ANNOTATION_TOOL_RESULT,
};
use crate::types::artifact::Artifact;
use crate::types::event::{AgentRunKind, HumanResponse, Progress};
use crate::types::source::SourceNode;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

/// `data` of an `agent` annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AgentPayload {
    pub agent: String,
    pub text: String,
    #[serde(rename = "type", default)]
    pub kind: AgentRunKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Progress>,
}

/// `data` of a `sources` annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SourcesPayload {
    pub nodes: Vec<SourceNode>,
}

/// `data` of a `tool_result` annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultPayload {
    pub call_id: String,
    #[serde(default)]
    pub output: Value,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,
}

/// Per-`type` validators for annotation payloads.
///
/// An annotation whose type has no registered schema does not validate.
pub struct SchemaRegistry {
    validators: HashMap<String, jsonschema::Validator>,
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("types", &self.validators.keys().collect::<Vec<_>>())
            .finish()
    }
}

static DEFAULT_REGISTRY: LazyLock<Arc<SchemaRegistry>> = LazyLock::new(|| {
    let mut registry = SchemaRegistry::empty();
    let results = [
        registry.register::<Artifact>(ANNOTATION_ARTIFACT),
        registry.register::<HumanResponse>(ANNOTATION_HUMAN_RESPONSE),
        registry.register::<SourcesPayload>(ANNOTATION_SOURCES),
        registry.register::<AgentPayload>(ANNOTATION_AGENT),
        registry.register::<Vec<String>>(ANNOTATION_SUGGESTED_QUESTIONS),
        registry.register::<ToolResultPayload>(ANNOTATION_TOOL_RESULT),
    ];
    for e in results.into_iter().filter_map(|r| r.err()) {
        tracing::error!("Failed to build annotation schema validator: {:?}", e);
    }
    Arc::new(registry)
});

impl SchemaRegistry {
    pub fn empty() -> Self {
        Self {
            validators: HashMap::new(),
        }
    }

    /// Registry with every well-known annotation type
    pub fn shared_default() -> Arc<SchemaRegistry> {
        DEFAULT_REGISTRY.clone()
    }

    /// Register the schema generated from `T` for annotations of `kind`
    pub fn register<T: JsonSchema>(&mut self, kind: &str) -> anyhow::Result<()> {
        let schema = serde_json::to_value(schemars::schema_for!(T))?;
        self.register_schema(kind, &schema)
    }

    /// Register a raw JSON Schema document for annotations of `kind`
    pub fn register_schema(&mut self, kind: &str, schema: &Value) -> anyhow::Result<()> {
        let validator = jsonschema::draft202012::new(schema)
            .map_err(|e| anyhow::anyhow!("invalid schema for '{}': {}", kind, e))?;
        self.validators.insert(kind.to_string(), validator);
        Ok(())
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.validators.contains_key(kind)
    }

    /// Validate an annotation's `data` against the schema of its `type`
    pub fn validate(&self, annotation: &Annotation) -> Result<(), String> {
        let Some(validator) = self.validators.get(&annotation.kind) else {
            return Err(format!("no schema for annotation type '{}'", annotation.kind));
        };
        let errors: Vec<String> = validator
            .iter_errors(&annotation.data)
            .map(|e| format!("Path: {}, Message: {}", e.instance_path, e))
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.join("; "))
        }
    }
}
