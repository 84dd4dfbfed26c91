//! Source nodes (citations) and local file path derivation.

use crate::config::FileConfig;
use crate::error::{ChatFrontError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Component, Path, PathBuf};

/// Metadata key holding the original file name
pub const METADATA_FILE_NAME: &str = "file_name";
/// Metadata key holding the remote pipeline identifier
pub const METADATA_PIPELINE_ID: &str = "pipeline_id";
/// Metadata key holding an explicit citation URL
pub const METADATA_URL: &str = "URL";

/// A retrieved document fragment rendered to the client as a citation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SourceNode {
    pub id: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
}

impl SourceNode {
    /// Remote pipeline identifier, present when the node originates from a remote store
    pub fn pipeline_id(&self) -> Option<&str> {
        self.metadata
            .get(METADATA_PIPELINE_ID)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Whether the node's file has to be downloaded before it can be served
    pub fn is_remote(&self) -> bool {
        self.pipeline_id().is_some() && self.file_name.is_some() && self.file_path.is_some()
    }
}

/// Reject identifiers that could escape the file root when joined into a path.
pub fn validate_path_component(component: &str) -> Result<()> {
    if component.is_empty() {
        return Err(ChatFrontError::PathRejected(
            "empty path component".to_string(),
        ));
    }
    if component.contains("..") || component.contains('/') || component.contains('\\') {
        return Err(ChatFrontError::PathRejected(component.to_string()));
    }
    Ok(())
}

/// Join a relative file path onto `root`, rejecting anything that could
/// resolve outside of it (absolute paths, `..`, drive prefixes).
pub fn resolve_under(root: &Path, relative: &str) -> Result<PathBuf> {
    let relative = Path::new(relative);
    let mut resolved = root.to_path_buf();
    let mut depth = 0;
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                resolved.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            _ => {
                return Err(ChatFrontError::PathRejected(
                    relative.display().to_string(),
                ))
            }
        }
    }
    if depth == 0 {
        return Err(ChatFrontError::PathRejected("empty path".to_string()));
    }
    Ok(resolved)
}

/// Builds [`SourceNode`]s from raw retrieval output, deriving `filePath` and `url`.
#[derive(Debug, Clone)]
pub struct SourceNodeFactory {
    remote_store: String,
    url_prefix: String,
}

impl SourceNodeFactory {
    pub fn new(remote_store: impl Into<String>, url_prefix: impl Into<String>) -> Self {
        Self {
            remote_store: remote_store.into(),
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &FileConfig) -> Self {
        Self::new(config.remote_store.clone(), config.url_prefix.clone())
    }

    /// `output/<remote-store>/<pipelineId>$<fileName>` for remote nodes,
    /// `data/<fileName>` otherwise.
    pub fn derive_file_path(&self, pipeline_id: Option<&str>, file_name: &str) -> Result<String> {
        validate_path_component(file_name)?;
        match pipeline_id {
            Some(pipeline_id) => {
                validate_path_component(&self.remote_store)?;
                validate_path_component(pipeline_id)?;
                Ok(format!(
                    "output/{}/{}${}",
                    self.remote_store, pipeline_id, file_name
                ))
            }
            None => Ok(format!("data/{}", file_name)),
        }
    }

    /// Build a node from its parts.
    ///
    /// A node whose identifiers fail path validation keeps its text and score
    /// but gets neither `filePath` nor a derived `url`.
    pub fn build(
        &self,
        id: impl Into<String>,
        metadata: Map<String, Value>,
        text: impl Into<String>,
        score: Option<f64>,
    ) -> SourceNode {
        let id = id.into();
        let file_name = metadata
            .get(METADATA_FILE_NAME)
            .and_then(Value::as_str)
            .map(str::to_string);
        let pipeline_id = metadata
            .get(METADATA_PIPELINE_ID)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty());

        let file_path = file_name.as_deref().and_then(|name| {
            self.derive_file_path(pipeline_id, name)
                .inspect_err(|e| {
                    tracing::warn!(node_id = %id, error = %e, "Rejected source node file path")
                })
                .ok()
        });

        let url = metadata
            .get(METADATA_URL)
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| {
                file_path
                    .as_ref()
                    .map(|path| format!("{}/{}", self.url_prefix, path))
            });

        SourceNode {
            id,
            metadata,
            score,
            url,
            text: text.into(),
            file_name,
            file_path,
        }
    }

    /// Parse a raw retrieval result.
    ///
    /// Accepts `{node: {id_|id, metadata, text}, score}` and the flat
    /// `{id, metadata, text, score}` shape. Returns `None` when no id is present.
    pub fn from_raw(&self, raw: &Value) -> Option<SourceNode> {
        let node = raw.get("node").filter(|n| n.is_object()).unwrap_or(raw);
        let id = node
            .get("id_")
            .or_else(|| node.get("id"))
            .and_then(Value::as_str)?;
        let metadata = node
            .get("metadata")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let text = node.get("text").and_then(Value::as_str).unwrap_or_default();
        let score = raw
            .get("score")
            .or_else(|| node.get("score"))
            .and_then(Value::as_f64);
        Some(self.build(id, metadata, text, score))
    }

    /// Parse every raw node, skipping entries that are not node-shaped.
    pub fn from_raw_nodes(&self, raw: &[Value]) -> Vec<SourceNode> {
        raw.iter()
            .filter_map(|value| {
                let node = self.from_raw(value);
                if node.is_none() {
                    tracing::debug!("Skipping raw source node without id");
                }
                node
            })
            .collect()
    }
}

impl Default for SourceNodeFactory {
    fn default() -> Self {
        Self::from_config(&FileConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_validate_path_component() {
        assert!(validate_path_component("report.pdf").is_ok());
        assert!(validate_path_component("../../etc/passwd").is_err());
        assert!(validate_path_component("a/b.txt").is_err());
        assert!(validate_path_component("a\\b.txt").is_err());
        assert!(validate_path_component("..").is_err());
        assert!(validate_path_component("").is_err());
    }

    #[test]
    fn test_resolve_under() {
        let root = Path::new("/srv/files");
        assert_eq!(
            resolve_under(root, "output/cloud/p1$a.pdf").unwrap(),
            PathBuf::from("/srv/files/output/cloud/p1$a.pdf")
        );
        assert_eq!(
            resolve_under(root, "./data/a.txt").unwrap(),
            PathBuf::from("/srv/files/data/a.txt")
        );
        assert!(resolve_under(root, "../../etc/passwd").is_err());
        assert!(resolve_under(root, "data/../../etc/passwd").is_err());
        assert!(resolve_under(root, "/etc/passwd").is_err());
        assert!(resolve_under(root, "").is_err());
    }

    #[test]
    fn test_derive_file_path() {
        let factory = SourceNodeFactory::new("cloud", "/api/files");
        assert_eq!(
            factory.derive_file_path(None, "report.pdf").unwrap(),
            "data/report.pdf"
        );
        assert_eq!(
            factory
                .derive_file_path(Some("pipe-1"), "report.pdf")
                .unwrap(),
            "output/cloud/pipe-1$report.pdf"
        );
    }

    #[test]
    fn test_derive_file_path_rejects_traversal() {
        let factory = SourceNodeFactory::default();
        let err = factory
            .derive_file_path(None, "../../etc/passwd")
            .unwrap_err();
        assert!(matches!(err, ChatFrontError::PathRejected(_)));
        assert!(factory
            .derive_file_path(Some("../../etc/passwd"), "report.pdf")
            .is_err());
        assert!(factory
            .derive_file_path(Some("pipe\\1"), "report.pdf")
            .is_err());
    }

    #[test]
    fn test_build_local_node() {
        let factory = SourceNodeFactory::new("cloud", "/api/files/");
        let node = factory.build(
            "n1",
            metadata(json!({"file_name": "guide.md"})),
            "chunk",
            Some(0.8),
        );
        assert_eq!(node.file_name.as_deref(), Some("guide.md"));
        assert_eq!(node.file_path.as_deref(), Some("data/guide.md"));
        assert_eq!(node.url.as_deref(), Some("/api/files/data/guide.md"));
        assert!(!node.is_remote());
    }

    #[test]
    fn test_build_remote_node() {
        let factory = SourceNodeFactory::new("cloud", "/api/files");
        let node = factory.build(
            "n2",
            metadata(json!({"file_name": "a.pdf", "pipeline_id": "p9"})),
            "chunk",
            None,
        );
        assert_eq!(node.file_path.as_deref(), Some("output/cloud/p9$a.pdf"));
        assert_eq!(node.pipeline_id(), Some("p9"));
        assert!(node.is_remote());
    }

    #[test]
    fn test_build_prefers_explicit_url() {
        let factory = SourceNodeFactory::default();
        let node = factory.build(
            "n3",
            metadata(json!({"file_name": "a.pdf", "URL": "https://example.com/a.pdf"})),
            "",
            None,
        );
        assert_eq!(node.url.as_deref(), Some("https://example.com/a.pdf"));
        assert_eq!(node.file_path.as_deref(), Some("data/a.pdf"));
    }

    #[test]
    fn test_build_rejected_name_has_no_path() {
        let factory = SourceNodeFactory::default();
        let node = factory.build(
            "n4",
            metadata(json!({"file_name": "../../etc/passwd"})),
            "secret?",
            Some(0.1),
        );
        assert!(node.file_path.is_none());
        assert!(node.url.is_none());
        assert_eq!(node.text, "secret?");
    }

    #[test]
    fn test_from_raw_shapes() {
        let factory = SourceNodeFactory::default();
        let wrapped = json!({
            "node": {"id_": "a", "metadata": {"file_name": "x.txt"}, "text": "hello"},
            "score": 0.5
        });
        let node = factory.from_raw(&wrapped).unwrap();
        assert_eq!(node.id, "a");
        assert_eq!(node.score, Some(0.5));
        assert_eq!(node.text, "hello");

        let flat = json!({"id": "b", "text": "world", "score": 0.25});
        let node = factory.from_raw(&flat).unwrap();
        assert_eq!(node.id, "b");
        assert_eq!(node.score, Some(0.25));
        assert!(node.file_path.is_none());

        assert!(factory.from_raw(&json!({"text": "no id"})).is_none());
        assert_eq!(
            factory
                .from_raw_nodes(&[wrapped, json!(42), flat])
                .len(),
            2
        );
    }

    #[test]
    fn test_serialization_is_camel_case() {
        let factory = SourceNodeFactory::default();
        let node = factory.build("n", metadata(json!({"file_name": "f.txt"})), "t", None);
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["fileName"], "f.txt");
        assert_eq!(json["filePath"], "data/f.txt");
    }
}
