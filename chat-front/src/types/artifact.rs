//! Artifacts: generated deliverables persisted inline in the transcript.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Code,
    Document,
}

/// A code file or document produced during a turn.
///
/// Artifacts are totally ordered by `created_at` (epoch milliseconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Artifact {
    pub created_at: i64,
    #[serde(rename = "type")]
    pub kind: ArtifactKind,
    pub data: Map<String, Value>,
}

impl Artifact {
    /// Create an artifact stamped with the current time
    pub fn new(kind: ArtifactKind, data: Map<String, Value>) -> Self {
        Self {
            created_at: chrono::Utc::now().timestamp_millis(),
            kind,
            data,
        }
    }

    pub fn with_created_at(mut self, created_at: i64) -> Self {
        self.created_at = created_at;
        self
    }
}

/// The artifact of `kind` with the greatest `created_at`; on ties the later one wins.
pub fn latest_of_kind(
    artifacts: impl IntoIterator<Item = Artifact>,
    kind: ArtifactKind,
) -> Option<Artifact> {
    artifacts
        .into_iter()
        .filter(|a| a.kind == kind)
        .max_by_key(|a| a.created_at)
}
