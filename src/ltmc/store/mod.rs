//! Storage tier: the required relational store (C1) plus the optional
//! vector (C2), graph (C3), and cache (C4) adapters, and the circuit
//! breaker shared by the optional ones.

pub mod breaker;
pub mod relational;
pub mod vector;

#[cfg(feature = "graph")]
pub mod graph;

#[cfg(feature = "cache")]
pub mod cache;

use serde::{Deserialize, Serialize};

/// Returned by every write method of C9 (§4.9): which optional stores did
/// not accept this write. `false` in every field means full consistency.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DegradedStatus {
    pub vector: bool,
    pub graph: bool,
    pub cache: bool,
}

impl DegradedStatus {
    pub fn any(&self) -> bool {
        self.vector || self.graph || self.cache
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: i64,
    pub file_name: String,
    pub content_type: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRow {
    pub id: i64,
    pub resource_id: i64,
    pub chunk_index: i64,
    pub text: String,
    pub vector_id: Option<i64>,
    pub archived: bool,
    pub created_at: String,
    pub retrieval_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub conversation_id: String,
    pub role: String,
    pub content: String,
    pub agent: Option<String>,
    pub source_tool: Option<String>,
    pub metadata: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextLink {
    pub message_id: i64,
    pub chunk_id: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThoughtNodeRow {
    pub ulid: String,
    pub session_id: String,
    pub step_number: i64,
    pub kind: String,
    pub previous_thought_id: Option<String>,
    pub resource_id: i64,
    pub content_hash: String,
    pub metadata: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalWeights {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub delta: f64,
    pub epsilon: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairQueueEntry {
    pub id: i64,
    pub resource_id: i64,
    pub chunk_id: i64,
    pub vector_id: i64,
    pub text: String,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub created_at: String,
}

pub fn now_iso8601() -> String {
    chrono::Utc::now().to_rfc3339()
}
