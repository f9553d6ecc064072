//! The ten tools in the fixed catalog (§6), each dispatching its own
//! `action` string. Every handler is constructed from an [`AppState`]
//! shared across the whole process.

pub mod cache_tool;
pub mod chat_tool;
pub mod config_tool;
pub mod context_links_tool;
pub mod graph_tool;
pub mod memory_tool;
pub mod pattern_tool;
pub mod sync_tool;
pub mod thought_tool;
pub mod todo_tool;

use crate::ltmc::chat_linker::ChatLinker;
use crate::ltmc::consistency::ConsistencyManager;
use crate::ltmc::observability::Observability;
use crate::ltmc::retriever::HybridRetriever;
use crate::ltmc::sync_coordinator::SyncCoordinator;
use crate::ltmc::thought_engine::ThoughtEngine;
use crate::ltmc::unified_ops::UnifiedOps;
use std::sync::Arc;

/// Process-wide handles every tool handler is built from, owned by the
/// lifecycle root and cloned (cheaply, via `Arc`) into each handler.
#[derive(Clone)]
pub struct AppState {
    pub sync: Arc<SyncCoordinator>,
    pub ops: Arc<UnifiedOps>,
    pub retriever: Arc<HybridRetriever>,
    pub chat_linker: Arc<ChatLinker>,
    pub consistency: Arc<ConsistencyManager>,
    pub thought_engine: Arc<ThoughtEngine>,
    pub observability: Arc<Observability>,
}
