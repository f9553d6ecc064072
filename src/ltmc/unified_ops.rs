//! Unified Operations (C9).
//!
//! A thin orchestration layer over the Sync Coordinator presenting the
//! high-level primitives the rest of the system (retriever, thought
//! engine, RPC tool handlers) call instead of touching C1-C4 directly.

use crate::ltmc::chunker::Chunker;
use crate::ltmc::error::LtmcResult;
use crate::ltmc::store::{DegradedStatus, Resource};
use crate::ltmc::sync_coordinator::SyncCoordinator;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct StoreDocumentResult {
    pub resource_id: i64,
    pub chunk_ids: Vec<i64>,
    pub vector_ids: Vec<i64>,
    pub degraded: DegradedStatus,
}

pub struct UnifiedOps {
    sync: Arc<SyncCoordinator>,
    chunker: Chunker,
}

impl UnifiedOps {
    pub fn new(sync: Arc<SyncCoordinator>, chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            sync,
            chunker: Chunker::new(chunk_size, chunk_overlap),
        }
    }

    pub fn store_document(
        &self,
        file_name: &str,
        content: &str,
        content_type: &str,
    ) -> LtmcResult<StoreDocumentResult> {
        let chunks = self.chunker.chunk(content);
        let result = self.sync.ingest(file_name, content_type, content, &chunks)?;
        Ok(StoreDocumentResult {
            resource_id: result.resource_id,
            chunk_ids: result.chunk_ids,
            vector_ids: result.vector_ids,
            degraded: result.degraded,
        })
    }

    pub fn get_document(&self, resource_id: i64) -> LtmcResult<Resource> {
        self.sync.db.get_resource(resource_id)
    }

    pub fn delete_document(&self, resource_id: i64) -> LtmcResult<DegradedStatus> {
        self.sync.delete(resource_id)
    }

    pub fn link(
        &self,
        src: &str,
        dst: &str,
        relation_type: &str,
        props: std::collections::HashMap<String, String>,
    ) -> bool {
        self.sync.graph_upsert_relation(src, dst, relation_type, props)
    }

    pub fn sync_coordinator(&self) -> Arc<SyncCoordinator> {
        self.sync.clone()
    }
}
