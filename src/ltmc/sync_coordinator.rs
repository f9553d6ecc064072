//! Sync Coordinator (C7).
//!
//! Executes a write across C1-C4 in fixed order (C1 -> C2 -> C3 -> C4),
//! per invariant 7 and §4.7's rollback rule: only C1 is transactional and
//! required, so "rollback" means aborting the C1 transaction before any
//! side effect elsewhere becomes visible — C1 work always completes
//! first, and the optional stores are only ever touched after C1 commits.
//! Each optional store sits behind its own circuit breaker; a tripped
//! breaker degrades that store without failing the request.

use crate::ltmc::chunker::Chunk;
use crate::ltmc::config::Config;
use crate::ltmc::embedding::EmbeddingFunction;
use crate::ltmc::error::LtmcResult;
use crate::ltmc::store::breaker::CircuitBreaker;
use crate::ltmc::store::relational::RelationalStore;
use crate::ltmc::store::vector::VectorIndex;
use crate::ltmc::store::DegradedStatus;
use std::collections::HashMap;
use std::sync::Arc;

#[cfg(feature = "graph")]
use crate::ltmc::store::graph::{EdgeDirection, GraphStore};

#[cfg(feature = "cache")]
use crate::ltmc::store::cache::CacheAdapter;

pub struct SyncCoordinator {
    pub db: Arc<RelationalStore>,
    pub vector: Arc<VectorIndex>,
    pub embedder: Arc<dyn EmbeddingFunction>,

    #[cfg(feature = "graph")]
    pub graph: Option<Arc<GraphStore>>,
    #[cfg(feature = "cache")]
    pub cache: Option<Arc<CacheAdapter>>,

    pub vector_breaker: Arc<CircuitBreaker>,
    pub graph_breaker: Arc<CircuitBreaker>,
    pub cache_breaker: Arc<CircuitBreaker>,
}

/// Result of fanning out the embedding+vector half of an ingest.
pub struct IngestResult {
    pub resource_id: i64,
    pub chunk_ids: Vec<i64>,
    pub vector_ids: Vec<i64>,
    pub degraded: DegradedStatus,
}

impl SyncCoordinator {
    pub fn new(
        db: Arc<RelationalStore>,
        vector: Arc<VectorIndex>,
        embedder: Arc<dyn EmbeddingFunction>,
        cfg: &Config,
    ) -> Self {
        Self {
            db,
            vector,
            embedder,
            #[cfg(feature = "graph")]
            graph: None,
            #[cfg(feature = "cache")]
            cache: None,
            vector_breaker: Arc::new(CircuitBreaker::new(cfg.breaker_fails, cfg.breaker_cooldown)),
            graph_breaker: Arc::new(CircuitBreaker::new(cfg.breaker_fails, cfg.breaker_cooldown)),
            cache_breaker: Arc::new(CircuitBreaker::new(cfg.breaker_fails, cfg.breaker_cooldown)),
        }
    }

    /// Step 1 of §4.7's write protocol: begin-and-commit the C1
    /// transaction (resource row + N chunk rows with allocated vector
    /// ids), then best-effort fan out to C2/C3/C4. C1 failure propagates
    /// as `WriteFailed`; nothing becomes visible anywhere in that case.
    pub fn ingest(
        &self,
        file_name: &str,
        content_type: &str,
        content: &str,
        chunks: &[Chunk],
    ) -> LtmcResult<IngestResult> {
        let resource_id = self.db.create_resource(file_name, content_type, content)?;
        let vector_ids = self.db.next_vector_ids(chunks.len() as i64)?;
        let rows: Vec<(i64, String, Option<i64>)> = chunks
            .iter()
            .zip(vector_ids.iter())
            .map(|(c, vid)| (c.index as i64, c.text.clone(), Some(*vid)))
            .collect();
        let chunk_ids = self.db.upsert_chunks(resource_id, &rows)?;

        let mut degraded = DegradedStatus::default();

        // C2: embed and add. Failure trips the breaker and queues a repair
        // entry per chunk rather than failing the request (§4.7 step 2).
        if self.vector_breaker.allow() {
            let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
            let embeddings = self.embedder.embed(&texts);
            let batch: Vec<(i64, Vec<f32>)> = vector_ids
                .iter()
                .zip(embeddings.into_iter())
                .map(|(vid, v)| (*vid, v))
                .collect();
            let accepted = self.vector.add_batch(batch);
            if accepted {
                self.vector_breaker.record_success();
            } else {
                self.vector_breaker.record_failure();
                degraded.vector = true;
                for ((chunk_id, vid), chunk) in chunk_ids.iter().zip(vector_ids.iter()).zip(chunks.iter()) {
                    let _ = self.db.enqueue_repair(
                        resource_id,
                        *chunk_id,
                        *vid,
                        &chunk.text,
                        "vector index degraded at write time",
                    );
                }
            }
        } else {
            degraded.vector = true;
            for ((chunk_id, vid), chunk) in chunk_ids.iter().zip(vector_ids.iter()).zip(chunks.iter()) {
                let _ = self.db.enqueue_repair(
                    resource_id,
                    *chunk_id,
                    *vid,
                    &chunk.text,
                    "vector breaker open",
                );
            }
        }

        // C3: upsert a node per resource. No repair queue entry on failure;
        // the graph is derivable from C1 and rebuildable (§4.7 step 3).
        if !self.graph_upsert_node("resource", &format!("resource:{resource_id}"), HashMap::new()) {
            degraded.graph = true;
        }

        Ok(IngestResult {
            resource_id,
            chunk_ids,
            vector_ids,
            degraded,
        })
    }

    /// Mirror delete order (§4.7): cache invalidate, graph detach, vector
    /// tombstone, then the C1 transaction itself.
    pub fn delete(&self, resource_id: i64) -> LtmcResult<DegradedStatus> {
        let mut degraded = DegradedStatus::default();

        let _ = self.cache_del(&format!("resource:{resource_id}:meta"));

        #[cfg(feature = "graph")]
        {
            if self.graph.is_some() && !self.graph_breaker.allow() {
                degraded.graph = true;
            }
        }

        let chunks = self.db.chunks_by_resource_id(resource_id).unwrap_or_default();
        for chunk in chunks {
            if let Some(vid) = chunk.vector_id {
                self.vector.tombstone(vid);
            }
        }

        self.db.delete_resource(resource_id)?;
        Ok(degraded)
    }

    #[cfg(feature = "graph")]
    pub fn graph_upsert_node(&self, kind: &str, id: &str, props: HashMap<String, String>) -> bool {
        let Some(graph) = &self.graph else { return true };
        if !self.graph_breaker.allow() {
            return false;
        }
        graph.upsert_node(kind, id, props);
        self.graph_breaker.record_success();
        true
    }

    #[cfg(not(feature = "graph"))]
    pub fn graph_upsert_node(&self, _kind: &str, _id: &str, _props: HashMap<String, String>) -> bool {
        true
    }

    #[cfg(feature = "graph")]
    pub fn graph_upsert_relation(&self, src: &str, dst: &str, edge_type: &str, props: HashMap<String, String>) -> bool {
        let Some(graph) = &self.graph else { return true };
        if !self.graph_breaker.allow() {
            return false;
        }
        let ok = graph.upsert_relation(src, dst, edge_type, props);
        if ok {
            self.graph_breaker.record_success();
        } else {
            self.graph_breaker.record_failure();
        }
        ok
    }

    #[cfg(not(feature = "graph"))]
    pub fn graph_upsert_relation(&self, _src: &str, _dst: &str, _edge_type: &str, _props: HashMap<String, String>) -> bool {
        true
    }

    #[cfg(feature = "graph")]
    pub fn graph_relations(&self, id: &str, edge_type: Option<&str>, direction: EdgeDirection) -> Option<Vec<crate::ltmc::store::graph::RelationView>> {
        let graph = self.graph.as_ref()?;
        if !self.graph_breaker.allow() {
            return None;
        }
        Some(graph.get_relations(id, edge_type, direction))
    }

    #[cfg(feature = "cache")]
    pub async fn cache_set(&self, key: &str, value: &str, ttl_secs: u64) -> bool {
        let Some(cache) = &self.cache else { return false };
        if !self.cache_breaker.allow() {
            return false;
        }
        match cache.set_ex(key, value, ttl_secs).await {
            Ok(()) => {
                self.cache_breaker.record_success();
                true
            }
            Err(_) => {
                self.cache_breaker.record_failure();
                false
            }
        }
    }

    #[cfg(not(feature = "cache"))]
    pub async fn cache_set(&self, _key: &str, _value: &str, _ttl_secs: u64) -> bool {
        false
    }

    #[cfg(feature = "cache")]
    pub async fn cache_get(&self, key: &str) -> Option<String> {
        let cache = self.cache.as_ref()?;
        if !self.cache_breaker.allow() {
            return None;
        }
        match cache.get(key).await {
            Ok(v) => {
                self.cache_breaker.record_success();
                v
            }
            Err(_) => {
                self.cache_breaker.record_failure();
                None
            }
        }
    }

    #[cfg(not(feature = "cache"))]
    pub async fn cache_get(&self, _key: &str) -> Option<String> {
        None
    }

    #[cfg(feature = "cache")]
    pub fn cache_del(&self, key: &str) -> bool {
        let Some(cache) = self.cache.clone() else { return false };
        let key = key.to_string();
        // Fire-and-forget from sync contexts (delete path is currently
        // invoked synchronously); best-effort per §4.4's failure semantics.
        tokio::spawn(async move {
            let _ = cache.del(&key).await;
        });
        true
    }

    #[cfg(not(feature = "cache"))]
    pub fn cache_del(&self, _key: &str) -> bool {
        false
    }
}
