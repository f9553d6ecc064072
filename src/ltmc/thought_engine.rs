//! Sequential Thought Engine (C11).
//!
//! Reasoning nodes are ULID-identified, SHA-256 content-hashed, and
//! chained by `previous_thought_id` + monotone `step_number` within a
//! session (invariant 4). The canonical node record lives in C1's
//! `thought_nodes` table; each node is additionally persisted as a
//! `thought` Resource via C9 (so it is embedded and searchable), gains a
//! `NEXT` edge in C3, and has its session's head cached in C4 with a 24h
//! TTL (invariant 6).

use crate::ltmc::error::{LtmcError, LtmcResult};
use crate::ltmc::retriever::HybridRetriever;
use crate::ltmc::store::ThoughtNodeRow;
use crate::ltmc::unified_ops::UnifiedOps;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use ulid::Ulid;

#[derive(Debug, Serialize)]
pub struct CreateThoughtResult {
    pub ulid: String,
    pub session_id: String,
    pub content_hash: String,
    pub created_at: String,
    pub databases_affected: Vec<String>,
    pub execution_time_ms: f64,
    pub sla_compliant: bool,
}

#[derive(Debug, Serialize)]
pub struct ChainAnalysis {
    pub counts_by_kind: HashMap<String, usize>,
    pub average_content_length: f64,
    pub has_problem_definition: bool,
    pub has_conclusion: bool,
    pub coherence_score: f64,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeChainResult {
    pub chain_length: usize,
    pub thoughts: Vec<ThoughtNodeRow>,
    pub analysis: ChainAnalysis,
}

#[derive(Debug, Serialize)]
pub struct SimilarThought {
    pub chunk: crate::ltmc::retriever::RetrievedChunk,
    pub session_id: Option<String>,
    pub session_preview: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<AnalyzeChainResult>,
}

pub struct ThoughtEngine {
    ops: Arc<UnifiedOps>,
    retriever: Arc<HybridRetriever>,
}

fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn head_key(session_id: &str) -> String {
    format!("session:{session_id}:head")
}

fn thought_node_id(ulid: &str) -> String {
    format!("thought:{ulid}")
}

fn kind_str(kind: &str) -> LtmcResult<&str> {
    match kind {
        "problem" | "intermediate" | "conclusion" => Ok(kind),
        other => Err(LtmcError::InvalidParams(format!("unknown thought kind: {other}"))),
    }
}

impl ThoughtEngine {
    pub fn new(ops: Arc<UnifiedOps>, retriever: Arc<HybridRetriever>) -> Self {
        Self { ops, retriever }
    }

    pub async fn create(
        &self,
        session_id: &str,
        content: &str,
        kind: &str,
        previous_thought_id: Option<String>,
        step_number: Option<i64>,
        metadata: HashMap<String, String>,
    ) -> LtmcResult<CreateThoughtResult> {
        let kind = kind_str(kind)?;
        let start = std::time::Instant::now();
        let sync = self.ops.sync_coordinator();

        let head = self.session_head(session_id).await?;
        let resolved_step = match step_number {
            Some(s) => s,
            None => head.as_ref().map(|h| h.step_number + 1).unwrap_or(1),
        };

        if let Some(prev_id) = &previous_thought_id {
            let prev = sync.db.get_thought_node(prev_id)?;
            if prev.session_id != session_id {
                return Err(LtmcError::InvalidParams(
                    "previous_thought_id belongs to a different session".into(),
                ));
            }
            if resolved_step != prev.step_number + 1 {
                return Err(LtmcError::InvalidParams(format!(
                    "step_number {resolved_step} does not follow previous step {}",
                    prev.step_number
                )));
            }
        }

        let ulid = Ulid::new().to_string();
        let hash = content_hash(content);

        let mut full_meta = metadata.clone();
        full_meta.insert("session_id".to_string(), session_id.to_string());
        full_meta.insert("kind".to_string(), kind.to_string());
        full_meta.insert("step_number".to_string(), resolved_step.to_string());
        let meta_json = serde_json::to_string(&full_meta).unwrap_or_default();

        let file_name = format!("thought-{ulid}.txt");
        let stored = self.ops.store_document(&file_name, content, "thought")?;

        sync.db.insert_thought_node(
            &ulid,
            session_id,
            resolved_step,
            kind,
            previous_thought_id.as_deref(),
            stored.resource_id,
            &hash,
            &meta_json,
        )?;

        let mut databases_affected = vec!["c1".to_string()];
        if !stored.degraded.vector {
            databases_affected.push("c2".to_string());
        }

        let node_id = thought_node_id(&ulid);
        let mut props = HashMap::new();
        props.insert("session_id".to_string(), session_id.to_string());
        props.insert("step_number".to_string(), resolved_step.to_string());
        let graph_ok = sync.graph_upsert_node("thought", &node_id, props);
        if graph_ok {
            databases_affected.push("c3".to_string());
            if let Some(prev_id) = &previous_thought_id {
                sync.graph_upsert_relation(&thought_node_id(prev_id), &node_id, "NEXT", HashMap::new());
            }
        }

        let cache_ok = sync
            .cache_set(&head_key(session_id), &format!("{ulid}:{resolved_step}"), 86400)
            .await;
        if cache_ok {
            databases_affected.push("c4".to_string());
        }

        let created_at = sync.db.get_thought_node(&ulid)?.created_at;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        Ok(CreateThoughtResult {
            ulid,
            session_id: session_id.to_string(),
            content_hash: hash,
            created_at,
            databases_affected,
            execution_time_ms: elapsed_ms,
            sla_compliant: elapsed_ms <= 100.0,
        })
    }

    /// Prefers C4; a miss (or malformed cache value) falls back to C1,
    /// matching invariant 6's "absence means recompute from C1."
    async fn session_head(&self, session_id: &str) -> LtmcResult<Option<ThoughtNodeRow>> {
        let sync = self.ops.sync_coordinator();
        if let Some(cached) = sync.cache_get(&head_key(session_id)).await {
            if let Some((ulid, _)) = cached.split_once(':') {
                if let Ok(node) = sync.db.get_thought_node(ulid) {
                    return Ok(Some(node));
                }
            }
        }
        sync.db.session_head_from_db(session_id)
    }

    pub fn analyze_chain(&self, session_id: &str) -> LtmcResult<AnalyzeChainResult> {
        let sync = self.ops.sync_coordinator();
        let nodes = sync.db.thought_chain(session_id)?;

        for node in &nodes {
            self.verify_integrity(node)?;
        }

        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut total_len = 0usize;
        let mut has_problem = false;
        let mut has_conclusion = false;
        let mut monotone = true;
        let mut last_step = 0i64;
        for (i, node) in nodes.iter().enumerate() {
            *counts.entry(node.kind.clone()).or_insert(0) += 1;
            if node.kind == "problem" {
                has_problem = true;
            }
            if node.kind == "conclusion" {
                has_conclusion = true;
            }
            if i > 0 && node.step_number <= last_step {
                monotone = false;
            }
            last_step = node.step_number;
            let resource = sync.db.get_resource(node.resource_id)?;
            total_len += resource.content.chars().count();
        }

        let average_content_length = if nodes.is_empty() {
            0.0
        } else {
            total_len as f64 / nodes.len() as f64
        };

        let coherence_score = if nodes.is_empty() {
            0.0
        } else {
            let mut score = 0.0;
            if has_problem {
                score += 0.3;
            }
            if has_conclusion {
                score += 0.3;
            }
            if monotone {
                score += 0.2;
            }
            if average_content_length > 20.0 {
                score += 0.2;
            }
            score
        };

        Ok(AnalyzeChainResult {
            chain_length: nodes.len(),
            thoughts: nodes,
            analysis: ChainAnalysis {
                counts_by_kind: counts,
                average_content_length,
                has_problem_definition: has_problem,
                has_conclusion,
                coherence_score,
            },
        })
    }

    /// Soft-delete a whole session (§3's lifecycle clause): archives every
    /// Resource backing one of its Thought Nodes, append-only nodes
    /// themselves are left in place. Not partial: always the full session.
    pub fn archive_session(&self, session_id: &str) -> LtmcResult<usize> {
        let sync = self.ops.sync_coordinator();
        let nodes = sync.db.thought_chain(session_id)?;
        for node in &nodes {
            sync.db.archive_chunks_by_resource_id(node.resource_id)?;
        }
        Ok(nodes.len())
    }

    fn verify_integrity(&self, node: &ThoughtNodeRow) -> LtmcResult<()> {
        let sync = self.ops.sync_coordinator();
        let resource = sync.db.get_resource(node.resource_id)?;
        let recomputed = content_hash(&resource.content);
        if recomputed != node.content_hash {
            return Err(LtmcError::IntegrityError(format!(
                "content hash mismatch for thought {}",
                node.ulid
            )));
        }
        Ok(())
    }

    pub fn find_similar(
        &self,
        query: &str,
        k: usize,
        include_chains: bool,
    ) -> LtmcResult<Vec<SimilarThought>> {
        let result = self.retriever.retrieve(query, k, Some("thought"), None)?;
        let sync = self.ops.sync_coordinator();
        let mut out = Vec::with_capacity(result.chunks.len());
        for chunk in result.chunks {
            let resource = sync.db.get_resource(chunk.resource_id)?;
            let node = sync.db.thought_node_by_resource_id(chunk.resource_id)?;
            let session_id = node.map(|n| n.session_id);
            let session_preview = preview(&resource.content);
            let chain = match (&session_id, include_chains) {
                (Some(sid), true) => Some(self.analyze_chain(sid)?),
                _ => None,
            };
            out.push(SimilarThought {
                chunk,
                session_id,
                session_preview,
                chain,
            });
        }
        Ok(out)
    }
}

fn preview(content: &str) -> String {
    const PREVIEW_CHARS: usize = 160;
    if content.chars().count() <= PREVIEW_CHARS {
        content.to_string()
    } else {
        let truncated: String = content.chars().take(PREVIEW_CHARS).collect();
        format!("{truncated}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ltmc::chat_linker::ChatLinker;
    use crate::ltmc::config::Config;
    use crate::ltmc::embedding::{EmbeddingFunction, HashingEmbedder};
    use crate::ltmc::retriever::HybridRetriever;
    use crate::ltmc::store::relational::RelationalStore;
    use crate::ltmc::store::vector::VectorIndex;
    use crate::ltmc::sync_coordinator::SyncCoordinator;

    #[test]
    fn content_hash_is_sha256_hex() {
        let h = content_hash("hello");
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }

    fn harness() -> ThoughtEngine {
        let db = Arc::new(RelationalStore::open_in_memory().unwrap());
        let vector = Arc::new(VectorIndex::open("/nonexistent/thought-engine-test.vec", 8));
        let embedder: Arc<dyn EmbeddingFunction> = Arc::new(HashingEmbedder::new(8));
        let cfg = Config::default();
        let sync = Arc::new(SyncCoordinator::new(db.clone(), vector, embedder, &cfg));
        let ops = Arc::new(UnifiedOps::new(sync.clone(), cfg.chunk_size, cfg.chunk_overlap));
        let chat_linker = Arc::new(ChatLinker::new(db));
        let retriever = Arc::new(HybridRetriever::new(
            sync,
            chat_linker,
            cfg.overfetch,
            cfg.recency_tau_secs,
            cfg.context_budget_chars,
        ));
        ThoughtEngine::new(ops, retriever)
    }

    #[tokio::test]
    async fn tampered_content_hash_is_caught_by_analyze_chain() {
        let engine = harness();
        let created = engine
            .create("session-1", "first thought", "problem", None, None, HashMap::new())
            .await
            .unwrap();

        engine
            .ops
            .sync_coordinator()
            .db
            .test_corrupt_thought_hash(&created.ulid, &"0".repeat(64))
            .unwrap();

        let err = engine.analyze_chain("session-1").unwrap_err();
        assert!(matches!(err, LtmcError::IntegrityError(_)));
    }

    #[tokio::test]
    async fn chain_of_three_is_analyzed_in_order() {
        let engine = harness();
        let first = engine
            .create("session-2", "what is the problem", "problem", None, None, HashMap::new())
            .await
            .unwrap();
        let second = engine
            .create(
                "session-2",
                "an intermediate step",
                "intermediate",
                Some(first.ulid.clone()),
                None,
                HashMap::new(),
            )
            .await
            .unwrap();
        engine
            .create(
                "session-2",
                "the conclusion",
                "conclusion",
                Some(second.ulid.clone()),
                None,
                HashMap::new(),
            )
            .await
            .unwrap();

        let analysis = engine.analyze_chain("session-2").unwrap();
        assert_eq!(analysis.chain_length, 3);
        assert!(analysis.analysis.has_problem_definition);
        assert!(analysis.analysis.has_conclusion);
        assert_eq!(analysis.thoughts[0].step_number, 1);
        assert_eq!(analysis.thoughts[2].step_number, 3);
    }
}
