//! Consistency Manager (C8).
//!
//! Post-write verification, repair-queue drainage, and an optional
//! staleness heuristic (§4.8). `drift_score` is explicitly a heuristic,
//! not a precise algorithm: the embedding model is out of scope for this
//! non-semantic use, so it falls back to normalized token-overlap.

use crate::ltmc::error::LtmcResult;
use crate::ltmc::sync_coordinator::SyncCoordinator;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct VerifyReport {
    pub resource_id: i64,
    pub chunks_checked: usize,
    pub missing_vectors: Vec<i64>,
    pub missing_graph_node: bool,
}

#[derive(Debug, Serialize, Default)]
pub struct RepairReport {
    pub repaired: usize,
    pub quarantined: usize,
}

const MAX_REPAIR_ATTEMPTS: i64 = 5;

pub struct ConsistencyManager {
    sync: Arc<SyncCoordinator>,
}

impl ConsistencyManager {
    pub fn new(sync: Arc<SyncCoordinator>) -> Self {
        Self { sync }
    }

    /// Checks that every Chunk of `resource_id` either has a live vector in
    /// C2 or is queued for repair, and (if graph is enabled) has a
    /// matching node in C3.
    pub fn verify(&self, resource_id: i64) -> LtmcResult<VerifyReport> {
        let chunks: Vec<_> = self
            .sync
            .db
            .chunks_by_type(None, i64::MAX)?
            .into_iter()
            .filter(|c| c.resource_id == resource_id)
            .collect();

        let queued: HashSet<i64> = self
            .sync
            .db
            .repair_queue_fifo(i64::MAX)?
            .into_iter()
            .map(|e| e.vector_id)
            .collect();

        let mut missing_vectors = Vec::new();
        for chunk in &chunks {
            if let Some(vid) = chunk.vector_id {
                if !self.vector_present(vid) && !queued.contains(&vid) {
                    missing_vectors.push(vid);
                }
            }
        }

        let missing_graph_node = !self
            .sync
            .graph_upsert_node("resource", &format!("resource:{resource_id}"), Default::default());

        Ok(VerifyReport {
            resource_id,
            chunks_checked: chunks.len(),
            missing_vectors,
            missing_graph_node,
        })
    }

    fn vector_present(&self, vid: i64) -> bool {
        // The vector index does not expose a direct id lookup (only
        // search), so probe via a zero-length query is not meaningful;
        // instead rely on index size as a coarse signal and let `repair`
        // re-add unconditionally since `add` is idempotent by id.
        vid < self.sync.vector.size() as i64
    }

    /// Drains the repair queue FIFO, re-embedding and re-adding missing
    /// vectors. Entries past `MAX_REPAIR_ATTEMPTS` are quarantined
    /// (left in the table, surfaced via health, no longer retried here).
    pub fn repair(&self, batch_size: i64) -> LtmcResult<RepairReport> {
        let mut report = RepairReport::default();
        let entries = self.sync.db.repair_queue_fifo(batch_size)?;
        for entry in entries {
            if entry.attempts >= MAX_REPAIR_ATTEMPTS {
                report.quarantined += 1;
                continue;
            }
            let embedding = self.sync.embedder.embed_one(&entry.text);
            let accepted = self.sync.vector.add(entry.vector_id, embedding);
            if accepted {
                self.sync.db.remove_repair_entry(entry.id)?;
                report.repaired += 1;
            } else {
                self.sync
                    .db
                    .bump_repair_attempt(entry.id, "vector index still degraded")?;
            }
        }
        Ok(report)
    }

    /// Cheap heuristic: normalized token-overlap distance between stored
    /// content and a supplied comparison text, in `[0, 1]` where `0` means
    /// identical token sets and `1` means no overlap at all.
    pub fn drift_score(stored: &str, comparison: &str) -> f64 {
        let a: HashSet<&str> = stored.split_whitespace().collect();
        let b: HashSet<&str> = comparison.split_whitespace().collect();
        if a.is_empty() && b.is_empty() {
            return 0.0;
        }
        let intersection = a.intersection(&b).count();
        let union = a.union(&b).count();
        if union == 0 {
            return 0.0;
        }
        1.0 - (intersection as f64 / union as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drift_score_is_zero_for_identical_text() {
        assert_eq!(ConsistencyManager::drift_score("a b c", "a b c"), 0.0);
    }

    #[test]
    fn drift_score_is_one_for_disjoint_text() {
        assert_eq!(ConsistencyManager::drift_score("a b c", "x y z"), 1.0);
    }

    #[test]
    fn drift_score_is_between_zero_and_one_for_partial_overlap() {
        let score = ConsistencyManager::drift_score("a b c", "a b x");
        assert!(score > 0.0 && score < 1.0);
    }
}
