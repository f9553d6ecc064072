//! Hybrid Retriever (C10).
//!
//! `retrieve`: embed the query, overfetch from C2, hydrate and rerank
//! using C1 metadata, assemble a context string, and (if a conversation
//! id is given) log the query and link it to the chunks it used (§4.10).

use crate::ltmc::chat_linker::ChatLinker;
use crate::ltmc::error::LtmcResult;
use crate::ltmc::store::ChunkRow;
use crate::ltmc::sync_coordinator::SyncCoordinator;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize, Clone)]
pub struct RetrievedChunk {
    pub chunk_id: i64,
    pub resource_id: i64,
    pub file_name: String,
    pub score: f64,
}

#[derive(Debug, Serialize)]
pub struct RetrievalResult {
    pub chunks: Vec<RetrievedChunk>,
    pub context: String,
    pub degraded: bool,
}

pub struct HybridRetriever {
    sync: Arc<SyncCoordinator>,
    chat_linker: Arc<ChatLinker>,
    overfetch: usize,
    recency_tau_secs: f64,
    context_budget_chars: usize,
}

impl HybridRetriever {
    pub fn new(
        sync: Arc<SyncCoordinator>,
        chat_linker: Arc<ChatLinker>,
        overfetch: usize,
        recency_tau_secs: f64,
        context_budget_chars: usize,
    ) -> Self {
        Self {
            sync,
            chat_linker,
            overfetch,
            recency_tau_secs,
            context_budget_chars,
        }
    }

    pub fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        type_filter: Option<&str>,
        conversation_id: Option<&str>,
    ) -> LtmcResult<RetrievalResult> {
        let weights = self.sync.db.get_retrieval_weights()?;

        let (mut candidates, degraded) = if self.sync.vector_breaker.allow() && !self.sync.vector.is_degraded() {
            let query_vec = self.sync.embedder.embed_one(query);
            let overfetched = self.sync.vector.search(&query_vec, top_k * self.overfetch);
            if overfetched.is_empty() && self.sync.vector.size() == 0 {
                (Vec::new(), false)
            } else {
                let vids: Vec<i64> = overfetched.iter().map(|s| s.vid).collect();
                let rows = self.sync.db.get_chunks_by_vector_ids(&vids)?;
                let sims: std::collections::HashMap<i64, f32> =
                    overfetched.iter().map(|s| (s.vid, s.score)).collect();
                let scored = rows
                    .into_iter()
                    .filter(|r| !r.archived)
                    .filter(|r| type_filter.map(|t| self.chunk_type(r) == t).unwrap_or(true))
                    .map(|r| {
                        let sim = r.vector_id.and_then(|vid| sims.get(&vid)).copied().unwrap_or(0.0) as f64;
                        let score = self.score(
                            sim,
                            &r,
                            weights.alpha,
                            weights.beta,
                            weights.gamma,
                            weights.delta,
                            weights.epsilon,
                            type_filter,
                        );
                        (r, score)
                    })
                    .collect::<Vec<_>>();
                (scored, false)
            }
        } else {
            // Degraded: recency-only rerank over recently-updated chunks of
            // matching type (beta-only score), per §4.10.
            let rows = self.sync.db.chunks_by_type(type_filter, (top_k * self.overfetch) as i64)?;
            let scored = rows
                .into_iter()
                .map(|r| {
                    let score = self.score(0.0, &r, 0.0, weights.beta, 0.0, 0.0, 0.0, type_filter);
                    (r, score)
                })
                .collect::<Vec<_>>();
            (scored, true)
        };

        candidates.sort_by(|(a_row, a_score), (b_row, b_score)| {
            b_score
                .partial_cmp(a_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(
                    a_row
                        .vector_id
                        .unwrap_or(i64::MAX)
                        .cmp(&b_row.vector_id.unwrap_or(i64::MAX)),
                )
        });
        candidates.truncate(top_k);

        let mut selected = Vec::with_capacity(candidates.len());
        let mut context = String::new();
        let chunk_ids: Vec<i64> = candidates.iter().map(|(r, _)| r.id).collect();
        for (row, score) in &candidates {
            let resource = self.sync.db.get_resource(row.resource_id)?;
            selected.push(RetrievedChunk {
                chunk_id: row.id,
                resource_id: row.resource_id,
                file_name: resource.file_name,
                score: *score,
            });
            if context.len() < self.context_budget_chars {
                if !context.is_empty() {
                    context.push_str("\n---\n");
                }
                context.push_str(&row.text);
            }
        }
        if context.chars().count() > self.context_budget_chars {
            context = context.chars().take(self.context_budget_chars).collect();
        }

        if !chunk_ids.is_empty() {
            self.sync.db.bump_retrieval_count(&chunk_ids)?;
        }

        if let Some(conv) = conversation_id {
            let msg_id = self.chat_linker.log_chat(conv, "user", query, None, None, None)?;
            if !chunk_ids.is_empty() {
                self.chat_linker.store_context_links(msg_id, &chunk_ids)?;
            }
        }

        Ok(RetrievalResult {
            chunks: selected,
            context,
            degraded,
        })
    }

    fn chunk_type(&self, row: &ChunkRow) -> String {
        self.sync
            .db
            .get_resource(row.resource_id)
            .map(|r| r.content_type)
            .unwrap_or_default()
    }

    #[allow(clippy::too_many_arguments)]
    fn score(
        &self,
        sim: f64,
        row: &ChunkRow,
        alpha: f64,
        beta: f64,
        gamma: f64,
        delta: f64,
        epsilon: f64,
        type_filter: Option<&str>,
    ) -> f64 {
        let recency = self.recency(&row.created_at);
        let frequency = (1.0 + row.retrieval_count as f64).ln() / (1.0 + 1000f64).ln();
        let length_boost = length_boost(row.text.chars().count());
        let type_boost = if type_filter.map(|t| self.chunk_type(row) == t).unwrap_or(false) {
            1.0
        } else {
            0.0
        };
        alpha * sim + beta * recency + gamma * frequency.min(1.0) + delta * length_boost + epsilon * type_boost
    }

    fn recency(&self, created_at: &str) -> f64 {
        let created: DateTime<Utc> = created_at.parse().unwrap_or_else(|_| Utc::now());
        let age_secs = (Utc::now() - created).num_seconds().max(0) as f64;
        (-age_secs / self.recency_tau_secs).exp()
    }
}

/// Saturating function favoring mid-length chunks (peaks around 500 chars,
/// tapers for very short or very long ones).
fn length_boost(len: usize) -> f64 {
    let x = len as f64 / 500.0;
    (x.min(2.0 - x)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_boost_peaks_at_mid_length() {
        assert!(length_boost(500) > length_boost(10));
        assert!(length_boost(500) > length_boost(5000));
    }
}
