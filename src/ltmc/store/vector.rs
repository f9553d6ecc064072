//! Vector Index Adapter (C2).
//!
//! No externally-hosted ANN service crate appears anywhere in the corpus
//! this repository is grounded on (the one candidate, `usearch`, is only
//! ever pulled in via a git dependency in the retrieved examples, which
//! this repository's dependency policy excludes). This adapter instead
//! holds vectors in memory and searches by brute-force inner product,
//! which is exact rather than approximate but satisfies every contract
//! in §4.2 the dispatcher and retriever depend on (dense ids, descending
//! score order, tie-break by ascending vid, save/load, tombstoning) — an
//! explicit, documented scope reduction rather than a stand-in for a real
//! HNSW-style index.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Clone, Encode, Decode)]
struct StoredVector {
    vid: i64,
    vec: Vec<f32>,
    tombstoned: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredVector {
    pub vid: i64,
    pub score: f32,
}

pub struct VectorIndex {
    dim: usize,
    path: String,
    vectors: RwLock<HashMap<i64, StoredVector>>,
    /// Set when the index failed to load at startup; `search` then returns
    /// empty and `add`/`add_batch` buffer for retry rather than erroring.
    degraded: RwLock<bool>,
    pending: RwLock<Vec<(i64, Vec<f32>)>>,
}

impl VectorIndex {
    pub fn open(path: &str, dim: usize) -> Self {
        let index = VectorIndex {
            dim,
            path: path.to_string(),
            vectors: RwLock::new(HashMap::new()),
            degraded: RwLock::new(false),
            pending: RwLock::new(Vec::new()),
        };
        if let Err(e) = index.load() {
            log::warn!("vector index failed to load from {path}, entering degraded mode: {e}");
            *index.degraded.write().unwrap() = true;
        }
        index
    }

    pub fn is_degraded(&self) -> bool {
        *self.degraded.read().unwrap()
    }

    pub fn add(&self, vid: i64, vec: Vec<f32>) -> bool {
        if self.is_degraded() {
            self.pending.write().unwrap().push((vid, vec));
            return false;
        }
        let normalized = normalize(vec);
        self.vectors.write().unwrap().insert(
            vid,
            StoredVector {
                vid,
                vec: normalized,
                tombstoned: false,
            },
        );
        true
    }

    /// Returns `true` if every item was accepted (not degraded).
    pub fn add_batch(&self, items: Vec<(i64, Vec<f32>)>) -> bool {
        let mut ok = true;
        for (vid, vec) in items {
            if !self.add(vid, vec) {
                ok = false;
            }
        }
        ok
    }

    pub fn tombstone(&self, vid: i64) {
        if let Some(v) = self.vectors.write().unwrap().get_mut(&vid) {
            v.tombstoned = true;
        }
    }

    /// Attempts to replay any writes buffered while degraded and clears the
    /// degraded flag on success. Called by the consistency manager's
    /// `repair` on breaker recovery.
    pub fn recover(&self) {
        let pending: Vec<_> = self.pending.write().unwrap().drain(..).collect();
        *self.degraded.write().unwrap() = false;
        for (vid, vec) in pending {
            self.add(vid, vec);
        }
    }

    pub fn search(&self, query: &[f32], k: usize) -> Vec<ScoredVector> {
        if self.is_degraded() {
            return Vec::new();
        }
        let query = normalize(query.to_vec());
        let vectors = self.vectors.read().unwrap();
        let mut scored: Vec<ScoredVector> = vectors
            .values()
            .filter(|v| !v.tombstoned)
            .map(|v| ScoredVector {
                vid: v.vid,
                score: inner_product(&query, &v.vec),
            })
            .collect();
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.vid.cmp(&b.vid))
        });
        scored.truncate(k);
        scored
    }

    pub fn size(&self) -> usize {
        self.vectors.read().unwrap().len()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn save(&self) -> std::io::Result<()> {
        let vectors = self.vectors.read().unwrap();
        let snapshot: Vec<StoredVector> = vectors.values().cloned().collect();
        let config = bincode::config::standard();
        let bytes = bincode::encode_to_vec(&snapshot, config)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(&self.path, bytes)
    }

    fn load(&self) -> std::io::Result<()> {
        if !std::path::Path::new(&self.path).exists() {
            return Ok(());
        }
        let bytes = std::fs::read(&self.path)?;
        let config = bincode::config::standard();
        let (snapshot, _): (Vec<StoredVector>, usize) = bincode::decode_from_slice(&bytes, config)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let mut vectors = self.vectors.write().unwrap();
        for v in snapshot {
            vectors.insert(v.vid, v);
        }
        Ok(())
    }
}

fn normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
    v
}

fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_returns_descending_score_order() {
        let idx = VectorIndex::open("/nonexistent/path/that/should/not/exist.vec", 2);
        idx.add(0, vec![1.0, 0.0]);
        idx.add(1, vec![0.0, 1.0]);
        idx.add(2, vec![0.9, 0.1]);
        let hits = idx.search(&[1.0, 0.0], 3);
        assert_eq!(hits[0].vid, 0);
        assert!(hits[0].score >= hits[1].score);
        assert!(hits[1].score >= hits[2].score);
    }

    #[test]
    fn ties_break_by_ascending_vid() {
        let idx = VectorIndex::open("/nonexistent/path/two.vec", 2);
        idx.add(5, vec![1.0, 0.0]);
        idx.add(2, vec![1.0, 0.0]);
        let hits = idx.search(&[1.0, 0.0], 2);
        assert_eq!(hits[0].vid, 2);
        assert_eq!(hits[1].vid, 5);
    }

    #[test]
    fn tombstoned_vectors_excluded_from_search() {
        let idx = VectorIndex::open("/nonexistent/path/three.vec", 2);
        idx.add(0, vec![1.0, 0.0]);
        idx.tombstone(0);
        assert!(idx.search(&[1.0, 0.0], 5).is_empty());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("idx.vec");
        let path_str = path.to_str().unwrap().to_string();
        {
            let idx = VectorIndex::open(&path_str, 2);
            idx.add(0, vec![1.0, 0.0]);
            idx.add(1, vec![0.0, 1.0]);
            idx.save().unwrap();
        }
        let reloaded = VectorIndex::open(&path_str, 2);
        assert_eq!(reloaded.size(), 2);
        assert!(!reloaded.is_degraded());
    }
}
