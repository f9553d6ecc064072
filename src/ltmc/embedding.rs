//! Embedding Function (C5).
//!
//! §4.5 treats the embedding function as opaque: `embed([text]) -> [R^d]`,
//! deterministic, unit-norm, batchable. No ML runtime crate appears
//! anywhere in the corpus this repository is grounded on, so this adapter
//! implements the contract with a deterministic, dependency-free hashing
//! scheme (seeded per output dimension from a SHA-256 digest of the text)
//! rather than embed a real model. It satisfies every testable property
//! the spec states about embeddings (determinism, fixed dimension,
//! unit-norm) without claiming semantic quality — swapping in a real model
//! later only requires a new `EmbeddingFunction` impl.

use sha2::{Digest, Sha256};

pub trait EmbeddingFunction: Send + Sync {
    fn dim(&self) -> usize;

    /// Embeds a batch of texts, one vector per input, each unit-norm.
    fn embed(&self, texts: &[String]) -> Vec<Vec<f32>>;

    fn embed_one(&self, text: &str) -> Vec<f32> {
        self.embed(&[text.to_string()]).pop().unwrap_or_default()
    }
}

/// Deterministic hashing embedder. Each output dimension is derived from a
/// SHA-256 digest of `text` concatenated with the dimension index, mapped
/// into `[-1, 1]`, then the whole vector is L2-normalized.
pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    fn raw_embed(&self, text: &str) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.dim);
        for i in 0..self.dim {
            let mut hasher = Sha256::new();
            hasher.update(text.as_bytes());
            hasher.update(i.to_le_bytes());
            let digest = hasher.finalize();
            // Use the first 8 bytes as a u64, map to [-1, 1].
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&digest[0..8]);
            let bits = u64::from_le_bytes(buf);
            let unit = (bits as f64) / (u64::MAX as f64); // [0, 1]
            out.push((unit * 2.0 - 1.0) as f32);
        }
        out
    }
}

impl EmbeddingFunction for HashingEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, texts: &[String]) -> Vec<Vec<f32>> {
        texts
            .iter()
            .map(|t| normalize(self.raw_embed(t)))
            .collect()
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_is_deterministic() {
        let e = HashingEmbedder::new(384);
        let a = e.embed_one("hello world");
        let b = e.embed_one("hello world");
        assert_eq!(a, b);
    }

    #[test]
    fn embedding_has_configured_dimension() {
        let e = HashingEmbedder::new(16);
        assert_eq!(e.embed_one("x").len(), 16);
        assert_eq!(e.dim(), 16);
    }

    #[test]
    fn embedding_is_unit_norm() {
        let e = HashingEmbedder::new(384);
        let v = e.embed_one("some resource text");
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn different_texts_differ() {
        let e = HashingEmbedder::new(384);
        assert_ne!(e.embed_one("alpha"), e.embed_one("beta"));
    }
}
