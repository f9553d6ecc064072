//! Chunker (C6).
//!
//! Splits a document into overlapping windows of target size `T` with
//! overlap `O`, preferring paragraph, then sentence, then whitespace
//! boundaries (§4.6). Never exceeds `T` by more than 10%, never produces a
//! chunk smaller than `O` unless it is the entire input, and is idempotent:
//! identical input always yields the identical chunk sequence.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
}

pub struct Chunker {
    target: usize,
    overlap: usize,
}

impl Chunker {
    pub fn new(target: usize, overlap: usize) -> Self {
        Self { target, overlap }
    }

    pub fn chunk(&self, document: &str) -> Vec<Chunk> {
        if document.is_empty() {
            return Vec::new();
        }
        if document.chars().count() <= self.target {
            return vec![Chunk {
                index: 0,
                text: document.to_string(),
            }];
        }

        let max_len = self.target + self.target / 10;
        let chars: Vec<char> = document.chars().collect();
        let mut chunks = Vec::new();
        let mut start = 0usize;
        let mut index = 0usize;

        while start < chars.len() {
            let remaining = chars.len() - start;
            let window = remaining.min(max_len);
            let mut end = start + window;

            if end < chars.len() {
                end = self
                    .best_boundary(&chars, start, end)
                    .unwrap_or(end);
            } else {
                end = chars.len();
            }

            let text: String = chars[start..end].iter().collect();
            chunks.push(Chunk {
                index,
                text,
            });
            index += 1;

            if end >= chars.len() {
                break;
            }

            // Step forward so the next window overlaps the tail of this one
            // by `overlap` characters, unless that would not advance at all.
            let next_start = end.saturating_sub(self.overlap);
            start = if next_start > start { next_start } else { end };
        }

        chunks
    }

    /// Searches backward from `preferred_end` (bounded by `start + overlap`,
    /// so a chunk is never pushed below the overlap floor) for the latest
    /// paragraph break, else sentence break, else whitespace.
    fn best_boundary(&self, chars: &[char], start: usize, preferred_end: usize) -> Option<usize> {
        let floor = start + self.overlap.min(preferred_end - start);

        if let Some(p) = rfind_in(chars, floor, preferred_end, |w| w == ['\n', '\n']) {
            return Some(p);
        }
        if let Some(p) = rfind_sentence(chars, floor, preferred_end) {
            return Some(p);
        }
        if let Some(p) = rfind_whitespace(chars, floor, preferred_end) {
            return Some(p);
        }
        None
    }
}

fn rfind_in<const N: usize>(
    chars: &[char],
    floor: usize,
    end: usize,
    pat: impl Fn([char; N]) -> bool,
) -> Option<usize> {
    if end < N || floor + N > end {
        return None;
    }
    for i in (floor..=end - N).rev() {
        let mut window = ['\0'; N];
        window.copy_from_slice(&chars[i..i + N]);
        if pat(window) {
            return Some(i + N);
        }
    }
    None
}

fn rfind_sentence(chars: &[char], floor: usize, end: usize) -> Option<usize> {
    for i in (floor..end).rev() {
        if matches!(chars[i], '.' | '!' | '?') {
            return Some(i + 1);
        }
    }
    None
}

fn rfind_whitespace(chars: &[char], floor: usize, end: usize) -> Option<usize> {
    for i in (floor..end).rev() {
        if chars[i].is_whitespace() {
            return Some(i + 1);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_document_is_a_single_chunk() {
        let c = Chunker::new(512, 50);
        let chunks = c.chunk("a short document");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
    }

    #[test]
    fn empty_document_yields_no_chunks() {
        let c = Chunker::new(512, 50);
        assert!(c.chunk("").is_empty());
    }

    #[test]
    fn chunking_is_idempotent() {
        let c = Chunker::new(64, 8);
        let doc = "one. two. three. four. five. six. seven. eight. nine. ten. eleven. twelve.";
        let a = c.chunk(doc);
        let b = c.chunk(doc);
        assert_eq!(a, b);
    }

    #[test]
    fn chunk_indices_are_sequential_from_zero() {
        let c = Chunker::new(16, 4);
        let doc = "a ".repeat(40);
        let chunks = c.chunk(&doc);
        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
        }
    }

    #[test]
    fn no_chunk_exceeds_target_by_more_than_ten_percent() {
        let c = Chunker::new(20, 5);
        let doc = "x".repeat(200);
        let chunks = c.chunk(&doc);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 22);
        }
    }
}
