//! Deterministic pseudo-embeddings.
//!
//! Text is hashed with SHA-256 and the digest bytes are tiled out to the
//! requested dimension. The result is stable for a given input but carries no
//! semantic meaning: near-identical strings map to unrelated vectors.

use sha2::{Digest, Sha256};

/// Dimension used by the service's vector store.
pub const EMBED_DIM: usize = 128;

/// Added to both norms so all-zero vectors never divide by zero.
const NORM_EPSILON: f64 = 1e-12;

/// Maps `text` to `dim` values in `[-0.5, 0.5]` via `byte / 255 - 0.5`.
pub fn text_to_embedding(text: &str, dim: usize) -> Vec<f32> {
    let digest = Sha256::digest(text.as_bytes());

    digest
        .iter()
        .cycle()
        .take(dim)
        .map(|&byte| byte as f32 / 255.0 - 0.5)
        .collect()
}

/// [`text_to_embedding`] at [`EMBED_DIM`].
pub fn embed(text: &str) -> Vec<f32> {
    text_to_embedding(text, EMBED_DIM)
}

/// Cosine of the angle between `a` and `b`.
///
/// Both slices must have the same length; the vector store checks this
/// before calling.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    (dot / ((norm_a.sqrt() + NORM_EPSILON) * (norm_b.sqrt() + NORM_EPSILON))) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_embedding_is_deterministic() {
        assert_eq!(embed("hello"), embed("hello"));
        assert_eq!(text_to_embedding("", 16), text_to_embedding("", 16));
    }

    #[test]
    fn test_different_text_gives_different_vectors() {
        assert_ne!(text_to_embedding("a", 128), text_to_embedding("b", 128));
    }

    #[test]
    fn test_embedding_length() {
        for dim in [1, 16, 128, 256] {
            assert_eq!(text_to_embedding("VertexOps", dim).len(), dim);
        }
        assert!(text_to_embedding("VertexOps", 0).is_empty());
    }

    #[test]
    fn test_digest_is_tiled() {
        // 32-byte digest repeats every 32 positions
        let v = text_to_embedding("tile me", 96);
        assert_eq!(v[..32], v[32..64]);
        assert_eq!(v[..32], v[64..96]);
    }

    #[test]
    fn test_known_first_value() {
        // sha256("") starts with 0xe3
        let v = text_to_embedding("", 1);
        assert!((v[0] - (0xe3 as f32 / 255.0 - 0.5)).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_self_similarity() {
        let v = embed("self");
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_cosine_zero_vector() {
        let zero = vec![0.0; 8];
        let other = text_to_embedding("x", 8);
        assert_eq!(cosine_similarity(&zero, &other), 0.0);
        assert_eq!(cosine_similarity(&zero, &zero), 0.0);
    }

    #[test]
    fn test_cosine_opposite() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![-1.0, -2.0, -3.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn prop_values_in_range(text in ".*", dim in 1usize..512) {
            let v = text_to_embedding(&text, dim);
            prop_assert_eq!(v.len(), dim);
            // a 0xff byte maps to exactly 0.5
            for x in v {
                prop_assert!((-0.5..=0.5).contains(&x));
            }
        }

        #[test]
        fn prop_deterministic(text in ".*") {
            prop_assert_eq!(embed(&text), embed(&text));
        }
    }
}
