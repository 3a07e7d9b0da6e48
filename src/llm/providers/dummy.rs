//! Dummy LLM provider: echoes the prompt back prefixed with `[echo]`.
//! Runs every agent end-to-end without a model server.

use sha2::{Digest, Sha256};

use crate::llm::{CompletionRequest, LlmResponse, ProviderError};

/// Dimension of the hashed bag-of-words embedding.
pub const EMBEDDING_DIM: usize = 64;

#[derive(Debug, Clone)]
pub struct DummyProvider;

impl DummyProvider {
    pub async fn complete(&self, request: &CompletionRequest) -> Result<LlmResponse, ProviderError> {
        Ok(LlmResponse { text: format!("[echo] {}", request.prompt), usage: None })
    }

    pub async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        Ok(inputs.iter().map(|s| hashed_embedding(s)).collect())
    }
}

/// Deterministic bag-of-words embedding.
///
/// Each lowercased alphanumeric token is hashed into one of
/// [`EMBEDDING_DIM`] buckets; the vector is L2-normalised. Texts sharing
/// words land close together, which is enough for offline retrieval.
pub fn hashed_embedding(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; EMBEDDING_DIM];
    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        let digest = Sha256::digest(token.to_lowercase().as_bytes());
        let bucket = u64::from_le_bytes([
            digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6], digest[7],
        ]) as usize
            % EMBEDDING_DIM;
        v[bucket] += 1.0;
    }
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn complete_prefixes_echo() {
        let p = DummyProvider;
        let r = p.complete(&CompletionRequest::new("hello")).await.unwrap();
        assert_eq!(r.text, "[echo] hello");
        assert!(r.usage.is_none());
    }

    #[tokio::test]
    async fn complete_empty_input() {
        let p = DummyProvider;
        let r = p.complete(&CompletionRequest::new("")).await.unwrap();
        assert_eq!(r.text, "[echo] ");
    }

    #[test]
    fn embedding_is_deterministic_and_normalised() {
        let a = hashed_embedding("Rust ownership rules");
        let b = hashed_embedding("rust OWNERSHIP rules");
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_text_embeds_to_zero_vector() {
        let v = hashed_embedding("  ...  ");
        assert_eq!(v.len(), EMBEDDING_DIM);
        assert!(v.iter().all(|x| *x == 0.0));
    }
}
