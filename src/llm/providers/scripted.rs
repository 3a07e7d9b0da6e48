//! Scripted provider: replays queued responses in order.
//!
//! Every prompt it receives is recorded so tests can assert on what an agent
//! actually sent. Clones share the same queue and log.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::llm::providers::dummy::hashed_embedding;
use crate::llm::{CompletionRequest, LlmResponse, ProviderError};

#[derive(Debug, Clone, Default)]
pub struct ScriptedProvider {
    responses: Arc<Mutex<VecDeque<String>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ScriptedProvider {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Arc::new(Mutex::new(responses.into_iter().map(Into::into).collect())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Append another response to the queue.
    pub fn push(&self, response: impl Into<String>) {
        lock(&self.responses).push_back(response.into());
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.requests).iter().map(|r| r.prompt.clone()).collect()
    }

    /// Full requests received so far, oldest first.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        lock(&self.requests).clone()
    }

    pub fn remaining(&self) -> usize {
        lock(&self.responses).len()
    }

    pub async fn complete(&self, request: &CompletionRequest) -> Result<LlmResponse, ProviderError> {
        lock(&self.requests).push(request.clone());
        let next = lock(&self.responses).pop_front();
        match next {
            Some(text) => Ok(LlmResponse { text, usage: None }),
            None => Err(ProviderError::Request("scripted responses exhausted".into())),
        }
    }

    pub async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        Ok(inputs.iter().map(|s| hashed_embedding(s)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_in_order_then_errors() {
        let p = ScriptedProvider::new(["first", "second"]);
        assert_eq!(p.complete(&CompletionRequest::new("a")).await.unwrap().text, "first");
        assert_eq!(p.complete(&CompletionRequest::new("b")).await.unwrap().text, "second");
        let err = p.complete(&CompletionRequest::new("c")).await.unwrap_err();
        assert!(err.to_string().contains("exhausted"));
        assert_eq!(p.prompts(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn clones_share_state() {
        let p = ScriptedProvider::new(Vec::<String>::new());
        let q = p.clone();
        q.push("late");
        assert_eq!(p.remaining(), 1);
        let req = CompletionRequest::new("x").system("sys");
        assert_eq!(p.complete(&req).await.unwrap().text, "late");
        assert_eq!(q.requests()[0].system.as_deref(), Some("sys"));
    }
}
