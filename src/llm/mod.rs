//! LLM provider abstraction.
//!
//! `LlmProvider` is an enum over concrete provider implementations.
//! Add a new variant + module in `providers/` for each additional backend.
//!
//! Provider instances are shared immutable capabilities; clone them freely.
//! Async is delegated to the underlying provider, and every method is an
//! `async fn` on the enum so callers need no trait-object machinery.

pub mod providers;

use thiserror::Error;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("provider request failed: {0}")]
    Request(String),
}

// ── Request / response ────────────────────────────────────────────────────────

/// One generation round-trip.
///
/// `temperature` and `num_predict` override the provider's configured
/// values for this request only.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub prompt: String,
    pub system: Option<String>,
    pub temperature: Option<f32>,
    pub num_predict: Option<u32>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self { prompt: prompt.into(), ..Default::default() }
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn num_predict(mut self, num_predict: u32) -> Self {
        self.num_predict = Some(num_predict);
        self
    }
}

/// Token usage reported by the backend, when it reports any.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LlmUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: String,
    pub usage: Option<LlmUsage>,
}

// ── Provider enum ─────────────────────────────────────────────────────────────

/// All available provider backends.
///
/// Enum dispatch avoids `dyn` trait objects and the `async-trait` dependency.
/// Adding a backend = new module + new variant + new arm in each method.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    Dummy(providers::dummy::DummyProvider),
    Scripted(providers::scripted::ScriptedProvider),
    Ollama(providers::ollama::OllamaProvider),
    OpenAiCompatible(providers::openai_compatible::OpenAiCompatibleProvider),
}

impl LlmProvider {
    /// Send a request to the provider and return its text reply.
    pub async fn complete(&self, request: &CompletionRequest) -> Result<LlmResponse, ProviderError> {
        match self {
            LlmProvider::Dummy(p) => p.complete(request).await,
            LlmProvider::Scripted(p) => p.complete(request).await,
            LlmProvider::Ollama(p) => p.complete(request).await,
            LlmProvider::OpenAiCompatible(p) => p.complete(request).await,
        }
    }

    /// Embed each input string. The result has one vector per input, in order.
    pub async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        match self {
            LlmProvider::Dummy(p) => p.embed(inputs).await,
            LlmProvider::Scripted(p) => p.embed(inputs).await,
            LlmProvider::Ollama(p) => p.embed(inputs).await,
            LlmProvider::OpenAiCompatible(p) => p.embed(inputs).await,
        }
    }

    /// Reachability probe. Local providers always succeed.
    pub async fn ping(&self) -> Result<(), ProviderError> {
        match self {
            LlmProvider::Dummy(_) | LlmProvider::Scripted(_) => Ok(()),
            LlmProvider::Ollama(p) => p.ping().await,
            LlmProvider::OpenAiCompatible(p) => p.ping().await,
        }
    }

    /// A provider talking to `model` on the same server.
    ///
    /// Local providers ignore the name; a scripted provider keeps sharing its
    /// response queue with the original.
    pub fn with_model(&self, model: &str) -> LlmProvider {
        match self {
            LlmProvider::Dummy(p) => LlmProvider::Dummy(p.clone()),
            LlmProvider::Scripted(p) => LlmProvider::Scripted(p.clone()),
            LlmProvider::Ollama(p) => LlmProvider::Ollama(p.with_model(model)),
            LlmProvider::OpenAiCompatible(p) => LlmProvider::OpenAiCompatible(p.with_model(model)),
        }
    }

    /// Model name for logging.
    pub fn model_name(&self) -> &str {
        match self {
            LlmProvider::Dummy(_) => "dummy",
            LlmProvider::Scripted(_) => "scripted",
            LlmProvider::Ollama(p) => p.model(),
            LlmProvider::OpenAiCompatible(p) => p.model(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::providers::{dummy::DummyProvider, scripted::ScriptedProvider};

    #[test]
    fn request_builder_sets_overrides() {
        let req = CompletionRequest::new("hi").system("be brief").temperature(0.1).num_predict(64);
        assert_eq!(req.prompt, "hi");
        assert_eq!(req.system.as_deref(), Some("be brief"));
        assert_eq!(req.temperature, Some(0.1));
        assert_eq!(req.num_predict, Some(64));
    }

    #[tokio::test]
    async fn dummy_dispatch_echoes() {
        let p = LlmProvider::Dummy(DummyProvider);
        let r = p.complete(&CompletionRequest::new("hello")).await.unwrap();
        assert_eq!(r.text, "[echo] hello");
        assert!(p.ping().await.is_ok());
    }

    #[tokio::test]
    async fn embed_empty_input_short_circuits() {
        let p = LlmProvider::Scripted(ScriptedProvider::new(Vec::<String>::new()));
        assert!(p.embed(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn with_model_keeps_scripted_queue() {
        let p = LlmProvider::Scripted(ScriptedProvider::new(["one", "two"]));
        let critic = p.with_model("qwen3:1.7b");
        assert_eq!(p.complete(&CompletionRequest::new("a")).await.unwrap().text, "one");
        assert_eq!(critic.complete(&CompletionRequest::new("b")).await.unwrap().text, "two");
    }
}
