//! Ollama native provider (`/api/generate`, `/api/embed`).
//!
//! Non-streaming only. All Ollama wire types are private to this module.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use crate::llm::{CompletionRequest, LlmResponse, LlmUsage, ProviderError};

// ── Public provider ───────────────────────────────────────────────────────────

/// Adapter for a local or remote Ollama server.
///
/// `reqwest::Client` is an `Arc` internally, so clones share the pool.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
    embedding_model: String,
    temperature: f32,
    num_predict: Option<u32>,
}

impl OllamaProvider {
    pub fn new(
        base_url: String,
        model: String,
        embedding_model: String,
        temperature: f32,
        num_predict: Option<u32>,
        timeout_seconds: u64,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            embedding_model,
            temperature,
            num_predict,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn with_model(&self, model: &str) -> Self {
        Self { model: model.to_string(), ..self.clone() }
    }

    /// Lists local models (`GET /api/tags`) with a hard 5-second timeout.
    /// Any HTTP response means the server is up.
    pub async fn ping(&self) -> Result<(), ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build ping client: {e}")))?;
        client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map(|_| ())
            .map_err(|e| ProviderError::Request(format!("unreachable: {e}")))
    }

    pub async fn complete(&self, request: &CompletionRequest) -> Result<LlmResponse, ProviderError> {
        let payload = GenerateRequest {
            model: &self.model,
            prompt: &request.prompt,
            system: request.system.as_deref(),
            stream: false,
            options: GenerateOptions {
                temperature: request.temperature.unwrap_or(self.temperature),
                num_predict: request.num_predict.or(self.num_predict),
            },
        };

        debug!(
            model = %self.model,
            temperature = payload.options.temperature,
            prompt_len = request.prompt.len(),
            "sending Ollama generate request"
        );
        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string_pretty(&payload)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(payload = %json, "full Ollama request payload");
        }

        let url = format!("{}/api/generate", self.base_url);
        let response = self.client.post(&url).json(&payload).send().await.map_err(|e| {
            error!(url = %url, error = %e, "Ollama HTTP request failed (transport)");
            ProviderError::Request(e.to_string())
        })?;
        let response = check_status(response).await?;

        let parsed = response.json::<GenerateResponse>().await.map_err(|e| {
            error!(error = %e, "failed to deserialize Ollama response");
            ProviderError::Request(format!("failed to parse response body: {e}"))
        })?;

        let text = parsed.response.trim().to_string();
        if text.is_empty() {
            return Err(ProviderError::Request("empty response from model".into()));
        }
        debug!(chars = text.len(), "received Ollama response");

        let usage = match (parsed.prompt_eval_count, parsed.eval_count) {
            (None, None) => None,
            (input, output) => Some(LlmUsage {
                input_tokens: input.unwrap_or(0),
                output_tokens: output.unwrap_or(0),
            }),
        };

        Ok(LlmResponse { text, usage })
    }

    pub async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let payload = EmbedRequest { model: &self.embedding_model, input: inputs };
        debug!(model = %self.embedding_model, inputs = inputs.len(), "sending Ollama embed request");

        let url = format!("{}/api/embed", self.base_url);
        let response = self.client.post(&url).json(&payload).send().await.map_err(|e| {
            error!(url = %url, error = %e, "Ollama embed request failed (transport)");
            ProviderError::Request(e.to_string())
        })?;
        let response = check_status(response).await?;

        let parsed = response.json::<EmbedResponse>().await.map_err(|e| {
            ProviderError::Request(format!("failed to parse embed response: {e}"))
        })?;
        if parsed.embeddings.len() != inputs.len() {
            return Err(ProviderError::Request(format!(
                "expected {} embeddings, got {}",
                inputs.len(),
                parsed.embeddings.len()
            )));
        }
        Ok(parsed.embeddings)
    }
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

// Ollama reports failures as `{"error": "..."}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Consume the response and return it if successful, or a structured error.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());

    let message = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(b) => format!("HTTP {status}: {}", b.error),
        Err(_) => format!("HTTP {status}: {body}"),
    };

    error!(%status, %message, "Ollama request returned HTTP error");
    Err(ProviderError::Request(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> OllamaProvider {
        OllamaProvider::new(
            "http://localhost:11434/".into(),
            "llama3.2:3b".into(),
            "nomic-embed-text".into(),
            0.2,
            None,
            5,
        )
        .unwrap()
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        assert_eq!(provider().base_url, "http://localhost:11434");
    }

    #[test]
    fn with_model_swaps_only_model() {
        let p = provider().with_model("qwen3:1.7b");
        assert_eq!(p.model(), "qwen3:1.7b");
        assert_eq!(p.embedding_model, "nomic-embed-text");
    }

    #[test]
    fn generate_payload_shape() {
        let payload = GenerateRequest {
            model: "m",
            prompt: "p",
            system: None,
            stream: false,
            options: GenerateOptions { temperature: 0.0, num_predict: Some(1000) },
        };
        let v = serde_json::to_value(&payload).unwrap();
        assert_eq!(v["stream"], false);
        assert!(v.get("system").is_none());
        assert_eq!(v["options"]["num_predict"], 1000);
    }

    #[test]
    fn generate_response_tolerates_missing_counts() {
        let r: GenerateResponse = serde_json::from_str(r#"{"response":"hi","done":true}"#).unwrap();
        assert_eq!(r.response, "hi");
        assert!(r.eval_count.is_none());
    }
}
