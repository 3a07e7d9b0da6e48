//! Backend for servers speaking the OpenAI REST dialect
//! (`/v1/chat/completions`, `/v1/embeddings`): OpenAI itself, LM Studio,
//! vLLM, or Ollama's own compatibility layer.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::llm::{CompletionRequest, LlmResponse, LlmUsage, ProviderError};

const PING_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct OpenAiCompatibleProvider {
    client: Client,
    chat_url: String,
    embeddings_url: String,
    model: String,
    embedding_model: String,
    temperature: f32,
    /// Sent as a bearer token; `None` for keyless local servers.
    api_key: Option<String>,
}

impl OpenAiCompatibleProvider {
    pub fn new(
        chat_url: String,
        embeddings_url: String,
        model: String,
        embedding_model: String,
        temperature: f32,
        timeout_seconds: u64,
        api_key: Option<String>,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, chat_url, embeddings_url, model, embedding_model, temperature, api_key })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn with_model(&self, model: &str) -> Self {
        Self { model: model.to_string(), ..self.clone() }
    }

    /// Any HTTP status from the chat endpoint counts as reachable.
    pub async fn ping(&self) -> Result<(), ProviderError> {
        let mut req = self.client.head(&self.chat_url).timeout(PING_TIMEOUT);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        req.send()
            .await
            .map(|_| ())
            .map_err(|e| ProviderError::Request(format!("unreachable: {e}")))
    }

    pub async fn complete(&self, request: &CompletionRequest) -> Result<LlmResponse, ProviderError> {
        let messages = request
            .system
            .as_deref()
            .map(|s| ChatMessage { role: "system", content: s })
            .into_iter()
            .chain([ChatMessage { role: "user", content: &request.prompt }])
            .collect();
        let payload = ChatRequest {
            model: &self.model,
            messages,
            temperature: request.temperature.unwrap_or(self.temperature),
            max_tokens: request.num_predict,
        };
        debug!(model = %self.model, temperature = payload.temperature, prompt_len = request.prompt.len(), "chat completion");

        let parsed: ChatResponse = self.post_json(&self.chat_url, &payload).await?;
        let text = parsed
            .choices
            .into_iter()
            .find_map(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ProviderError::Request("empty response from model".into()))?;

        let usage = parsed
            .usage
            .map(|u| LlmUsage { input_tokens: u.prompt_tokens, output_tokens: u.completion_tokens });
        Ok(LlmResponse { text, usage })
    }

    pub async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let payload = EmbeddingRequest { model: &self.embedding_model, input: inputs };
        debug!(model = %self.embedding_model, inputs = inputs.len(), "embeddings");

        let mut parsed: EmbeddingResponse = self.post_json(&self.embeddings_url, &payload).await?;
        if parsed.data.len() != inputs.len() {
            return Err(ProviderError::Request(format!(
                "expected {} embeddings, got {}",
                inputs.len(),
                parsed.data.len()
            )));
        }
        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }

    async fn post_json<B: Serialize, R: DeserializeOwned>(&self, url: &str, body: &B) -> Result<R, ProviderError> {
        let mut req = self.client.post(url).json(body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let response = req.send().await.map_err(|e| {
            error!(%url, error = %e, "request failed before a response arrived");
            ProviderError::Request(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(status, &body);
            error!(%url, %message, "server returned an error");
            return Err(ProviderError::Request(message));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| ProviderError::Request(format!("failed to parse response body: {e}")))
    }
}

/// `HTTP {status}: {message}`, taking the message from the
/// `{"error": {"message": ...}}` envelope when the body has one.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) => format!("HTTP {status}: {}", env.error.message),
        Err(_) => format!("HTTP {status}: {}", body.trim()),
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<Embedding>,
}

#[derive(Debug, Deserialize)]
struct Embedding {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_message_precedes_prompt() {
        let payload = ChatRequest {
            model: "llama3.2:3b",
            messages: vec![
                ChatMessage { role: "system", content: "You write SQL." },
                ChatMessage { role: "user", content: "count users" },
            ],
            temperature: 0.0,
            max_tokens: None,
        };
        let v = serde_json::to_value(&payload).unwrap();
        assert_eq!(v["messages"][0]["role"], "system");
        assert_eq!(v["messages"][1]["content"], "count users");
        assert!(v.get("max_tokens").is_none());
    }

    #[test]
    fn missing_usage_is_tolerated() {
        let parsed: ChatResponse = serde_json::from_str(r#"{"choices":[{"message":{"content":"ok"}}]}"#).unwrap();
        assert!(parsed.usage.is_none());
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("ok"));
    }

    #[test]
    fn error_envelope_message_is_used() {
        let status = reqwest::StatusCode::NOT_FOUND;
        let msg = error_message(status, r#"{"error":{"message":"model 'x' not found"}}"#);
        assert_eq!(msg, "HTTP 404 Not Found: model 'x' not found");
        assert_eq!(error_message(status, "plain text\n"), "HTTP 404 Not Found: plain text");
    }

    #[test]
    fn embeddings_are_reordered_by_index() {
        let body = r#"{"data":[{"index":1,"embedding":[0.5]},{"index":0,"embedding":[0.25]}]}"#;
        let mut parsed: EmbeddingResponse = serde_json::from_str(body).unwrap();
        parsed.data.sort_by_key(|d| d.index);
        assert_eq!(parsed.data[0].embedding, vec![0.25]);
    }
}
