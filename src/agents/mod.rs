//! Single-task agents.
//!
//! Every agent has the same shape: validate input, render a prompt from
//! `config/prompts/`, call the model through [`AgentContext`], and turn any
//! failure into a user-facing message after logging it. Agents never call
//! each other.

pub mod basic;
pub mod classify;
pub mod codegen;
pub mod core;
pub mod creative;
pub mod extract;
pub mod fact_check;
pub mod knowledge_graph;
pub mod rag;
pub mod sentiment;
#[cfg(feature = "plugin-sql")]
pub mod sql;
pub mod summarize;
pub mod tool_memory;
pub mod translate;
pub mod web_search;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error};

use crate::config::Config;
use crate::error::AppError;
use crate::llm::{CompletionRequest, LlmProvider};
use self::core::prompt::{PromptTemplate, preamble};

/// Shared state handed to every agent: config, model client, prompt dir.
///
/// Cheap to clone.
#[derive(Debug, Clone)]
pub struct AgentContext {
    pub config: Arc<Config>,
    pub llm: LlmProvider,
    pub prompts_dir: PathBuf,
}

impl AgentContext {
    pub fn new(config: Config, llm: LlmProvider) -> Self {
        let prompts_dir = config.prompts_dir.clone();
        Self { config: Arc::new(config), llm, prompts_dir }
    }

    /// Same config and prompts, different model client.
    pub fn with_llm(&self, llm: LlmProvider) -> Self {
        Self { config: Arc::clone(&self.config), llm, prompts_dir: self.prompts_dir.clone() }
    }

    /// Load a required template from the prompts directory.
    pub fn template(&self, name: &str) -> Result<PromptTemplate, AppError> {
        PromptTemplate::load(&self.prompts_dir, name)
    }

    /// Render `template` with `vars` under the persona layer and complete it.
    pub async fn run_template<'a, I>(&self, template: &str, vars: I) -> Result<String, AppError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let body = self.template(template)?;
        let prompt = preamble(&self.prompts_dir).template(&body).vars(vars).build();
        self.complete(prompt).await
    }

    pub async fn complete(&self, prompt: impl Into<String>) -> Result<String, AppError> {
        self.request(&CompletionRequest::new(prompt)).await
    }

    pub async fn complete_with(
        &self,
        prompt: impl Into<String>,
        system: Option<&str>,
        temperature: Option<f32>,
    ) -> Result<String, AppError> {
        let mut request = CompletionRequest::new(prompt);
        request.system = system.map(str::to_string);
        request.temperature = temperature;
        self.request(&request).await
    }

    pub async fn request(&self, request: &CompletionRequest) -> Result<String, AppError> {
        let response = self.llm.complete(request).await?;
        if let Some(usage) = response.usage {
            debug!(
                model = self.llm.model_name(),
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "llm usage"
            );
        }
        Ok(response.text)
    }
}

/// Reply for a blank question; no model call is made.
pub const EMPTY_QUESTION_MESSAGE: &str = "The question is empty or invalid.";

/// Log `e` for `agent` and phrase it for the user.
pub fn failure_message(agent: &str, e: &AppError) -> String {
    error!(agent, error = %e, "agent failed");
    format!("error: {e}")
}

/// Trimmed input, or `AppError::Input` naming `what` when blank.
pub fn require_input<'a>(value: &'a str, what: &str) -> Result<&'a str, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(AppError::Input(format!("{what} must not be empty")))
    } else {
        Ok(trimmed)
    }
}

/// First `max_chars` characters of `text`, with `...` appended when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{head}...")
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::providers::scripted::ScriptedProvider;

    #[tokio::test]
    async fn complete_with_passes_overrides() {
        let scripted = ScriptedProvider::new(["ok"]);
        let ctx = AgentContext::new(
            Config::test_default(std::path::Path::new("/tmp")),
            LlmProvider::Scripted(scripted.clone()),
        );
        assert_eq!(ctx.complete_with("p", Some("sys"), Some(0.0)).await.unwrap(), "ok");
        let req = &scripted.requests()[0];
        assert_eq!(req.system.as_deref(), Some("sys"));
        assert_eq!(req.temperature, Some(0.0));
    }

    #[test]
    fn require_input_rejects_blank() {
        assert_eq!(require_input("  hi ", "topic").unwrap(), "hi");
        let err = require_input(" \n", "topic").unwrap_err();
        assert_eq!(err.to_string(), "invalid input: topic must not be empty");
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        assert_eq!(preview("abc", 5), "abc");
        assert_eq!(preview("สวัสดีครับ", 3), "สวั...");
    }
}
