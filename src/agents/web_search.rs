//! Conversational web-search agent: a ReAct loop over the `web_search` tool
//! with a buffer of past exchanges.

use serde::Serialize;
use tracing::{error, info, warn};

use crate::agents::{AgentContext, EMPTY_QUESTION_MESSAGE, require_input};
use crate::agents::core::memory::{ChatMessage, ConversationMemory};
use crate::agents::core::react::{ReactAgent, Step};
use crate::error::AppError;
use crate::llm::LlmProvider;
use crate::tools::Tool;
use crate::tools::web_search::SearchTool;

pub const REACT_TEMPLATE: &str = "react.txt";

const TEMPERATURE: f32 = 0.1;
const NUM_PREDICT: u32 = 1000;

pub const PREFIX: &str = "You are a helpful AI assistant that can search the web for current information. \
When asked about recent events, news, or current information, use the web_search tool. \
Always reply in Thai when the user asks in Thai. \
Be concise but informative in your responses.";

pub const DEMO_QUERIES: &[&str] = &[
    "ข่าวเทคโนโลยี AI ล่าสุดวันนี้",
    "What are the latest developments in renewable energy?",
    "ราคาหุ้นไทยวันนี้",
    "อัตราแลกเปลี่ยนเงินบาทล่าสุด",
];

#[derive(Debug, Clone, Serialize)]
pub struct WebSearchResponse {
    pub success: bool,
    pub output: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub chat_history: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<Step>,
}

pub struct WebSearchAgent {
    ctx: AgentContext,
    llm: LlmProvider,
    search: SearchTool,
    memory: ConversationMemory,
    max_iterations: usize,
}

impl WebSearchAgent {
    /// Agent over the configured DuckDuckGo backends.
    pub fn new(ctx: AgentContext) -> Result<Self, AppError> {
        let search = SearchTool::from_config(&ctx.config.search)?;
        Ok(Self::with_search(ctx, search))
    }

    pub fn with_search(ctx: AgentContext, search: SearchTool) -> Self {
        let cfg = &ctx.config.agents.web_search;
        let llm = match &cfg.model {
            Some(model) => ctx.llm.with_model(model),
            None => ctx.llm.clone(),
        };
        let max_iterations = cfg.max_iterations;
        info!(model = llm.model_name(), max_iterations, "web search agent ready");
        Self { ctx, llm, search, memory: ConversationMemory::buffer(), max_iterations }
    }

    pub async fn query(&mut self, question: &str) -> WebSearchResponse {
        let question = match require_input(question, "question") {
            Ok(q) => q,
            Err(e) => {
                warn!(error = %e, "web search: query rejected");
                return WebSearchResponse {
                    success: false,
                    output: EMPTY_QUESTION_MESSAGE.to_string(),
                    chat_history: Vec::new(),
                    error: Some(e.to_string()),
                    steps: Vec::new(),
                };
            }
        };
        info!(%question, "web search: processing query");
        match self.run(question).await {
            Ok((output, steps)) => {
                self.memory.save_context(question, output.clone());
                WebSearchResponse {
                    success: true,
                    output,
                    chat_history: self.memory.messages(),
                    error: None,
                    steps,
                }
            }
            Err(e) => {
                error!(error = %e, "web search: query failed");
                WebSearchResponse {
                    success: false,
                    output: format!("error: {e}"),
                    chat_history: Vec::new(),
                    error: Some(e.to_string()),
                    steps: Vec::new(),
                }
            }
        }
    }

    async fn run(&self, question: &str) -> Result<(String, Vec<Step>), AppError> {
        let template = self.ctx.template(REACT_TEMPLATE)?;
        let agent = ReactAgent::new(&self.llm, template, vec![Tool::WebSearch(self.search.clone())], self.max_iterations)
            .prefix(PREFIX)
            .temperature(TEMPERATURE)
            .num_predict(NUM_PREDICT);
        let outcome = agent.run(question, &self.memory.history_text()).await?;
        Ok((outcome.output, outcome.steps))
    }

    pub fn clear_memory(&mut self) {
        self.memory.clear();
        info!("web search: memory cleared");
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::scripted_context;
    use crate::tools::web_search::SearchBackend;

    fn canned_tool(ctx: &AgentContext, pairs: &[(&str, &str)]) -> SearchTool {
        let table = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        SearchTool::new(SearchBackend::Canned(table), SearchBackend::Canned(Default::default()), &ctx.config.search)
            .unwrap()
    }

    #[tokio::test]
    async fn search_observation_ends_the_loop() {
        let (ctx, scripted) = scripted_context([
            "Thought: I should search.\nAction: web_search\nAction Input: renewable energy news",
        ]);
        let search = canned_tool(&ctx, &[("renewable energy news", "Solar capacity grew 30% this year")]);
        let mut agent = WebSearchAgent::with_search(ctx, search);

        let r = agent.query("What is new in renewable energy?").await;
        assert!(r.success);
        assert_eq!(r.output, "Solar capacity grew 30% this year");
        assert_eq!(r.steps.len(), 1);
        assert_eq!(r.chat_history.len(), 2);

        let req = &scripted.requests()[0];
        assert_eq!(req.temperature, Some(TEMPERATURE));
        assert_eq!(req.num_predict, Some(NUM_PREDICT));
        assert!(req.prompt.contains("web_search"));
    }

    #[tokio::test]
    async fn history_carries_into_next_query_until_cleared() {
        let (ctx, scripted) = scripted_context(["Final Answer: Hello!", "Final Answer: Again.", "Final Answer: Fresh."]);
        let search = canned_tool(&ctx, &[]);
        let mut agent = WebSearchAgent::with_search(ctx, search);

        agent.query("hi there").await;
        agent.query("and again").await;
        assert!(scripted.prompts()[1].contains("Human: hi there"));

        agent.clear_memory();
        agent.query("new topic").await;
        assert!(!scripted.prompts()[2].contains("Human: hi there"));
    }

    #[tokio::test]
    async fn blank_question_is_not_sent() {
        let (ctx, scripted) = scripted_context(["Final Answer: should not be used"]);
        let search = canned_tool(&ctx, &[]);
        let mut agent = WebSearchAgent::with_search(ctx, search);
        let r = agent.query(" \t ").await;
        assert!(!r.success);
        assert_eq!(r.output, EMPTY_QUESTION_MESSAGE);
        assert!(scripted.prompts().is_empty());
        assert!(agent.memory().is_empty());
    }

    #[tokio::test]
    async fn model_failure_is_reported() {
        let (ctx, _) = scripted_context(Vec::<String>::new());
        let search = canned_tool(&ctx, &[]);
        let mut agent = WebSearchAgent::with_search(ctx, search);
        let r = agent.query("anything").await;
        assert!(!r.success);
        assert!(r.error.unwrap().contains("exhausted"));
        assert!(agent.memory().is_empty());
    }
}
