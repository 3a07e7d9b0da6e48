//! Zero-shot ReAct loop.
//!
//! The model is shown the tool list and answers in the
//! `Thought / Action / Action Input` format. Each tool call's result is fed
//! back as an `Observation:` until the model writes `Final Answer:`, a tool
//! hands back a finished answer, or the iteration budget runs out.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::agents::core::prompt::PromptTemplate;
use crate::error::AppError;
use crate::llm::{CompletionRequest, LlmProvider};
use crate::tools::{self, Tool, web_search::FINAL_ANSWER_PREFIX};

pub const ITERATION_LIMIT_MESSAGE: &str = "Agent stopped due to iteration limit";

const FINAL_ANSWER_MARKER: &str = "Final Answer:";

static ACTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)Action\s*\d*\s*:\s*(.*?)\s*Action\s*\d*\s*Input\s*\d*\s*:\s*(.*)")
        .expect("action regex is valid")
});

/// What the model asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Action { tool: String, input: String },
    Final(String),
}

/// Parse one model turn.
///
/// An action written before any `Final Answer:` wins (text after it is a
/// hallucinated continuation). Output matching neither shape is taken as
/// the final answer verbatim.
pub fn parse_output(text: &str) -> Decision {
    let final_at = text.find(FINAL_ANSWER_MARKER);
    if let Some(caps) = ACTION_RE.captures(text) {
        let action_at = caps.get(0).map(|m| m.start()).unwrap_or(0);
        if final_at.is_none_or(|f| action_at < f) {
            let tool = caps[1].trim().to_string();
            let mut input = caps[2].to_string();
            for stop in ["\nObservation", "\nThought", "\nFinal Answer"] {
                if let Some(i) = input.find(stop) {
                    input.truncate(i);
                }
            }
            let input = input.trim().trim_matches('"').trim().to_string();
            if !tool.is_empty() {
                return Decision::Action { tool, input };
            }
        }
    }
    match final_at {
        Some(i) => Decision::Final(text[i + FINAL_ANSWER_MARKER.len()..].trim().to_string()),
        None => Decision::Final(text.trim().to_string()),
    }
}

/// One tool call and what it returned.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Step {
    pub tool: String,
    pub input: String,
    pub observation: String,
}

#[derive(Debug, Clone)]
pub struct Outcome {
    pub output: String,
    pub steps: Vec<Step>,
    /// True when the iteration budget ran out.
    pub hit_limit: bool,
}

/// A ReAct executor over a fixed tool set.
pub struct ReactAgent<'a> {
    llm: &'a LlmProvider,
    template: PromptTemplate,
    tools: Vec<Tool>,
    prefix: String,
    max_iterations: usize,
    temperature: Option<f32>,
    num_predict: Option<u32>,
}

impl<'a> ReactAgent<'a> {
    /// `template` must carry `{{prefix}}`, `{{tools}}`, `{{tool_names}}`,
    /// `{{chat_history}}`, `{{input}}` and `{{scratchpad}}`.
    pub fn new(llm: &'a LlmProvider, template: PromptTemplate, tools: Vec<Tool>, max_iterations: usize) -> Self {
        Self {
            llm,
            template,
            tools,
            prefix: "Answer the following questions as best you can.".to_string(),
            max_iterations,
            temperature: None,
            num_predict: None,
        }
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
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

    fn tool_block(&self) -> String {
        self.tools
            .iter()
            .map(|t| format!("{}: {}", t.name(), t.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn tool_names(&self) -> String {
        self.tools.iter().map(Tool::name).collect::<Vec<_>>().join(", ")
    }

    fn render(&self, input: &str, chat_history: &str, scratchpad: &str) -> String {
        let tools = self.tool_block();
        let names = self.tool_names();
        let history = if chat_history.trim().is_empty() {
            String::new()
        } else {
            format!("Previous conversation:\n{chat_history}\n")
        };
        self.template.render([
            ("prefix", self.prefix.as_str()),
            ("tools", tools.as_str()),
            ("tool_names", names.as_str()),
            ("chat_history", history.as_str()),
            ("input", input),
            ("scratchpad", scratchpad),
        ])
    }

    async fn observe(&self, tool: &str, input: &str) -> String {
        match tools::find(&self.tools, tool) {
            Some(t) => match t.run(input).await {
                Ok(obs) => obs,
                Err(e) => {
                    warn!(tool = t.name(), error = %e, "tool failed");
                    format!("error: {e}")
                }
            },
            None => format!("{tool} is not a valid tool, try one of [{}].", self.tool_names()),
        }
    }

    /// Run the loop for `input`. Model errors propagate; tool errors become
    /// observations.
    pub async fn run(&self, input: &str, chat_history: &str) -> Result<Outcome, AppError> {
        let mut scratchpad = String::new();
        let mut steps = Vec::new();

        for iteration in 1..=self.max_iterations {
            let prompt = self.render(input, chat_history, &scratchpad);
            let mut request = CompletionRequest::new(prompt);
            request.temperature = self.temperature;
            request.num_predict = self.num_predict;

            let reply = self.llm.complete(&request).await?.text;
            debug!(iteration, chars = reply.len(), "react: model turn");

            match parse_output(&reply) {
                Decision::Final(answer) => {
                    info!(iteration, "react: final answer");
                    return Ok(Outcome { output: answer, steps, hit_limit: false });
                }
                Decision::Action { tool, input: tool_input } => {
                    info!(iteration, tool = %tool, "react: tool call");
                    let observation = self.observe(&tool, &tool_input).await;
                    steps.push(Step { tool: tool.clone(), input: tool_input.clone(), observation: observation.clone() });

                    if let Some(answer) = observation.trim_start().strip_prefix(FINAL_ANSWER_PREFIX) {
                        return Ok(Outcome { output: answer.trim().to_string(), steps, hit_limit: false });
                    }

                    scratchpad.push_str(&format!(
                        " {}\nAction: {tool}\nAction Input: {tool_input}\nObservation: {observation}\nThought:",
                        thought_of(&reply)
                    ));
                }
            }
        }

        warn!(max_iterations = self.max_iterations, "react: iteration limit reached");
        Ok(Outcome { output: ITERATION_LIMIT_MESSAGE.to_string(), steps, hit_limit: true })
    }
}

/// The free-text thought preceding `Action:` in a model turn.
fn thought_of(reply: &str) -> &str {
    let head = reply.find("Action").map(|i| &reply[..i]).unwrap_or(reply);
    head.trim().trim_start_matches("Thought:").trim()
}
