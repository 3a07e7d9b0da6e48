//! Topic explainer: a structured four-part explanation per topic, plus
//! ad-hoc templates and sequential batches.

use tracing::{info, warn};

use crate::agents::core::prompt::PromptTemplate;
use crate::agents::{AgentContext, failure_message, require_input};

pub const TEMPLATE: &str = "explain_topic.txt";

/// Topics used when the command is run without arguments.
pub const DEMO_TOPICS: &[&str] = &["Quantum mechanics", "Artificial intelligence", "Blockchain technology"];

pub const DEMO_CUSTOM_PROMPT: &str = "Write a short poem about {{subject}}";
pub const DEMO_SUBJECT: &str = "nature";

/// Characters of each batch explanation shown on the console.
pub const PREVIEW_CHARS: usize = 200;

pub struct BasicAgent {
    ctx: AgentContext,
}

impl BasicAgent {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }

    /// Explain `topic` (meaning, key principles, everyday examples, uses).
    pub async fn explain_topic(&self, topic: &str) -> String {
        let topic = match require_input(topic, "topic") {
            Ok(t) => t,
            Err(e) => {
                warn!("empty topic");
                return e.to_string();
            }
        };
        info!(topic, "explaining topic");
        match self.ctx.run_template(TEMPLATE, [("topic", topic)]).await {
            Ok(text) => text,
            Err(e) => failure_message("basic", &e),
        }
    }

    /// Render a caller-supplied `{{var}}` template and send it as-is.
    pub async fn custom_query(&self, template: &str, vars: &[(&str, &str)]) -> String {
        if let Err(e) = require_input(template, "custom prompt") {
            warn!("empty custom prompt");
            return e.to_string();
        }
        let prompt = PromptTemplate::from_text("custom", template).render(vars.iter().copied());
        match self.ctx.complete(prompt).await {
            Ok(text) => text,
            Err(e) => failure_message("basic", &e),
        }
    }

    /// Explain each topic in order. Failures appear as the explanation text.
    pub async fn batch_explain(&self, topics: &[String]) -> Vec<(String, String)> {
        let mut results = Vec::with_capacity(topics.len());
        for topic in topics {
            info!(topic = %topic, "batch: explaining topic");
            results.push((topic.clone(), self.explain_topic(topic).await));
        }
        results
    }
}
