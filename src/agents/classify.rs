//! Topic classification with a short justification.

use tracing::info;

use crate::agents::{AgentContext, failure_message, require_input};

pub const TEMPLATE: &str = "classify.txt";

pub const DEMO_TEXT: &str = "This article covers AI technology and how it is applied.";

pub struct ClassificationAgent {
    ctx: AgentContext,
}

impl ClassificationAgent {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }

    pub async fn classify(&self, text: &str) -> String {
        let text = match require_input(text, "text") {
            Ok(t) => t,
            Err(e) => return e.to_string(),
        };
        match self.ctx.run_template(TEMPLATE, [("text", text)]).await {
            Ok(category) => {
                info!(chars = text.chars().count(), "classification completed");
                category
            }
            Err(e) => failure_message("classify", &e),
        }
    }
}
