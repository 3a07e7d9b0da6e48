//! Pulls company facts (name, founding year, founders, location) out of text.

use crate::agents::{AgentContext, failure_message, require_input};

pub const TEMPLATE: &str = "extract.txt";

pub const DEMO_TEXT: &str = "ABC Co., Ltd. was founded in 1997 by Mr. Somchai and is based in Bangkok.";

pub struct ExtractionAgent {
    ctx: AgentContext,
}

impl ExtractionAgent {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }

    pub async fn extract(&self, text: &str) -> String {
        let text = match require_input(text, "text") {
            Ok(t) => t,
            Err(e) => return e.to_string(),
        };
        match self.ctx.run_template(TEMPLATE, [("text", text)]).await {
            Ok(facts) => facts,
            Err(e) => failure_message("extract", &e),
        }
    }
}
