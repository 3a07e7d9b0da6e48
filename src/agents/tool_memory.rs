//! ReAct agent with an exchange-rate tool and a conversation buffer.

use tracing::info;

use crate::agents::core::memory::ConversationMemory;
use crate::agents::core::react::{Outcome, ReactAgent};
use crate::agents::{AgentContext, require_input};
use crate::error::AppError;
use crate::tools::Tool;

pub const REACT_TEMPLATE: &str = "react.txt";

pub const MAX_ITERATIONS: usize = 3;

pub const DEMO_QUESTION: &str = "ตอนนี้อัตราแลกเปลี่ยนเป็นเท่าไร?";

pub struct ToolMemoryAgent {
    ctx: AgentContext,
    memory: ConversationMemory,
}

impl ToolMemoryAgent {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx, memory: ConversationMemory::buffer() }
    }

    /// Run one turn and remember it.
    pub async fn ask(&mut self, question: &str) -> Result<Outcome, AppError> {
        let question = require_input(question, "question")?;
        let template = self.ctx.template(REACT_TEMPLATE)?;
        let agent = ReactAgent::new(&self.ctx.llm, template, vec![Tool::ExchangeRate], MAX_ITERATIONS);
        let outcome = agent.run(question, &self.memory.history_text()).await?;

        info!(steps = outcome.steps.len(), hit_limit = outcome.hit_limit, "tool memory: turn finished");
        self.memory.save_context(question, outcome.output.clone());
        Ok(outcome)
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }
}
