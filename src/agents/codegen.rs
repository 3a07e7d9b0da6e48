//! Code generation from a plain-language description.

use crate::agents::{AgentContext, failure_message, require_input};

pub const TEMPLATE: &str = "codegen.txt";

pub const DEMO_DESCRIPTION: &str = "Write a Python function that returns the average of a list";

pub struct CodeGenAgent {
    ctx: AgentContext,
}

impl CodeGenAgent {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }

    pub async fn generate_code(&self, description: &str) -> String {
        let description = match require_input(description, "description") {
            Ok(d) => d,
            Err(e) => return e.to_string(),
        };
        match self.ctx.run_template(TEMPLATE, [("description", description)]).await {
            Ok(code) => code,
            Err(e) => failure_message("codegen", &e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::scripted_context;

    #[tokio::test]
    async fn description_reaches_prompt() {
        let (ctx, scripted) = scripted_context(["def avg(xs): ..."]);
        let out = CodeGenAgent::new(ctx).generate_code(DEMO_DESCRIPTION).await;
        assert_eq!(out, "def avg(xs): ...");
        assert!(scripted.prompts()[0].contains(DEMO_DESCRIPTION));
    }

    #[tokio::test]
    async fn model_failure_becomes_message() {
        let (ctx, _) = scripted_context(Vec::<String>::new());
        let out = CodeGenAgent::new(ctx).generate_code("sort a list").await;
        assert!(out.starts_with("error: llm error"));
    }
}
