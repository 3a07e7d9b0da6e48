//! Claim verification in two stages: a ReAct loop with the `search` tool
//! gathers evidence, then a critic model judges the claim against it.

use serde::Serialize;
use tracing::info;

use crate::agents::core::react::{ReactAgent, Step};
use crate::agents::{AgentContext, require_input};
use crate::error::AppError;
use crate::tools::Tool;
use crate::tools::web_search::SearchTool;

pub const REACT_TEMPLATE: &str = "react.txt";
pub const CRITIC_TEMPLATE: &str = "fact_check.txt";

pub const DEMO_CLAIM: &str = "ประเทศไทยมีประชากรมากกว่า 100 ล้านคน";

pub const NO_EVIDENCE: &str = "No evidence was found.";

#[derive(Debug, Clone, Serialize)]
pub struct FactCheckReport {
    pub claim: String,
    pub evidence: String,
    pub verdict: String,
    pub steps: Vec<Step>,
}

pub struct FactCheckAgent {
    ctx: AgentContext,
    critic: AgentContext,
    search: SearchTool,
    max_iterations: usize,
}

impl FactCheckAgent {
    pub fn new(ctx: AgentContext) -> Result<Self, AppError> {
        let search = SearchTool::from_config(&ctx.config.search)?;
        Ok(Self::with_search(ctx, search))
    }

    pub fn with_search(ctx: AgentContext, search: SearchTool) -> Self {
        let critic = match &ctx.config.agents.fact_check.critic_model {
            Some(model) => ctx.with_llm(ctx.llm.with_model(model)),
            None => ctx.clone(),
        };
        let max_iterations = ctx.config.agents.web_search.max_iterations;
        Self { ctx, critic, search, max_iterations }
    }

    pub async fn check(&self, claim: &str) -> Result<FactCheckReport, AppError> {
        let claim = require_input(claim, "claim")?;

        let (evidence, steps) = self.gather_evidence(claim).await?;
        info!(steps = steps.len(), evidence_chars = evidence.chars().count(), "fact check: evidence gathered");

        let verdict = self
            .critic
            .run_template(CRITIC_TEMPLATE, [("claim", claim), ("evidence", evidence.as_str())])
            .await?;
        info!(critic = self.critic.llm.model_name(), "fact check: verdict ready");

        Ok(FactCheckReport { claim: claim.to_string(), evidence, verdict, steps })
    }

    async fn gather_evidence(&self, claim: &str) -> Result<(String, Vec<Step>), AppError> {
        let template = self.ctx.template(REACT_TEMPLATE)?;
        let agent = ReactAgent::new(&self.ctx.llm, template, vec![Tool::Search(self.search.clone())], self.max_iterations);
        let outcome = agent.run(&format!("Search for information about: {claim}"), "").await?;
        Ok((compose_evidence(&outcome.steps, &outcome.output), outcome.steps))
    }
}

/// Tool observations followed by the search agent's own conclusion.
pub fn compose_evidence(steps: &[Step], conclusion: &str) -> String {
    let mut parts: Vec<String> = steps
        .iter()
        .enumerate()
        .map(|(i, s)| format!("[{}] {} ({}): {}", i + 1, s.tool, s.input, s.observation.trim()))
        .collect();
    let conclusion = conclusion.trim();
    if !conclusion.is_empty() {
        parts.push(format!("Summary: {conclusion}"));
    }
    if parts.is_empty() { NO_EVIDENCE.to_string() } else { parts.join("\n") }
}
