//! Two-stage creative chain: a short story from an idea, then the same story
//! rewritten as a four-stanza poem.

use serde::Serialize;
use tracing::info;

use crate::agents::{AgentContext, require_input};
use crate::error::AppError;

pub const STORY_TEMPLATE: &str = "creative_story.txt";
pub const POEM_TEMPLATE: &str = "creative_poem.txt";

pub const DEMO_IDEA: &str = "A boy finds a dragon egg in the forest and must protect it from hunters";

#[derive(Debug, Clone, Serialize)]
pub struct CreativeWork {
    pub idea: String,
    pub story: String,
    pub poem: String,
}

pub struct CreativeAgent {
    ctx: AgentContext,
}

impl CreativeAgent {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }

    /// Run both stages. The poem stage sees only the story.
    pub async fn create(&self, idea: &str) -> Result<CreativeWork, AppError> {
        let idea = require_input(idea, "idea")?;

        info!("creative: writing story");
        let story = self.ctx.run_template(STORY_TEMPLATE, [("idea", idea)]).await?;

        info!(story_chars = story.chars().count(), "creative: transferring style");
        let poem = self.ctx.run_template(POEM_TEMPLATE, [("story", story.as_str())]).await?;

        Ok(CreativeWork { idea: idea.to_string(), story, poem })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::scripted_context;

    #[tokio::test]
    async fn poem_stage_receives_story() {
        let (ctx, scripted) = scripted_context(["Once upon a time...", "Stanza one..."]);
        let work = CreativeAgent::new(ctx).create(DEMO_IDEA).await.unwrap();
        assert_eq!(work.story, "Once upon a time...");
        assert_eq!(work.poem, "Stanza one...");
        let prompts = scripted.prompts();
        assert!(prompts[0].contains(DEMO_IDEA));
        assert!(prompts[1].contains("Once upon a time..."));
        assert!(prompts[1].contains("4 stanzas"));
    }

    #[tokio::test]
    async fn story_failure_stops_chain() {
        let (ctx, scripted) = scripted_context(Vec::<String>::new());
        assert!(CreativeAgent::new(ctx).create(DEMO_IDEA).await.is_err());
        assert_eq!(scripted.prompts().len(), 1);
    }
}
