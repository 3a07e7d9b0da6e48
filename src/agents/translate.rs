//! Translation into a target language (default English).

use crate::agents::{AgentContext, failure_message, require_input};

pub const TEMPLATE: &str = "translate.txt";

pub const DEFAULT_TARGET_LANGUAGE: &str = "en";

pub const DEMO_TEXT: &str = "สวัสดีครับ ยินดีต้อนรับ!";

pub struct TranslationAgent {
    ctx: AgentContext,
}

impl TranslationAgent {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }

    /// Blank `target_language` falls back to [`DEFAULT_TARGET_LANGUAGE`].
    pub async fn translate(&self, text: &str, target_language: &str) -> String {
        let text = match require_input(text, "text") {
            Ok(t) => t,
            Err(e) => return e.to_string(),
        };
        let target = match target_language.trim() {
            "" => DEFAULT_TARGET_LANGUAGE,
            t => t,
        };
        match self
            .ctx
            .run_template(TEMPLATE, [("text", text), ("target_language", target)])
            .await
        {
            Ok(translation) => translation,
            Err(e) => failure_message("translate", &e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::scripted_context;

    #[tokio::test]
    async fn default_target_is_english() {
        let (ctx, scripted) = scripted_context(["Hello, welcome!"]);
        let out = TranslationAgent::new(ctx).translate(DEMO_TEXT, " ").await;
        assert_eq!(out, "Hello, welcome!");
        let prompt = &scripted.prompts()[0];
        assert!(prompt.contains("into en"));
        assert!(prompt.contains(DEMO_TEXT));
    }

    #[tokio::test]
    async fn explicit_target_used() {
        let (ctx, scripted) = scripted_context(["Bonjour"]);
        TranslationAgent::new(ctx).translate("Hello", "fr").await;
        assert!(scripted.prompts()[0].contains("into fr"));
    }
}
