//! Sentiment analysis (positive / negative / neutral with reasons).
//!
//! Three ways in: a single text, the built-in example set, or a batch file
//! with one text per line. The interactive mode lives in the CLI on top of
//! [`interactive::run_loop`](crate::agents::core::interactive::run_loop).

use std::path::Path;

use tracing::info;

use crate::agents::{AgentContext, failure_message, require_input};
use crate::error::AppError;

pub const TEMPLATE: &str = "sentiment.txt";

/// Example texts analysed by the `--examples` mode.
pub const EXAMPLES: &[&str] = &[
    "วันนี้อากาศดีมากและฉันมีความสุข",
    "ฉันเศร้ามากวันนี้ เพราะสอบตก",
    "อาหารนี้รสชาติธรรมดา ไม่ดีไม่เลว",
    "ขอบคุณมากครับ คุณช่วยฉันได้มาก",
    "ฉันโกรธมากที่ถูกหลอก",
    "ร้านนี้บริการแย่มาก ไม่แนะนำ",
    "ภาพยนตร์เรื่องนี้สนุกดี น่าดู",
    "งานนี้น่าเบื่อ ทำไม่เสร็จซักที",
];

/// One analysed line of a batch file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    /// 1-based line number in the source file.
    pub line: usize,
    pub text: String,
    pub result: String,
}

pub struct SentimentAgent {
    ctx: AgentContext,
}

impl SentimentAgent {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }

    pub async fn analyze(&self, text: &str) -> String {
        let text = match require_input(text, "text") {
            Ok(t) => t,
            Err(e) => return e.to_string(),
        };
        match self.ctx.run_template(TEMPLATE, [("text", text)]).await {
            Ok(result) => {
                info!(chars = text.chars().count(), "sentiment analysis completed");
                result
            }
            Err(e) => failure_message("sentiment", &e),
        }
    }

    /// Analyse [`EXAMPLES`] in order.
    pub async fn analyze_examples(&self) -> Vec<(String, String)> {
        let mut out = Vec::with_capacity(EXAMPLES.len());
        for text in EXAMPLES {
            out.push((text.to_string(), self.analyze(text).await));
        }
        out
    }

    /// Analyse every non-blank line of `path`. Blank lines keep their number
    /// but produce no item.
    pub async fn analyze_file(&self, path: &Path) -> Result<Vec<BatchItem>, AppError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AppError::Input(format!("cannot read {}: {e}", path.display())))?;
        info!(path = %path.display(), lines = content.lines().count(), "sentiment batch");

        let mut items = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            let text = line.trim();
            if text.is_empty() {
                continue;
            }
            items.push(BatchItem { line: idx + 1, text: text.to_string(), result: self.analyze(text).await });
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::scripted_context;
    use tempfile::TempDir;

    #[tokio::test]
    async fn analyze_uses_template() {
        let (ctx, scripted) = scripted_context(["Positive: the speaker is happy"]);
        let out = SentimentAgent::new(ctx).analyze(EXAMPLES[0]).await;
        assert_eq!(out, "Positive: the speaker is happy");
        assert!(scripted.prompts()[0].contains(EXAMPLES[0]));
    }

    #[tokio::test]
    async fn batch_file_skips_blank_lines_and_keeps_numbers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("batch_texts.txt");
        std::fs::write(&path, "great day\n\n  \nterrible service\n").unwrap();
        let (ctx, _) = scripted_context(["positive", "negative"]);
        let items = SentimentAgent::new(ctx).analyze_file(&path).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].line, 1);
        assert_eq!(items[1].line, 4);
        assert_eq!(items[1].result, "negative");
    }

    #[tokio::test]
    async fn missing_batch_file_errors() {
        let (ctx, _) = scripted_context(Vec::<String>::new());
        let err = SentimentAgent::new(ctx).analyze_file(Path::new("/nonexistent/batch.txt")).await.unwrap_err();
        assert!(matches!(err, AppError::Input(_)));
    }

    #[tokio::test]
    async fn examples_run_in_order() {
        let responses: Vec<String> = (0..EXAMPLES.len()).map(|i| format!("r{i}")).collect();
        let (ctx, _) = scripted_context(responses);
        let out = SentimentAgent::new(ctx).analyze_examples().await;
        assert_eq!(out.len(), EXAMPLES.len());
        assert_eq!(out[7].1, "r7");
    }
}
