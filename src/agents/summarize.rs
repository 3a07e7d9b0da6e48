//! Summarization in five styles with map-reduce over long content.
//!
//! Content up to `chunk_size` characters is summarized in one call. Longer
//! content is split into overlapping chunks, each chunk is summarized, and
//! the joined summaries are split and summarized again while they are
//! still longer than `chunk_size`.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Instant;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::agents::AgentContext;
use crate::error::AppError;
use crate::memory::{chunker, now_iso8601};

/// Upper bound on reduce rounds when summaries refuse to shrink.
const MAX_REDUCE_ROUNDS: usize = 4;

pub const DEMO_CONTENT: &str = "\
Artificial intelligence (AI) is a technology drawing enormous interest today because it can \
change how people work and live.

AI spans several families such as machine learning, deep learning and natural language \
processing, each with different capabilities and uses.

AI is applied across many industries including medicine, finance, transport and education, \
raising efficiency and reducing human error.

AI still faces challenges and limits that must be addressed, such as ethics, privacy and its \
impact on employment, which call for careful development and oversight.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryType {
    Brief,
    Detailed,
    Bullets,
    Keywords,
    Abstract,
}

impl SummaryType {
    pub const ALL: [SummaryType; 5] = [
        SummaryType::Brief,
        SummaryType::Detailed,
        SummaryType::Bullets,
        SummaryType::Keywords,
        SummaryType::Abstract,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryType::Brief => "brief",
            SummaryType::Detailed => "detailed",
            SummaryType::Bullets => "bullets",
            SummaryType::Keywords => "keywords",
            SummaryType::Abstract => "abstract",
        }
    }

    pub fn template(&self) -> String {
        format!("summarize_{}.txt", self.as_str())
    }
}

impl fmt::Display for SummaryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummaryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        SummaryType::ALL
            .into_iter()
            .find(|t| t.as_str() == s || (s == "bullet_points" && *t == SummaryType::Bullets))
            .ok_or_else(|| format!("unknown summary type '{s}' (expected brief, detailed, bullets, keywords or abstract)"))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub summary_type: SummaryType,
    /// Characters in the input.
    pub content_length: usize,
    /// Characters in the summary.
    pub summary_length: usize,
    /// Seconds.
    pub processing_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks_processed: Option<usize>,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_index: Option<usize>,
}

impl SummaryResult {
    fn failure(summary_type: SummaryType, content_length: usize, started: Instant, error: String) -> Self {
        Self {
            success: false,
            summary: None,
            summary_type,
            content_length,
            summary_length: 0,
            processing_time: started.elapsed().as_secs_f64(),
            chunks_processed: None,
            timestamp: now_iso8601(),
            error: Some(error),
            file_path: None,
            file_size: None,
            batch_index: None,
        }
    }
}

#[derive(Serialize)]
struct SavedMetadata<'a> {
    summary_type: SummaryType,
    content_length: usize,
    summary_length: usize,
    processing_time: f64,
    timestamp: &'a str,
}

pub struct SummarizationAgent {
    ctx: AgentContext,
    chunk_size: usize,
    chunk_overlap: usize,
    temperature: f32,
}

impl SummarizationAgent {
    pub fn new(ctx: AgentContext) -> Self {
        let cfg = ctx.config.agents.summarize.clone();
        Self { ctx, chunk_size: cfg.chunk_size, chunk_overlap: cfg.chunk_overlap, temperature: cfg.temperature }
    }

    async fn summarize_once(&self, content: &str, summary_type: SummaryType) -> Result<String, AppError> {
        let template = self.ctx.template(&summary_type.template())?;
        let prompt = template.render([("content", content)]);
        self.ctx.complete_with(prompt, None, Some(self.temperature)).await
    }

    /// Returns the summary and, for chunked input, the first-round chunk count.
    async fn summarize_text(
        &self,
        content: &str,
        summary_type: SummaryType,
    ) -> Result<(String, Option<usize>), AppError> {
        if content.chars().count() <= self.chunk_size {
            return Ok((self.summarize_once(content, summary_type).await?, None));
        }

        info!(chars = content.chars().count(), "summarize: chunking long content");
        let mut text = content.to_string();
        let mut first_round_chunks = None;

        for round in 1..=MAX_REDUCE_ROUNDS {
            let chunks = chunker::split(&text, self.chunk_size, self.chunk_overlap)?;
            first_round_chunks.get_or_insert(chunks.len());

            let mut summaries = Vec::with_capacity(chunks.len());
            for (i, chunk) in chunks.iter().enumerate() {
                info!(round, chunk = i + 1, total = chunks.len(), "summarize: chunk");
                match self.summarize_once(chunk, summary_type).await {
                    Ok(s) => summaries.push(s),
                    Err(e) => warn!(chunk = i + 1, error = %e, "summarize: chunk failed"),
                }
            }
            if summaries.is_empty() {
                return Err(AppError::Llm("every chunk failed to summarize".into()));
            }

            text = summaries.join("\n\n");
            if text.chars().count() <= self.chunk_size {
                break;
            }
            if round == MAX_REDUCE_ROUNDS {
                warn!(chars = text.chars().count(), "summarize: reduce rounds exhausted");
            }
        }
        Ok((text, first_round_chunks))
    }

    pub async fn summarize(&self, content: &str, summary_type: SummaryType) -> SummaryResult {
        let started = Instant::now();
        if content.trim().is_empty() {
            return SummaryResult::failure(summary_type, 0, started, "content is empty or invalid".into());
        }
        let content_length = content.chars().count();

        match self.summarize_text(content, summary_type).await {
            Ok((summary, chunks_processed)) => {
                let processing_time = started.elapsed().as_secs_f64();
                let summary_length = summary.chars().count();
                info!(
                    content_length,
                    summary_length,
                    processing_time,
                    summary_type = %summary_type,
                    "summary completed"
                );
                SummaryResult {
                    success: true,
                    summary: Some(summary),
                    summary_type,
                    content_length,
                    summary_length,
                    processing_time,
                    chunks_processed,
                    timestamp: now_iso8601(),
                    error: None,
                    file_path: None,
                    file_size: None,
                    batch_index: None,
                }
            }
            Err(e) => {
                error!(error = %e, "summarization failed");
                SummaryResult::failure(summary_type, content_length, started, format!("error: {e}"))
            }
        }
    }

    pub async fn summarize_from_file(&self, path: &Path, summary_type: SummaryType) -> SummaryResult {
        let started = Instant::now();
        let file_path = path.display().to_string();

        let content = match tokio::fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) => {
                let msg = if e.kind() == std::io::ErrorKind::NotFound {
                    format!("file not found: {file_path}")
                } else {
                    format!("error reading file: {e}")
                };
                error!(path = %file_path, error = %e, "summarize: cannot read file");
                let mut r = SummaryResult::failure(summary_type, 0, started, msg);
                r.file_path = Some(file_path);
                return r;
            }
        };

        let mut result = self.summarize(&content, summary_type).await;
        result.file_path = Some(file_path);
        result.file_size = Some(content.len() as u64);
        result
    }

    /// Summarize each item in order, tagging results with `batch_index`.
    pub async fn batch_summarize(&self, contents: &[String], summary_type: SummaryType) -> Vec<SummaryResult> {
        info!(items = contents.len(), "summarize: batch");
        let mut results = Vec::with_capacity(contents.len());
        for (i, content) in contents.iter().enumerate() {
            let mut r = self.summarize(content, summary_type).await;
            r.batch_index = Some(i);
            results.push(r);
        }
        results
    }

    /// One summary per [`SummaryType`], in [`SummaryType::ALL`] order.
    pub async fn multi_type_summary(&self, content: &str) -> Vec<SummaryResult> {
        let mut results = Vec::with_capacity(SummaryType::ALL.len());
        for t in SummaryType::ALL {
            info!(summary_type = %t, "summarize: multi-type");
            results.push(self.summarize(content, t).await);
        }
        results
    }
}

/// Write `result` to `path`. With `include_metadata` a successful result is
/// prefixed by a JSON block under `=== METADATA ===`.
pub fn save_summary(result: &SummaryResult, path: &Path, include_metadata: bool) -> Result<(), AppError> {
    let summary = result.summary.as_deref().unwrap_or_default();
    let output = if include_metadata && result.success {
        let metadata = SavedMetadata {
            summary_type: result.summary_type,
            content_length: result.content_length,
            summary_length: result.summary_length,
            processing_time: result.processing_time,
            timestamp: &result.timestamp,
        };
        let json = serde_json::to_string_pretty(&metadata)
            .map_err(|e| AppError::Input(format!("cannot encode metadata: {e}")))?;
        format!("=== METADATA ===\n{json}\n\n=== SUMMARY ===\n{summary}")
    } else {
        summary.to_string()
    };
    std::fs::write(path, output)?;
    info!(path = %path.display(), "summary saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::scripted_context;
    use tempfile::TempDir;

    fn agent_with(responses: Vec<&str>, chunk_size: usize, overlap: usize) -> (SummarizationAgent, crate::llm::providers::scripted::ScriptedProvider) {
        let (ctx, scripted) = scripted_context(responses);
        let mut agent = SummarizationAgent::new(ctx);
        agent.chunk_size = chunk_size;
        agent.chunk_overlap = overlap;
        (agent, scripted)
    }

    #[test]
    fn summary_type_parses() {
        assert_eq!("Bullets".parse::<SummaryType>().unwrap(), SummaryType::Bullets);
        assert_eq!("bullet_points".parse::<SummaryType>().unwrap(), SummaryType::Bullets);
        assert!("haiku".parse::<SummaryType>().is_err());
        assert_eq!(SummaryType::Abstract.template(), "summarize_abstract.txt");
    }

    #[tokio::test]
    async fn short_content_single_call() {
        let (agent, scripted) = agent_with(vec!["AI is big."], 2000, 200);
        let r = agent.summarize(DEMO_CONTENT, SummaryType::Brief).await;
        assert!(r.success);
        assert_eq!(r.summary.as_deref(), Some("AI is big."));
        assert_eq!(r.summary_length, 10);
        assert!(r.chunks_processed.is_none());
        let req = &scripted.requests()[0];
        assert_eq!(req.temperature, Some(0.3));
        assert!(req.prompt.contains("machine learning"));
    }

    #[tokio::test]
    async fn long_content_is_chunked_and_joined() {
        let content = "word ".repeat(100);
        let (agent, scripted) = agent_with(vec!["s1", "s2", "s3", "s4", "s5", "s6", "s7", "s8"], 200, 20);
        let r = agent.summarize(&content, SummaryType::Keywords).await;
        assert!(r.success);
        let chunks = r.chunks_processed.unwrap();
        assert!(chunks >= 3);
        assert_eq!(scripted.prompts().len(), chunks);
        assert!(r.summary.unwrap().starts_with("s1\n\ns2"));
    }

    #[tokio::test]
    async fn empty_content_fails_without_model_call() {
        let (agent, scripted) = agent_with(vec![], 2000, 200);
        let r = agent.summarize("   ", SummaryType::Brief).await;
        assert!(!r.success);
        assert_eq!(r.content_length, 0);
        assert!(scripted.prompts().is_empty());
    }

    #[tokio::test]
    async fn missing_file_reports_path() {
        let (agent, _) = agent_with(vec![], 2000, 200);
        let r = agent.summarize_from_file(Path::new("/nonexistent/doc.txt"), SummaryType::Brief).await;
        assert!(!r.success);
        assert_eq!(r.error.as_deref(), Some("file not found: /nonexistent/doc.txt"));
    }

    #[tokio::test]
    async fn batch_sets_indices() {
        let (agent, _) = agent_with(vec!["a", "b"], 2000, 200);
        let items = vec!["first text".to_string(), "second text".to_string()];
        let results = agent.batch_summarize(&items, SummaryType::Brief).await;
        assert_eq!(results[1].batch_index, Some(1));
        assert_eq!(results[1].summary.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn multi_type_covers_every_type() {
        let (agent, scripted) = agent_with(vec!["1", "2", "3", "4", "5"], 2000, 200);
        let results = agent.multi_type_summary("Some content to summarize.").await;
        let types: Vec<_> = results.iter().map(|r| r.summary_type).collect();
        assert_eq!(types, SummaryType::ALL.to_vec());
        assert_eq!(scripted.prompts().len(), 5);
    }

    #[tokio::test]
    async fn save_with_metadata() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("summary.txt");
        let (agent, _) = agent_with(vec!["short summary"], 2000, 200);
        let r = agent.summarize("text to summarize", SummaryType::Abstract).await;
        save_summary(&r, &path, true).unwrap();
        let saved = std::fs::read_to_string(&path).unwrap();
        assert!(saved.starts_with("=== METADATA ===\n{"));
        assert!(saved.contains("\"summary_type\": \"abstract\""));
        assert!(saved.ends_with("=== SUMMARY ===\nshort summary"));

        save_summary(&r, &path, false).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "short summary");
    }
}
