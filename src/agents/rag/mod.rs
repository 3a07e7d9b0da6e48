//! Retrieval-augmented QA over local text files.
//!
//! Pipeline per run: load → chunk → embed into a [`VectorIndex`] → for each
//! question retrieve the top-k chunks, stuff them into the QA prompt and
//! complete. The index is dropped with the agent.
//!
//! - [`RagSystem`]: one file, the baseline.
//! - [`multidoc`]: several files, answers carry their contexts.
//! - [`kb`]: a seeded knowledge base with an interaction log.

pub mod kb;
pub mod multidoc;

use std::path::Path;

use serde::Serialize;
use tracing::{error, info};

use crate::agents::{AgentContext, failure_message};
use crate::error::AppError;
use crate::llm::CompletionRequest;
use crate::memory::{SearchHit, TextChunk, VectorIndex, chunker, loader};

pub const QA_TEMPLATE: &str = "rag_qa.txt";

pub use crate::agents::EMPTY_QUESTION_MESSAGE;
pub const NOT_READY_MESSAGE: &str = "The system is not ready yet. Load documents and build the index first.";

/// Asked when the CLI gets a file but no question.
pub const DEFAULT_QUESTIONS: &[&str] = &[
    "What does this document say about AI?",
    "What kinds of work can AI help with?",
    "What should we be careful about when using AI?",
];

#[derive(Debug, Clone, Default, Serialize)]
pub struct RagAnswer {
    pub answer: String,
    /// `source` metadata of each retrieved chunk, best match first.
    pub sources: Vec<String>,
    /// Text of each retrieved chunk, same order as `sources`.
    pub contexts: Vec<String>,
}

impl RagAnswer {
    fn message(text: &str) -> Self {
        Self { answer: text.to_string(), ..Self::default() }
    }

    /// Sources with duplicates removed, first occurrence kept.
    pub fn unique_sources(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for s in &self.sources {
            if !out.contains(&s.as_str()) {
                out.push(s);
            }
        }
        out
    }
}

/// Join retrieved chunks into the `{{context}}` block.
pub fn stuff_context(hits: &[SearchHit]) -> String {
    hits.iter().map(|h| h.chunk.text.as_str()).collect::<Vec<_>>().join("\n\n")
}

/// Retrieve the top `k` chunks for `question` and answer from them with
/// `template` (which takes `{{context}}` and `{{question}}`).
pub(crate) async fn retrieve_and_answer(
    ctx: &AgentContext,
    index: &VectorIndex,
    template: &str,
    question: &str,
    k: usize,
    temperature: Option<f32>,
) -> Result<(String, Vec<SearchHit>), AppError> {
    let hits = index.search_text(&ctx.llm, question, k).await?;
    let context = stuff_context(&hits);
    info!(hits = hits.len(), context_chars = context.chars().count(), "rag: retrieved");

    let prompt = ctx.template(template)?.render([("context", context.as_str()), ("question", question)]);
    let mut request = CompletionRequest::new(prompt);
    request.temperature = temperature;
    let answer = ctx.request(&request).await?;
    Ok((answer, hits))
}

pub struct RagSystem {
    ctx: AgentContext,
    index: Option<VectorIndex>,
    chunk_size: usize,
    chunk_overlap: usize,
    top_k: usize,
}

impl RagSystem {
    pub fn new(ctx: AgentContext) -> Self {
        let cfg = ctx.config.agents.rag.clone();
        Self { ctx, index: None, chunk_size: cfg.chunk_size, chunk_overlap: cfg.chunk_overlap, top_k: cfg.top_k }
    }

    /// Load and chunk one file. Failures are logged and yield no chunks.
    pub fn load_documents(&self, path: &Path) -> Vec<TextChunk> {
        if !path.exists() {
            error!(path = %path.display(), "rag: file not found");
            return Vec::new();
        }
        let chunks = loader::load_text(path)
            .and_then(|doc| chunker::split_documents(&[doc], self.chunk_size, self.chunk_overlap));
        match chunks {
            Ok(chunks) => {
                info!(path = %path.display(), chunks = chunks.len(), "rag: document loaded");
                chunks
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "rag: cannot load document");
                Vec::new()
            }
        }
    }

    /// Embed `chunks` into a fresh index, replacing any previous one.
    pub async fn create_vectorstore(&mut self, chunks: Vec<TextChunk>) -> Result<(), AppError> {
        if chunks.is_empty() {
            return Err(AppError::Memory("no chunks to index".into()));
        }
        let index = VectorIndex::build(&self.ctx.llm, chunks).await?;
        info!(entries = index.len(), "rag: vector index ready");
        self.index = Some(index);
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.index.is_some()
    }

    pub async fn query(&self, question: &str) -> RagAnswer {
        let question = question.trim();
        if question.is_empty() {
            return RagAnswer::message(EMPTY_QUESTION_MESSAGE);
        }
        let Some(index) = &self.index else {
            return RagAnswer::message(NOT_READY_MESSAGE);
        };

        match retrieve_and_answer(&self.ctx, index, QA_TEMPLATE, question, self.top_k, None).await {
            Ok((answer, hits)) => RagAnswer {
                answer,
                sources: hits.iter().map(|h| h.chunk.source().to_string()).collect(),
                contexts: hits.into_iter().map(|h| h.chunk.text).collect(),
            },
            Err(e) => RagAnswer::message(&failure_message("rag", &e)),
        }
    }
}
