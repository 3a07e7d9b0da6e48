//! RAG across several files.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::agents::rag::{EMPTY_QUESTION_MESSAGE, NOT_READY_MESSAGE, QA_TEMPLATE, RagAnswer, retrieve_and_answer};
use crate::agents::{AgentContext, failure_message};
use crate::error::AppError;
use crate::memory::{TextChunk, VectorIndex, chunker, loader};

pub const DEMO_QUESTION: &str = "What is AI?";

pub struct MultiDocAgent {
    ctx: AgentContext,
    index: Option<VectorIndex>,
}

impl MultiDocAgent {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx, index: None }
    }

    /// Load and chunk every readable file. Missing, unsupported and
    /// duplicate files are skipped with a warning.
    pub fn load_documents(&self, paths: &[PathBuf]) -> Result<Vec<TextChunk>, AppError> {
        let report = loader::load_many(paths);
        for (path, reason) in &report.skipped {
            warn!(path = %path.display(), %reason, "multidoc: skipped");
        }
        let cfg = &self.ctx.config.agents.rag;
        let chunks = chunker::split_documents(&report.documents, cfg.chunk_size, cfg.chunk_overlap)?;
        info!(files = report.documents.len(), chunks = chunks.len(), "multidoc: loaded");
        Ok(chunks)
    }

    pub async fn create_vectorstore(&mut self, chunks: Vec<TextChunk>) -> Result<(), AppError> {
        if chunks.is_empty() {
            return Err(AppError::Memory("no chunks to index".into()));
        }
        self.index = Some(VectorIndex::build(&self.ctx.llm, chunks).await?);
        Ok(())
    }

    pub async fn query(&self, question: &str) -> RagAnswer {
        let question = question.trim();
        if question.is_empty() {
            return RagAnswer { answer: EMPTY_QUESTION_MESSAGE.into(), ..RagAnswer::default() };
        }
        let Some(index) = &self.index else {
            return RagAnswer { answer: NOT_READY_MESSAGE.into(), ..RagAnswer::default() };
        };

        let k = self.ctx.config.agents.rag.top_k;
        match retrieve_and_answer(&self.ctx, index, QA_TEMPLATE, question, k, None).await {
            Ok((answer, hits)) => RagAnswer {
                answer,
                sources: hits.iter().map(|h| h.chunk.source().to_string()).collect(),
                contexts: hits.into_iter().map(|h| h.chunk.text).collect(),
            },
            Err(e) => RagAnswer { answer: failure_message("multidoc", &e), ..RagAnswer::default() },
        }
    }
}
