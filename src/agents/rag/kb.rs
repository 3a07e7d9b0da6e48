//! Knowledge-base QA seeded with a small default corpus.
//!
//! Every query is recorded in an interaction log that can be exported as
//! JSON and summarised with [`KnowledgeBase::stats`].

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::agents::{AgentContext, EMPTY_QUESTION_MESSAGE, require_input};
use crate::agents::rag::retrieve_and_answer;
use crate::error::AppError;
use crate::memory::{SOURCE_KEY, SourceDocument, VectorIndex, chunker, now_iso8601};

pub const QA_TEMPLATE: &str = "kb_qa.txt";

const CHUNK_SIZE: usize = 500;
const CHUNK_OVERLAP: usize = 50;
const TOP_K: usize = 3;
const TEMPERATURE: f32 = 0.1;

/// Metadata key holding a chunk's position within its document.
pub const CHUNK_KEY: &str = "chunk";

pub const DEFAULT_DOCUMENTS: &[&str] = &[
    "LangChain is a comprehensive framework for developing applications powered by language models. \
     It provides tools for prompt management, chains, agents, memory, and integrations with various LLMs and data sources.",
    "Ollama is a powerful tool that allows you to run open-source large language models locally on your machine. \
     It supports models like Llama, Code Llama, Mistral, and many others, providing privacy and control over your AI applications.",
    "Model Context Protocol (MCP) is an open protocol that enables secure connections between host applications \
     and AI models. It standardizes how AI assistants can securely access data and tools while maintaining user control.",
    "Retrieval-Augmented Generation (RAG) is a technique that combines information retrieval with text generation. \
     It allows language models to access external knowledge bases, improving accuracy and reducing hallucinations.",
    "Vector databases like FAISS, Pinecone, or Chroma store embeddings of documents and enable semantic search. \
     They are crucial for RAG applications as they allow finding relevant context based on semantic similarity.",
    "Embedding models convert text into dense vector representations. \
     Models like e5-base-v2, nomic-embed-text and sentence-transformers are commonly used for semantic search applications.",
];

pub const DEMO_QUERIES: &[&str] = &[
    "What is the benefit of using RAG with Ollama and LangChain?",
    "How does MCP help with AI model interoperability?",
    "What are vector databases and why are they important for RAG?",
    "Can you explain how embedding models work?",
];

pub const DEMO_EXTRA_DOCUMENTS: &[(&str, &str, &str)] = &[
    (
        "Prompt engineering is the practice of designing and optimizing prompts to get better results from language models. \
         It involves techniques like few-shot learning, chain-of-thought prompting, and instruction tuning.",
        "prompt_engineering_guide",
        "AI",
    ),
    (
        "Fine-tuning involves training a pre-trained model on domain-specific data to improve performance for specific tasks. \
         It's more resource-intensive than prompt engineering but can yield better results for specialized applications.",
        "fine_tuning_guide",
        "ML",
    ),
];

pub const DEMO_FOLLOW_UP: &str = "What's the difference between prompt engineering and fine-tuning?";

#[derive(Debug, Clone, Serialize)]
pub struct SourceRef {
    pub content: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KbAnswer {
    pub question: String,
    pub answer: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceRef>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Interaction {
    pub timestamp: String,
    pub query: String,
    pub result: String,
    pub source_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KbStats {
    pub total_interactions: usize,
    pub average_sources: f64,
}

pub struct KnowledgeBase {
    ctx: AgentContext,
    index: VectorIndex,
    interactions: Vec<Interaction>,
}

impl KnowledgeBase {
    /// Index [`DEFAULT_DOCUMENTS`] as `doc_0` .. `doc_5`.
    pub async fn with_defaults(ctx: AgentContext) -> Result<Self, AppError> {
        let mut kb = Self { ctx, index: VectorIndex::new(), interactions: Vec::new() };
        let docs: Vec<SourceDocument> = DEFAULT_DOCUMENTS
            .iter()
            .enumerate()
            .map(|(i, text)| SourceDocument::new(*text, format!("doc_{i}")))
            .collect();
        kb.index_documents(docs).await?;
        info!(entries = kb.index.len(), "knowledge base seeded");
        Ok(kb)
    }

    async fn index_documents(&mut self, docs: Vec<SourceDocument>) -> Result<usize, AppError> {
        let mut chunks = chunker::split_documents(&docs, CHUNK_SIZE, CHUNK_OVERLAP)?;
        for c in &mut chunks {
            c.metadata.insert(CHUNK_KEY.to_string(), c.position.to_string());
        }
        let added = chunks.len();
        self.index.add_chunks(&self.ctx.llm, chunks).await?;
        Ok(added)
    }

    /// Add documents; `metadata[i]` (when present) is attached to every chunk
    /// of `texts[i]`. Returns the number of chunks added.
    pub async fn add_documents(
        &mut self,
        texts: &[String],
        metadata: &[BTreeMap<String, String>],
    ) -> Result<usize, AppError> {
        let docs = texts
            .iter()
            .enumerate()
            .map(|(i, text)| SourceDocument {
                content: text.clone(),
                metadata: metadata.get(i).cloned().unwrap_or_default(),
            })
            .collect();
        let added = self.index_documents(docs).await?;
        info!(documents = texts.len(), chunks = added, "knowledge base extended");
        Ok(added)
    }

    /// Blank questions are answered with [`EMPTY_QUESTION_MESSAGE`] and are
    /// not logged as interactions.
    pub async fn query(&mut self, question: &str) -> KbAnswer {
        let question = match require_input(question, "question") {
            Ok(q) => q,
            Err(e) => {
                warn!(error = %e, "knowledge base: query rejected");
                return KbAnswer {
                    question: question.to_string(),
                    answer: EMPTY_QUESTION_MESSAGE.to_string(),
                    timestamp: now_iso8601(),
                    sources: Vec::new(),
                    error: true,
                };
            }
        };
        let result = retrieve_and_answer(&self.ctx, &self.index, QA_TEMPLATE, question, TOP_K, Some(TEMPERATURE)).await;
        let answer = match result {
            Ok((answer, hits)) => KbAnswer {
                question: question.to_string(),
                answer,
                timestamp: now_iso8601(),
                sources: hits
                    .into_iter()
                    .map(|h| SourceRef { content: h.chunk.text, metadata: h.chunk.metadata })
                    .collect(),
                error: false,
            },
            Err(e) => {
                error!(error = %e, "knowledge base query failed");
                KbAnswer {
                    question: question.to_string(),
                    answer: format!("Error processing query: {e}"),
                    timestamp: now_iso8601(),
                    sources: Vec::new(),
                    error: true,
                }
            }
        };

        self.interactions.push(Interaction {
            timestamp: answer.timestamp.clone(),
            query: question.to_string(),
            result: answer.answer.clone(),
            source_count: answer.sources.len(),
        });
        answer
    }

    pub fn interactions(&self) -> &[Interaction] {
        &self.interactions
    }

    pub fn export_log(&self, path: &Path) -> Result<(), AppError> {
        let json = serde_json::to_string_pretty(&self.interactions)
            .map_err(|e| AppError::Memory(format!("cannot encode interaction log: {e}")))?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), entries = self.interactions.len(), "interaction log exported");
        Ok(())
    }

    pub fn stats(&self) -> KbStats {
        let total = self.interactions.len();
        let average_sources = if total == 0 {
            0.0
        } else {
            self.interactions.iter().map(|i| i.source_count).sum::<usize>() as f64 / total as f64
        };
        KbStats { total_interactions: total, average_sources }
    }
}

/// Metadata map for one of [`DEMO_EXTRA_DOCUMENTS`].
pub fn demo_metadata(source: &str, topic: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(SOURCE_KEY.to_string(), source.to_string()), ("topic".to_string(), topic.to_string())])
}
