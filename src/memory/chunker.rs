//! Overlapping text chunking on top of `text-splitter`.
//!
//! Sizes are in characters. Markdown sources go through the Markdown-aware
//! splitter so headings and lists stay intact.

use text_splitter::{ChunkConfig, MarkdownSplitter, TextSplitter};

use crate::error::AppError;
use crate::memory::{SourceDocument, TextChunk};

fn check_sizes(chunk_size: usize, overlap: usize) -> Result<(), AppError> {
    if chunk_size == 0 {
        return Err(AppError::Memory("chunker: chunk_size must be > 0".to_string()));
    }
    if overlap >= chunk_size {
        return Err(AppError::Memory(format!(
            "chunker: overlap ({overlap}) must be smaller than chunk_size ({chunk_size})"
        )));
    }
    Ok(())
}

/// Split plain text into chunks of at most `chunk_size` characters, each
/// sharing up to `overlap` characters with its predecessor.
pub fn split(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>, AppError> {
    check_sizes(chunk_size, overlap)?;
    let config = ChunkConfig::new(chunk_size)
        .with_overlap(overlap)
        .map_err(|e| AppError::Memory(format!("chunker: {e}")))?;
    let splitter = TextSplitter::new(config);
    Ok(splitter
        .chunks(text)
        .filter(|t| !t.trim().is_empty())
        .map(str::to_string)
        .collect())
}

/// Same as [`split`], but respects Markdown structure.
pub fn split_markdown(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>, AppError> {
    check_sizes(chunk_size, overlap)?;
    let config = ChunkConfig::new(chunk_size)
        .with_overlap(overlap)
        .map_err(|e| AppError::Memory(format!("chunker: {e}")))?;
    let splitter = MarkdownSplitter::new(config);
    Ok(splitter
        .chunks(text)
        .filter(|t| !t.trim().is_empty())
        .map(str::to_string)
        .collect())
}

/// Split every document, copying its metadata onto each chunk.
pub fn split_documents(
    docs: &[SourceDocument],
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<TextChunk>, AppError> {
    let mut out = Vec::new();
    for doc in docs {
        let pieces = if doc.source().ends_with(".md") {
            split_markdown(&doc.content, chunk_size, overlap)?
        } else {
            split(&doc.content, chunk_size, overlap)?
        };
        out.extend(pieces.into_iter().enumerate().map(|(position, text)| TextChunk {
            id: uuid::Uuid::now_v7().to_string(),
            text,
            position,
            metadata: doc.metadata.clone(),
        }));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_text() -> String {
        (0..40)
            .map(|i| format!("Sentence number {i} talks about retrieval."))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn short_text_is_single_chunk() {
        let chunks = split("A short note.", 500, 100).unwrap();
        assert_eq!(chunks, vec!["A short note."]);
    }

    #[test]
    fn chunks_respect_capacity() {
        let chunks = split(&long_text(), 200, 40).unwrap();
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 200));
    }

    #[test]
    fn overlap_not_smaller_than_size_errors() {
        assert!(split("text", 100, 100).is_err());
        assert!(split("text", 0, 0).is_err());
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(split("   \n  ", 100, 10).unwrap().is_empty());
    }

    #[test]
    fn documents_carry_metadata_and_positions() {
        let docs = vec![SourceDocument::new(long_text(), "a.txt"), SourceDocument::new("# Title\n\nBody", "b.md")];
        let chunks = split_documents(&docs, 200, 40).unwrap();
        let last = chunks.last().unwrap();
        assert_eq!(last.source(), "b.md");
        assert_eq!(last.position, 0);
        assert!(chunks.iter().filter(|c| c.source() == "a.txt").count() > 1);
    }
}
