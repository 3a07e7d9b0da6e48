//! Retrieval support: document loading, chunking and a transient vector index.
//!
//! Nothing here persists. Each retrieval agent loads its inputs, splits them,
//! embeds the chunks and drops the index when the run ends.
//!
//! ## What lives here
//! - **Shared types**: `SourceDocument`, `TextChunk`.
//! - **Utilities**: `sha256_hex`, `now_iso8601`.

pub mod chunker;
pub mod loader;
pub mod vector_index;

use std::collections::BTreeMap;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

pub use vector_index::{SearchHit, VectorIndex};

/// Metadata key naming where a document came from.
pub const SOURCE_KEY: &str = "source";

/// A loaded document before chunking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceDocument {
    pub content: String,
    pub metadata: BTreeMap<String, String>,
}

impl SourceDocument {
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert(SOURCE_KEY.to_string(), source.into());
        Self { content: content.into(), metadata }
    }

    pub fn source(&self) -> &str {
        self.metadata.get(SOURCE_KEY).map(String::as_str).unwrap_or("unknown")
    }
}

/// A retrievable slice of a document. Carries the document's metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextChunk {
    pub id: String,
    pub text: String,
    /// Index of the chunk within its document.
    pub position: usize,
    pub metadata: BTreeMap<String, String>,
}

impl TextChunk {
    pub fn source(&self) -> &str {
        self.metadata.get(SOURCE_KEY).map(String::as_str).unwrap_or("unknown")
    }
}

/// Lowercase hex SHA-256 of `text`.
pub fn sha256_hex(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Current UTC time, RFC 3339 with second precision.
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_document_records_source() {
        let d = SourceDocument::new("body", "notes.txt");
        assert_eq!(d.source(), "notes.txt");
    }

    #[test]
    fn sha256_hex_known_value() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn timestamp_is_utc() {
        assert!(now_iso8601().ends_with('Z'));
    }
}
