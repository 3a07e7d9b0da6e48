//! Single-task LLM agents over a local Ollama server.
//!
//! The binary in `main.rs` is a thin clap front end; everything it runs
//! lives here so integration tests can drive the agents directly.

pub mod agents;
pub mod config;
pub mod error;
pub mod llm;
pub mod logger;
pub mod memory;
pub mod tools;
