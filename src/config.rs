//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory
//! (or the path given with `--config`), then applies `OLLAMA_AGENTS_WORK_DIR`,
//! `OLLAMA_AGENTS_LOG_LEVEL` and `OLLAMA_AGENTS_MODEL` env overrides.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::AppError;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Ollama provider configuration (`[llm.ollama]`).
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Server root, e.g. `http://localhost:11434`.
    pub base_url: String,
    pub model: String,
    /// Model used by `/api/embed` for the retrieval agents.
    pub embedding_model: String,
    pub temperature: f32,
    /// Upper bound on generated tokens; `None` leaves the server default.
    pub num_predict: Option<u32>,
    pub timeout_seconds: u64,
}

/// OpenAI / OpenAI-compatible provider configuration (`[llm.openai]`).
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Full chat completions endpoint URL.
    pub api_base_url: String,
    /// Full embeddings endpoint URL.
    pub embeddings_url: String,
    pub model: String,
    pub embedding_model: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

/// LLM configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Which provider is active (`"ollama"`, `"openai"`, `"dummy"`).
    /// Maps to `default` in `[llm]`.
    pub provider: String,
    pub ollama: OllamaConfig,
    pub openai: OpenAiConfig,
}

/// Web search tool configuration (`[search]`).
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// DuckDuckGo instant-answer JSON endpoint.
    pub api_url: String,
    /// DuckDuckGo HTML results endpoint.
    pub html_url: String,
    pub api_max_results: usize,
    pub html_max_results: usize,
    /// A result shorter than this (after trimming) counts as a miss.
    pub min_result_chars: usize,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct RagConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
}

#[derive(Debug, Clone)]
pub struct SummarizeConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub temperature: f32,
}

#[derive(Debug, Clone)]
pub struct SqlConfig {
    /// Demo database path (already resolved against `work_dir`).
    pub db_path: PathBuf,
    /// Number of past exchanges kept in the conversation window.
    pub memory_window: usize,
    /// Row cap applied when formatting model-generated query results.
    pub max_rows: usize,
}

#[derive(Debug, Clone)]
pub struct WebSearchConfig {
    /// Model override for the search agent; `None` uses the default model.
    pub model: Option<String>,
    pub max_iterations: usize,
}

#[derive(Debug, Clone)]
pub struct FactCheckConfig {
    /// Model that judges the claim; `None` uses the default model.
    pub critic_model: Option<String>,
}

/// Per-agent settings (`[agents.*]`).
#[derive(Debug, Clone)]
pub struct AgentsConfig {
    pub rag: RagConfig,
    pub summarize: SummarizeConfig,
    pub sql: SqlConfig,
    pub web_search: WebSearchConfig,
    pub fact_check: FactCheckConfig,
}

/// Fully-resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory for generated files (already expanded, no `~`).
    pub work_dir: PathBuf,
    /// Directory holding the prompt templates.
    pub prompts_dir: PathBuf,
    pub log_level: String,
    pub llm: LlmConfig,
    /// API key from the `LLM_API_KEY` env var; `None` for keyless local models.
    /// Never sourced from TOML.
    pub llm_api_key: Option<String>,
    pub search: SearchConfig,
    pub agents: AgentsConfig,
}

impl Config {
    /// Name of the model the active provider talks to.
    pub fn active_model(&self) -> &str {
        match self.llm.provider.as_str() {
            "openai" | "openai-compatible" => &self.llm.openai.model,
            _ => &self.llm.ollama.model,
        }
    }
}

/// Raw TOML shape, the `serde` target before resolution.
#[derive(Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    runtime: RawRuntime,
    #[serde(default)]
    llm: RawLlm,
    #[serde(default)]
    search: RawSearch,
    #[serde(default)]
    agents: RawAgents,
}

#[derive(Deserialize)]
struct RawRuntime {
    #[serde(default = "default_work_dir")]
    work_dir: String,
    #[serde(default = "default_prompts_dir")]
    prompts_dir: String,
    #[serde(default = "default_log_level")]
    log_level: String,
}

impl Default for RawRuntime {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            prompts_dir: default_prompts_dir(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Deserialize)]
struct RawLlm {
    /// Maps to `default = "..."` in `[llm]`.
    #[serde(rename = "default", default = "default_llm_provider")]
    provider: String,
    #[serde(default)]
    ollama: RawOllamaConfig,
    #[serde(default)]
    openai: RawOpenAiConfig,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            ollama: RawOllamaConfig::default(),
            openai: RawOpenAiConfig::default(),
        }
    }
}

#[derive(Deserialize)]
struct RawOllamaConfig {
    #[serde(default = "default_ollama_base_url")]
    base_url: String,
    #[serde(default = "default_model")]
    model: String,
    #[serde(default = "default_ollama_embedding_model")]
    embedding_model: String,
    #[serde(default = "default_temperature")]
    temperature: f32,
    #[serde(default)]
    num_predict: Option<u32>,
    #[serde(default = "default_llm_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawOllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_model(),
            embedding_model: default_ollama_embedding_model(),
            temperature: default_temperature(),
            num_predict: None,
            timeout_seconds: default_llm_timeout_seconds(),
        }
    }
}

#[derive(Deserialize)]
struct RawOpenAiConfig {
    #[serde(default = "default_openai_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_openai_embeddings_url")]
    embeddings_url: String,
    #[serde(default = "default_openai_model")]
    model: String,
    #[serde(default = "default_openai_embedding_model")]
    embedding_model: String,
    #[serde(default = "default_temperature")]
    temperature: f32,
    #[serde(default = "default_llm_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawOpenAiConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_openai_api_base_url(),
            embeddings_url: default_openai_embeddings_url(),
            model: default_openai_model(),
            embedding_model: default_openai_embedding_model(),
            temperature: default_temperature(),
            timeout_seconds: default_llm_timeout_seconds(),
        }
    }
}

#[derive(Deserialize)]
struct RawSearch {
    #[serde(default = "default_search_api_url")]
    api_url: String,
    #[serde(default = "default_search_html_url")]
    html_url: String,
    #[serde(default = "default_api_max_results")]
    api_max_results: usize,
    #[serde(default = "default_html_max_results")]
    html_max_results: usize,
    #[serde(default = "default_min_result_chars")]
    min_result_chars: usize,
    #[serde(default = "default_search_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawSearch {
    fn default() -> Self {
        Self {
            api_url: default_search_api_url(),
            html_url: default_search_html_url(),
            api_max_results: default_api_max_results(),
            html_max_results: default_html_max_results(),
            min_result_chars: default_min_result_chars(),
            timeout_seconds: default_search_timeout_seconds(),
        }
    }
}

#[derive(Deserialize, Default)]
struct RawAgents {
    #[serde(default)]
    rag: RawRag,
    #[serde(default)]
    summarize: RawSummarize,
    #[serde(default)]
    sql: RawSql,
    #[serde(default)]
    web_search: RawWebSearch,
    #[serde(default)]
    fact_check: RawFactCheck,
}

#[derive(Deserialize)]
struct RawRag {
    #[serde(default = "default_rag_chunk_size")]
    chunk_size: usize,
    #[serde(default = "default_rag_chunk_overlap")]
    chunk_overlap: usize,
    #[serde(default = "default_rag_top_k")]
    top_k: usize,
}

impl Default for RawRag {
    fn default() -> Self {
        Self {
            chunk_size: default_rag_chunk_size(),
            chunk_overlap: default_rag_chunk_overlap(),
            top_k: default_rag_top_k(),
        }
    }
}

#[derive(Deserialize)]
struct RawSummarize {
    #[serde(default = "default_summarize_chunk_size")]
    chunk_size: usize,
    #[serde(default = "default_summarize_chunk_overlap")]
    chunk_overlap: usize,
    #[serde(default = "default_summarize_temperature")]
    temperature: f32,
}

impl Default for RawSummarize {
    fn default() -> Self {
        Self {
            chunk_size: default_summarize_chunk_size(),
            chunk_overlap: default_summarize_chunk_overlap(),
            temperature: default_summarize_temperature(),
        }
    }
}

#[derive(Deserialize)]
struct RawSql {
    #[serde(default = "default_sql_db_path")]
    db_path: String,
    #[serde(default = "default_sql_memory_window")]
    memory_window: usize,
    #[serde(default = "default_sql_max_rows")]
    max_rows: usize,
}

impl Default for RawSql {
    fn default() -> Self {
        Self {
            db_path: default_sql_db_path(),
            memory_window: default_sql_memory_window(),
            max_rows: default_sql_max_rows(),
        }
    }
}

#[derive(Deserialize)]
struct RawWebSearch {
    #[serde(default)]
    model: Option<String>,
    #[serde(default = "default_max_iterations")]
    max_iterations: usize,
}

impl Default for RawWebSearch {
    fn default() -> Self {
        Self { model: None, max_iterations: default_max_iterations() }
    }
}

#[derive(Deserialize, Default)]
struct RawFactCheck {
    #[serde(default)]
    critic_model: Option<String>,
}

fn default_work_dir() -> String { "~/.ollama-agents".to_string() }
fn default_prompts_dir() -> String { "config/prompts".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_llm_provider() -> String { "ollama".to_string() }
fn default_ollama_base_url() -> String { "http://localhost:11434".to_string() }
fn default_model() -> String { "llama3.2:3b".to_string() }
fn default_ollama_embedding_model() -> String { "nomic-embed-text".to_string() }
fn default_temperature() -> f32 { 0.2 }
fn default_llm_timeout_seconds() -> u64 { 120 }
fn default_openai_api_base_url() -> String { "https://api.openai.com/v1/chat/completions".to_string() }
fn default_openai_embeddings_url() -> String { "https://api.openai.com/v1/embeddings".to_string() }
fn default_openai_model() -> String { "gpt-4o-mini".to_string() }
fn default_openai_embedding_model() -> String { "text-embedding-3-small".to_string() }
fn default_search_api_url() -> String { "https://api.duckduckgo.com/".to_string() }
fn default_search_html_url() -> String { "https://html.duckduckgo.com/html/".to_string() }
fn default_api_max_results() -> usize { 5 }
fn default_html_max_results() -> usize { 3 }
fn default_min_result_chars() -> usize { 10 }
fn default_search_timeout_seconds() -> u64 { 15 }
fn default_rag_chunk_size() -> usize { 500 }
fn default_rag_chunk_overlap() -> usize { 100 }
fn default_rag_top_k() -> usize { 3 }
fn default_summarize_chunk_size() -> usize { 2000 }
fn default_summarize_chunk_overlap() -> usize { 200 }
fn default_summarize_temperature() -> f32 { 0.3 }
fn default_sql_db_path() -> String { "enhanced_example.db".to_string() }
fn default_sql_memory_window() -> usize { 3 }
fn default_sql_max_rows() -> usize { 20 }
fn default_max_iterations() -> usize { 3 }

/// Load config from `path` (or `config/default.toml`), then apply env-var
/// overrides. A `model` given here (the `--model` flag) beats
/// `OLLAMA_AGENTS_MODEL`.
///
/// A missing default file is not an error: every field has a default, so the
/// agents run against a local Ollama out of the box. An explicitly requested
/// file must exist.
pub fn load(path: Option<&Path>, model: Option<&str>) -> Result<Config, AppError> {
    let work_dir_override = env::var("OLLAMA_AGENTS_WORK_DIR").ok();
    let log_level_override = env::var("OLLAMA_AGENTS_LOG_LEVEL").ok();
    let model_override = env::var("OLLAMA_AGENTS_MODEL").ok();

    let overrides = Overrides {
        work_dir: work_dir_override.as_deref(),
        log_level: log_level_override.as_deref(),
        model: model.or(model_override.as_deref()),
    };

    match path {
        Some(p) => load_from(p, overrides),
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                load_from(default_path, overrides)
            } else {
                tracing::debug!("{DEFAULT_CONFIG_PATH} not found, using built-in defaults");
                resolve(RawConfig::default(), overrides)
            }
        }
    }
}

/// Explicit override values. Tests pass these directly instead of mutating
/// env vars.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overrides<'a> {
    pub work_dir: Option<&'a str>,
    pub log_level: Option<&'a str>,
    pub model: Option<&'a str>,
}

/// Load from an explicit path with explicit override values.
pub fn load_from(path: &Path, overrides: Overrides<'_>) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    resolve(parsed, overrides)
}

fn resolve(parsed: RawConfig, overrides: Overrides<'_>) -> Result<Config, AppError> {
    let rt = parsed.runtime;

    let work_dir = expand_home(overrides.work_dir.unwrap_or(&rt.work_dir));
    let log_level = overrides.log_level.unwrap_or(&rt.log_level).to_string();
    let prompts_dir = expand_home(&rt.prompts_dir);

    let rag = parsed.agents.rag;
    if rag.chunk_overlap >= rag.chunk_size {
        return Err(AppError::Config(format!(
            "agents.rag: chunk_overlap ({}) must be smaller than chunk_size ({})",
            rag.chunk_overlap, rag.chunk_size
        )));
    }
    let summarize = parsed.agents.summarize;
    if summarize.chunk_overlap >= summarize.chunk_size {
        return Err(AppError::Config(format!(
            "agents.summarize: chunk_overlap ({}) must be smaller than chunk_size ({})",
            summarize.chunk_overlap, summarize.chunk_size
        )));
    }

    let mut llm = LlmConfig {
        provider: parsed.llm.provider,
        ollama: OllamaConfig {
            base_url: parsed.llm.ollama.base_url.trim_end_matches('/').to_string(),
            model: parsed.llm.ollama.model,
            embedding_model: parsed.llm.ollama.embedding_model,
            temperature: parsed.llm.ollama.temperature,
            num_predict: parsed.llm.ollama.num_predict,
            timeout_seconds: parsed.llm.ollama.timeout_seconds,
        },
        openai: OpenAiConfig {
            api_base_url: parsed.llm.openai.api_base_url,
            embeddings_url: parsed.llm.openai.embeddings_url,
            model: parsed.llm.openai.model,
            embedding_model: parsed.llm.openai.embedding_model,
            temperature: parsed.llm.openai.temperature,
            timeout_seconds: parsed.llm.openai.timeout_seconds,
        },
    };
    if let Some(model) = overrides.model {
        match llm.provider.as_str() {
            "openai" | "openai-compatible" => llm.openai.model = model.to_string(),
            _ => llm.ollama.model = model.to_string(),
        }
    }

    let db_path = {
        let p = expand_home(&parsed.agents.sql.db_path);
        if p.is_absolute() { p } else { work_dir.join(p) }
    };

    Ok(Config {
        work_dir,
        prompts_dir,
        log_level,
        llm,
        llm_api_key: env::var("LLM_API_KEY").ok(),
        search: SearchConfig {
            api_url: parsed.search.api_url,
            html_url: parsed.search.html_url,
            api_max_results: parsed.search.api_max_results,
            html_max_results: parsed.search.html_max_results,
            min_result_chars: parsed.search.min_result_chars,
            timeout_seconds: parsed.search.timeout_seconds,
        },
        agents: AgentsConfig {
            rag: RagConfig {
                chunk_size: rag.chunk_size,
                chunk_overlap: rag.chunk_overlap,
                top_k: rag.top_k,
            },
            summarize: SummarizeConfig {
                chunk_size: summarize.chunk_size,
                chunk_overlap: summarize.chunk_overlap,
                temperature: summarize.temperature,
            },
            sql: SqlConfig {
                db_path,
                memory_window: parsed.agents.sql.memory_window,
                max_rows: parsed.agents.sql.max_rows,
            },
            web_search: WebSearchConfig {
                model: parsed.agents.web_search.model,
                max_iterations: parsed.agents.web_search.max_iterations,
            },
            fact_check: FactCheckConfig {
                critic_model: parsed.agents.fact_check.critic_model,
            },
        },
    })
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

// ── test helpers ──────────────────────────────────────────────────────────────

impl Config {
    /// Safe `Config` for tests: dummy LLM, no API key.
    /// Prompts resolve against the crate's own `config/prompts`.
    pub fn test_default(work_dir: &Path) -> Self {
        Self {
            work_dir: work_dir.to_path_buf(),
            prompts_dir: Path::new(env!("CARGO_MANIFEST_DIR")).join("config/prompts"),
            log_level: "info".into(),
            llm: LlmConfig {
                provider: "dummy".into(),
                ollama: OllamaConfig {
                    base_url: "http://localhost:0".into(),
                    model: "test-model".into(),
                    embedding_model: "test-embed".into(),
                    temperature: 0.0,
                    num_predict: None,
                    timeout_seconds: 1,
                },
                openai: OpenAiConfig {
                    api_base_url: "http://localhost:0/v1/chat/completions".into(),
                    embeddings_url: "http://localhost:0/v1/embeddings".into(),
                    model: "test-model".into(),
                    embedding_model: "test-embed".into(),
                    temperature: 0.0,
                    timeout_seconds: 1,
                },
            },
            llm_api_key: None,
            search: SearchConfig {
                api_url: "http://localhost:0/".into(),
                html_url: "http://localhost:0/html/".into(),
                api_max_results: default_api_max_results(),
                html_max_results: default_html_max_results(),
                min_result_chars: default_min_result_chars(),
                timeout_seconds: 1,
            },
            agents: AgentsConfig {
                rag: RagConfig { chunk_size: 500, chunk_overlap: 100, top_k: 3 },
                summarize: SummarizeConfig { chunk_size: 2000, chunk_overlap: 200, temperature: 0.3 },
                sql: SqlConfig {
                    db_path: work_dir.join("enhanced_example.db"),
                    memory_window: 3,
                    max_rows: 20,
                },
                web_search: WebSearchConfig { model: None, max_iterations: 3 },
                fact_check: FactCheckConfig { critic_model: None },
            },
        }
    }
}
