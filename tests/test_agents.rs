//! End-to-end agent runs over a scripted model and canned search results.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use ollama_agents::agents::AgentContext;
use ollama_agents::agents::knowledge_graph::{KnowledgeGraphAgent, NOT_FOUND_MESSAGE};
use ollama_agents::agents::rag::multidoc::MultiDocAgent;
use ollama_agents::agents::summarize::{self, SummarizationAgent, SummaryType};
use ollama_agents::agents::tool_memory::ToolMemoryAgent;
use ollama_agents::agents::web_search::WebSearchAgent;
use ollama_agents::config::{self, Config};
use ollama_agents::llm::LlmProvider;
use ollama_agents::llm::providers::scripted::ScriptedProvider;
use ollama_agents::tools::web_search::{SearchBackend, SearchTool};

// ── helpers ──────────────────────────────────────────────────────────────────

fn scripted(work_dir: &Path, responses: &[&str]) -> (AgentContext, ScriptedProvider) {
    let provider = ScriptedProvider::new(responses.iter().copied());
    let ctx = AgentContext::new(Config::test_default(work_dir), LlmProvider::Scripted(provider.clone()));
    (ctx, provider)
}

fn canned(pairs: &[(&str, &str)]) -> SearchBackend {
    SearchBackend::Canned(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
}

// ── config ───────────────────────────────────────────────────────────────────

#[test]
fn config_file_and_model_flag() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("agents.toml");
    fs::write(
        &path,
        r#"
[runtime]
work_dir = "/tmp/ollama-agents-test"

[llm]
default = "ollama"

[llm.ollama]
model = "llama3.2:3b"

[agents.sql]
db_path = "company.db"
"#,
    )
    .unwrap();

    let cfg = config::load(Some(&path), Some("qwen3:1.7b")).unwrap();
    assert_eq!(cfg.active_model(), "qwen3:1.7b");
    assert_eq!(cfg.agents.sql.db_path, Path::new("/tmp/ollama-agents-test/company.db"));
    assert_eq!(cfg.agents.rag.top_k, 3);
}

#[test]
fn explicit_missing_config_is_an_error() {
    assert!(config::load(Some(Path::new("/nonexistent/agents.toml")), None).is_err());
}

// ── retrieval ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn multidoc_answers_across_files_and_skips_missing() {
    let tmp = TempDir::new().unwrap();
    let ai = tmp.path().join("ai.txt");
    let fruit = tmp.path().join("fruit.md");
    fs::write(&ai, "AI is the study of machines that learn and reason.").unwrap();
    fs::write(&fruit, "# Fruit\n\nMangoes ripen in the Thai hot season.").unwrap();

    let (ctx, provider) = scripted(tmp.path(), &["AI is machines that learn."]);
    let mut agent = MultiDocAgent::new(ctx);
    let chunks = agent.load_documents(&[ai.clone(), tmp.path().join("missing.txt"), fruit.clone()]).unwrap();
    assert_eq!(chunks.len(), 2);
    agent.create_vectorstore(chunks).await.unwrap();

    let answer = agent.query("What is AI?").await;
    assert_eq!(answer.answer, "AI is machines that learn.");
    assert_eq!(answer.sources.len(), 2);
    assert!(answer.sources.contains(&ai.display().to_string()));
    assert!(answer.sources.contains(&fruit.display().to_string()));
    assert!(provider.prompts()[0].contains("machines that learn and reason"));
}

// ── summarization ────────────────────────────────────────────────────────────

#[tokio::test]
async fn long_content_is_chunked_then_joined() {
    let tmp = TempDir::new().unwrap();
    let content: String = (0..150)
        .map(|i| format!("Sentence {i} explains how machine learning systems improve.\n"))
        .collect();
    let responses = ["part"; 20];
    let (ctx, provider) = scripted(tmp.path(), &responses);
    let agent = SummarizationAgent::new(ctx);

    let result = agent.summarize(&content, SummaryType::Bullets).await;
    assert!(result.success, "{:?}", result.error);
    let chunks = result.chunks_processed.expect("long content is chunked");
    assert!(chunks >= 3, "expected several chunks, got {chunks}");
    assert_eq!(provider.remaining(), 20 - chunks);
    assert_eq!(result.summary.as_deref(), Some(vec!["part"; chunks].join("\n\n").as_str()));
    assert_eq!(result.content_length, content.chars().count());
}

#[tokio::test]
async fn file_summary_saved_with_metadata() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("article.txt");
    fs::write(&input, summarize::DEMO_CONTENT).unwrap();
    let (ctx, _) = scripted(tmp.path(), &["AI is changing industries."]);
    let agent = SummarizationAgent::new(ctx);

    let result = agent.summarize_from_file(&input, SummaryType::Brief).await;
    assert!(result.success);
    assert_eq!(result.file_path.as_deref(), Some(input.display().to_string().as_str()));

    let out = tmp.path().join("summary.txt");
    summarize::save_summary(&result, &out, true).unwrap();
    let saved = fs::read_to_string(&out).unwrap();
    assert!(saved.starts_with("=== METADATA ===\n"));
    assert!(saved.ends_with("=== SUMMARY ===\nAI is changing industries."));
}

// ── knowledge graph ──────────────────────────────────────────────────────────

#[tokio::test]
async fn graph_built_then_queried_by_entity() {
    let tmp = TempDir::new().unwrap();
    let (ctx, _) = scripted(
        tmp.path(),
        &[
            "Steve Jobs, founded, Apple\nApple, founded in, 1976\nnot a triplet",
            "Apple",
            "Microsoft",
        ],
    );
    let mut agent = KnowledgeGraphAgent::new(ctx);
    assert_eq!(agent.build_graph_from_text("Steve Jobs founded Apple in 1976.").await.unwrap(), 2);

    let answer = agent.query("Who founded Apple?").await;
    assert!(answer.contains("Steve Jobs --founded--> Apple"));
    assert!(answer.contains("Apple --founded in--> 1976"));
    assert_eq!(agent.query("Who founded Microsoft?").await, NOT_FOUND_MESSAGE);
}

// ── tool agents ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn web_search_falls_back_to_html_results() {
    let tmp = TempDir::new().unwrap();
    let (ctx, _) = scripted(
        tmp.path(),
        &["Thought: search it\nAction: web_search\nAction Input: Bangkok weather"],
    );
    let search = SearchTool::new(
        canned(&[("Bangkok weather", "n/a")]),
        canned(&[("Bangkok weather", "Bangkok: 34C and humid with afternoon storms")]),
        &ctx.config.search,
    )
    .unwrap();

    let mut agent = WebSearchAgent::with_search(ctx, search);
    let response = agent.query("What is the weather in Bangkok?").await;
    assert!(response.success);
    assert_eq!(response.output, "Bangkok: 34C and humid with afternoon storms");
    assert_eq!(agent.memory().len(), 1);
}

#[tokio::test]
async fn tool_memory_remembers_across_turns() {
    let tmp = TempDir::new().unwrap();
    let (ctx, provider) = scripted(
        tmp.path(),
        &[
            "Action: exchange_rate\nAction Input: USD",
            "Final Answer: 36.50 baht per dollar.",
            "Final Answer: You asked about the dollar rate.",
        ],
    );
    let mut agent = ToolMemoryAgent::new(ctx);
    let first = agent.ask("How many baht per dollar?").await.unwrap();
    assert_eq!(first.output, "36.50 baht per dollar.");
    assert_eq!(first.steps.len(), 1);

    agent.ask("What did I ask before?").await.unwrap();
    let prompts = provider.prompts();
    assert!(prompts[2].contains("Human: How many baht per dollar?\nAI: 36.50 baht per dollar."));
    assert_eq!(agent.memory().len(), 2);
}
