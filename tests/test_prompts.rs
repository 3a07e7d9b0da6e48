//! Every template an agent loads from config/prompts must exist and expose
//! the variables that agent fills in.

use std::path::{Path, PathBuf};

use ollama_agents::agents::core::prompt::PromptTemplate;
use ollama_agents::agents::summarize::SummaryType;

fn prompts_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("config/prompts")
}

fn assert_vars(name: &str, expected: &[&str]) {
    let template = PromptTemplate::load(&prompts_dir(), name).unwrap_or_else(|e| panic!("{name}: {e}"));
    let vars = template.variables();
    for var in expected {
        assert!(vars.iter().any(|v| v == var), "{name} should contain {{{{{var}}}}}, found {vars:?}");
    }
    assert_eq!(vars.len(), expected.len(), "{name} has unexpected variables: {vars:?}");
}

#[test]
fn persona_layer_is_not_empty() {
    let text = std::fs::read_to_string(prompts_dir().join("id.md")).unwrap();
    assert!(!text.trim().is_empty());
}

#[test]
fn single_task_templates() {
    assert_vars("explain_topic.txt", &["topic"]);
    assert_vars("codegen.txt", &["description"]);
    assert_vars("extract.txt", &["text"]);
    assert_vars("classify.txt", &["text"]);
    assert_vars("translate.txt", &["text", "target_language"]);
    assert_vars("sentiment.txt", &["text"]);
    assert_vars("creative_story.txt", &["idea"]);
    assert_vars("creative_poem.txt", &["story"]);
}

#[test]
fn summary_templates_cover_every_type() {
    for summary_type in SummaryType::ALL {
        assert_vars(&summary_type.template(), &["content"]);
    }
}

#[test]
fn retrieval_templates() {
    assert_vars("rag_qa.txt", &["context", "question"]);
    assert_vars("kb_qa.txt", &["context", "question"]);
    assert_vars("kg_extract.txt", &["text"]);
    assert_vars("kg_query.txt", &["question"]);
}

#[test]
fn sql_templates() {
    assert_vars("sql_system.txt", &["schema"]);
    assert_vars("sql_query.txt", &["chat_history", "question"]);
}

#[test]
fn react_template_ends_in_open_thought() {
    assert_vars("react.txt", &["prefix", "tools", "tool_names", "chat_history", "input", "scratchpad"]);
    let template = PromptTemplate::load(&prompts_dir(), "react.txt").unwrap();
    assert!(template.text().ends_with("Thought:{{scratchpad}}"));
    assert!(template.text().contains("Final Answer:"));
}

#[test]
fn fact_check_template() {
    assert_vars("fact_check.txt", &["claim", "evidence"]);
}
