//! Integration tests for the SQL agent over the demo company database.
//!
//! Run with:
//!   cargo test --features plugin-sql --test test_sql_agent

use tempfile::TempDir;

use ollama_agents::agents::AgentContext;
use ollama_agents::agents::sql::format::NO_DATA_MESSAGE;
use ollama_agents::agents::sql::{QueryMethod, SqlAgent, demo_db};
use ollama_agents::config::Config;
use ollama_agents::llm::LlmProvider;
use ollama_agents::llm::providers::scripted::ScriptedProvider;

// ── helpers ──────────────────────────────────────────────────────────────────

fn setup(responses: &[&str]) -> (SqlAgent, ScriptedProvider, TempDir) {
    let tmp = TempDir::new().expect("tempdir");
    let scripted = ScriptedProvider::new(responses.iter().copied());
    let ctx = AgentContext::new(Config::test_default(tmp.path()), LlmProvider::Scripted(scripted.clone()));
    let agent = SqlAgent::new(ctx).expect("open sql agent");
    (agent, scripted, tmp)
}

// ── database ─────────────────────────────────────────────────────────────────

#[test]
fn agent_rebuilds_database_under_work_dir() {
    let (agent, _, tmp) = setup(&[]);
    assert!(agent.db_path().starts_with(tmp.path()));
    assert!(agent.db_path().exists());

    let schema = agent.schema().unwrap();
    for table in demo_db::TABLES {
        assert!(schema.contains(&format!("CREATE TABLE {table}")), "schema is missing {table}");
    }
}

#[test]
fn reopening_resets_seed_data() {
    let (agent, _, tmp) = setup(&[]);
    {
        let conn = demo_db::open_conn(agent.db_path()).unwrap();
        conn.execute("DELETE FROM orders", []).unwrap();
    }
    let scripted = ScriptedProvider::new(Vec::<String>::new());
    let ctx = AgentContext::new(Config::test_default(tmp.path()), LlmProvider::Scripted(scripted));
    let agent = SqlAgent::new(ctx).unwrap();
    assert_eq!(agent.analytics().unwrap().total_orders, 10);
}

// ── direct patterns ──────────────────────────────────────────────────────────

#[tokio::test]
async fn engineering_listing_names_both_engineers() {
    let (mut agent, scripted, _tmp) = setup(&[]);
    let r = agent.query("มีใครบ้างในฝ่าย Engineering และเงินเดือนเท่าไร?").await;
    assert!(r.success);
    assert_eq!(r.method, Some(QueryMethod::DirectSql));
    assert!(r.answer.contains("สมชาย วงศ์ใหญ่ (85,000 baht)"));
    assert!(r.answer.contains("วิชาญ เก่งมาก (95,000 baht)"));
    assert!(scripted.prompts().is_empty());
}

#[tokio::test]
async fn pattern_with_no_rows_reports_no_data() {
    let (mut agent, _, _tmp) = setup(&[]);
    let r = agent.query("What did Alice order?").await;
    assert!(r.success);
    assert_eq!(r.answer, NO_DATA_MESSAGE);
}

#[tokio::test]
async fn largest_department_phrasing() {
    let (mut agent, _, _tmp) = setup(&[]);
    let r = agent.query("ฝ่ายไหนมีคนมากที่สุด?").await;
    assert!(r.success);
    assert!(r.answer.starts_with("Department "), "{}", r.answer);
    assert!(r.answer.ends_with(" has 2 people"), "{}", r.answer);
}

// ── model fallback ───────────────────────────────────────────────────────────

#[tokio::test]
async fn model_reply_without_sql_fails_cleanly() {
    let (mut agent, _, _tmp) = setup(&["I am not sure which table to use."]);
    let r = agent.query("How many orders shipped?").await;
    assert!(!r.success);
    assert_eq!(r.method, Some(QueryMethod::Agent));
    assert!(r.sql.is_none());
    assert!(r.answer.starts_with("error:"));
}

#[tokio::test]
async fn stacked_statements_never_run() {
    let (mut agent, _, _tmp) = setup(&["SELECT 1; DROP TABLE users;"]);
    let r = agent.query("Count something for me").await;
    assert!(!r.success);
    let conn = demo_db::open_conn(agent.db_path()).unwrap();
    let users: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0)).unwrap();
    assert_eq!(users, 8);
}

#[tokio::test]
async fn model_answer_numbers_are_grouped() {
    let (mut agent, _, _tmp) = setup(&["SELECT SUM(total_amount) AS revenue FROM orders"]);
    let r = agent.query("What is the total revenue?").await;
    assert!(r.success, "{}", r.answer);
    assert_eq!(r.answer, "revenue: 374,000");
}

#[tokio::test]
async fn model_answer_keeps_dates_intact() {
    let (mut agent, _, _tmp) = setup(&["SELECT name, hire_date, salary FROM users WHERE salary = 95000"]);
    let r = agent.query("Who joined earliest among the top earners?").await;
    assert!(r.success, "{}", r.answer);
    assert_eq!(r.answer, "name: วิชาญ เก่งมาก, hire_date: 2018-07-10, salary: 95,000");
}

#[tokio::test]
async fn semicolon_inside_literal_is_accepted() {
    let (mut agent, _, _tmp) = setup(&["```sql\nSELECT COUNT(*) AS n FROM users WHERE email <> 'a;b';\n```"]);
    let r = agent.query("How many users have a real email address?").await;
    assert!(r.success, "{}", r.answer);
    assert_eq!(r.answer, "n: 8");
}

// ── history ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn history_and_memory_track_the_session() {
    let (mut agent, _, tmp) = setup(&["SELECT COUNT(*) AS n FROM products"]);
    agent.query("Who has the highest salary?").await;
    agent.query("How many products are there?").await;
    assert_eq!(agent.history().len(), 2);
    assert_eq!(agent.memory().len(), 2);

    let path = agent.export_history(tmp.path()).unwrap();
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("query_history_") && name.ends_with(".json"));

    let saved: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(saved.as_array().map(Vec::len), Some(2));
    assert_eq!(saved[1]["method"], "agent");
    assert_eq!(saved[1]["answer"], "n: 10");
}
