//! Natural-language questions over the demo SQLite database.
//!
//! A question is first matched against a keyword table of known queries and
//! answered straight from SQL. Anything else goes to the model, which is
//! asked for a single read-only statement; that statement is validated,
//! executed, and its rows rendered as the answer.
//!
//! Successful exchanges feed a windowed conversation memory so follow-up
//! questions keep their context.

pub mod demo_db;
pub mod format;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use rusqlite::Connection;
use serde::Serialize;
use tracing::{error, info};

use crate::agents::AgentContext;
use crate::agents::core::memory::ConversationMemory;
use crate::error::AppError;
use crate::llm::CompletionRequest;
use crate::memory::now_iso8601;
use self::demo_db::open_conn;
use self::format::{clean_answer, extract_sql, fetch, format_direct_answer, format_rows, validate_read_only};

pub const SYSTEM_TEMPLATE: &str = "sql_system.txt";
pub const QUERY_TEMPLATE: &str = "sql_query.txt";

pub use crate::agents::EMPTY_QUESTION_MESSAGE;

/// Products with fewer units than this are listed as low stock.
pub const LOW_STOCK_THRESHOLD: i64 = 50;

const MODEL_NUM_PREDICT: u32 = 200;

const HIGHEST_SALARY: &str = "SELECT name, salary FROM users ORDER BY salary DESC LIMIT 1";
const ENGINEERING: &str = "SELECT name, salary FROM users WHERE department = 'Engineering'";
const ELECTRONICS: &str = "SELECT name, price FROM products WHERE category = 'Electronics'";
const OLDER_THAN_30: &str = "SELECT name, age FROM users WHERE age > 30";
const LOWEST_STOCK: &str = "SELECT name, stock FROM products ORDER BY stock ASC LIMIT 1";
const LARGEST_DEPARTMENT: &str =
    "SELECT department, COUNT(*) AS count FROM users GROUP BY department ORDER BY count DESC LIMIT 1";
const AVERAGE_SALARY: &str = "SELECT AVG(salary) AS avg_salary FROM users";
const ALICE_ORDERS: &str = "SELECT u.name, p.name AS product_name, o.quantity
    FROM orders o
    JOIN users u ON o.user_id = u.id
    JOIN products p ON o.product_id = p.id
    WHERE u.name LIKE '%Alice%'";

/// Keyword (matched case-insensitively as a substring) to SQL. First match wins.
pub const SQL_PATTERNS: &[(&str, &str)] = &[
    ("เงินเดือนสูงสุด", HIGHEST_SALARY),
    ("เงินเดือนสูงที่สุด", HIGHEST_SALARY),
    ("highest salary", HIGHEST_SALARY),
    ("engineering", ENGINEERING),
    ("electronics", ELECTRONICS),
    ("อายุมากกว่า 30", OLDER_THAN_30),
    ("older than 30", OLDER_THAN_30),
    ("สต็อกน้อยที่สุด", LOWEST_STOCK),
    ("lowest stock", LOWEST_STOCK),
    ("ฝ่ายไหนมีคนมากที่สุด", LARGEST_DEPARTMENT),
    ("most employees", LARGEST_DEPARTMENT),
    ("เงินเดือนเฉลี่ย", AVERAGE_SALARY),
    ("average salary", AVERAGE_SALARY),
    ("alice", ALICE_ORDERS),
];

pub const SUGGESTED_QUESTIONS: &[&str] = &[
    "Which employee has the best performance score?",
    "Which department has the most employees?",
    "Which product sells best?",
    "Who ordered the most products?",
    "Which department has the highest average salary?",
    "Which products have fewer than 50 units in stock?",
    "Which employees were hired in 2020?",
    "What is the total sales amount in January?",
    "Which department reached its sales target?",
    "Which Electronics product has the highest rating?",
];

/// Questions run by [`SqlAgent::test_performance`].
pub const PERFORMANCE_QUESTIONS: &[&str] = &[
    "มีใครบ้างในฝ่าย Engineering และเงินเดือนเท่าไร?",
    "ใครมีเงินเดือนสูงที่สุด?",
    "สินค้าในหมวด Electronics มีอะไรบ้าง และราคาเท่าไร?",
    "มีใครอายุมากกว่า 30 ปี?",
    "สินค้าไหนมีสต็อกน้อยที่สุด?",
    "ฝ่ายไหนมีคนมากที่สุด?",
    "เงินเดือนเฉลี่ยของพนักงานทั้งหมดคือเท่าไร?",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMethod {
    DirectSql,
    Agent,
}

#[derive(Debug, Clone, Serialize)]
pub struct SqlResult {
    pub success: bool,
    pub answer: String,
    pub question: String,
    /// Seconds.
    pub processing_time: f64,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<QueryMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Analytics {
    pub total_employees: i64,
    pub avg_salary: f64,
    pub dept_distribution: BTreeMap<String, i64>,
    pub avg_performance: f64,
    pub total_products: i64,
    pub avg_price: f64,
    pub category_distribution: BTreeMap<String, i64>,
    pub low_stock_products: Vec<String>,
    pub total_orders: i64,
    pub total_revenue: f64,
    pub avg_order_value: f64,
    pub order_status_distribution: BTreeMap<String, i64>,
    pub generated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceReport {
    pub total_questions: usize,
    pub successful: usize,
    pub total_time: f64,
    pub average_time: f64,
    pub results: Vec<SqlResult>,
}

/// First SQL in [`SQL_PATTERNS`] whose keyword occurs in `question`.
pub fn match_pattern(question: &str) -> Option<&'static str> {
    let q = question.to_lowercase();
    SQL_PATTERNS
        .iter()
        .find(|(keyword, _)| q.contains(&keyword.to_lowercase()))
        .map(|(_, sql)| *sql)
}

pub struct SqlAgent {
    ctx: AgentContext,
    db_path: PathBuf,
    max_rows: usize,
    memory: ConversationMemory,
    history: Vec<SqlResult>,
}

impl SqlAgent {
    /// Rebuild the demo database at the configured path and open the agent.
    pub fn new(ctx: AgentContext) -> Result<Self, AppError> {
        let db_path = ctx.config.agents.sql.db_path.clone();
        Self::with_db_path(ctx, db_path)
    }

    pub fn with_db_path(ctx: AgentContext, db_path: PathBuf) -> Result<Self, AppError> {
        demo_db::recreate(&db_path)?;
        let cfg = &ctx.config.agents.sql;
        let (max_rows, window) = (cfg.max_rows, cfg.memory_window);
        Ok(Self { ctx, db_path, max_rows, memory: ConversationMemory::window(window), history: Vec::new() })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn conn(&self) -> Result<Connection, AppError> {
        open_conn(&self.db_path)
    }

    /// Answer `question` and record it in the history.
    pub async fn query(&mut self, question: &str) -> SqlResult {
        self.query_opts(question, true).await
    }

    pub async fn query_opts(&mut self, question: &str, save_history: bool) -> SqlResult {
        let started = Instant::now();
        let question = question.trim();
        if question.is_empty() {
            return SqlResult {
                success: false,
                answer: EMPTY_QUESTION_MESSAGE.to_string(),
                question: String::new(),
                processing_time: 0.0,
                timestamp: now_iso8601(),
                method: None,
                sql: None,
            };
        }

        let result = match match_pattern(question) {
            Some(sql) => self.query_direct(question, sql, started),
            None => self.query_with_agent(question, started).await,
        };

        if save_history {
            if result.success {
                self.memory.save_context(question, result.answer.clone());
            }
            self.history.push(result.clone());
        }
        result
    }

    fn query_direct(&self, question: &str, sql: &str, started: Instant) -> SqlResult {
        info!(%question, "sql: direct pattern match");
        let outcome = self.conn().and_then(|conn| fetch(&conn, sql, self.max_rows));
        let (success, answer) = match outcome {
            Ok(rows) => (true, format_direct_answer(&rows)),
            Err(e) => {
                error!(error = %e, "sql: direct query failed");
                (false, format!("error: {e}"))
            }
        };
        SqlResult {
            success,
            answer,
            question: question.to_string(),
            processing_time: started.elapsed().as_secs_f64(),
            timestamp: now_iso8601(),
            method: Some(QueryMethod::DirectSql),
            sql: Some(sql.to_string()),
        }
    }

    async fn query_with_agent(&self, question: &str, started: Instant) -> SqlResult {
        info!(%question, "sql: asking model");
        let (success, answer, sql) = match self.generate_and_run(question).await {
            Ok((sql, answer)) => (true, answer, Some(sql)),
            Err(e) => {
                error!(error = %e, "sql: model query failed");
                (false, format!("error: {e}"), None)
            }
        };
        SqlResult {
            success,
            answer,
            question: question.to_string(),
            processing_time: started.elapsed().as_secs_f64(),
            timestamp: now_iso8601(),
            method: Some(QueryMethod::Agent),
            sql,
        }
    }

    async fn generate_and_run(&self, question: &str) -> Result<(String, String), AppError> {
        let schema = demo_db::schema_text(&self.conn()?)?;
        let system = self.ctx.template(SYSTEM_TEMPLATE)?.render([("schema", schema.as_str())]);

        let history = self.memory.history_text();
        let history_block = if history.is_empty() { String::new() } else { format!("Previous conversation:\n{history}\n") };
        let prompt = self
            .ctx
            .template(QUERY_TEMPLATE)?
            .render([("chat_history", history_block.as_str()), ("question", question)]);

        let request = CompletionRequest::new(prompt).system(system).temperature(0.0).num_predict(MODEL_NUM_PREDICT);
        let reply = self.ctx.request(&request).await?;

        let sql = extract_sql(&reply).ok_or_else(|| AppError::Sql("model reply contained no SQL query".into()))?;
        let sql = validate_read_only(&sql)?.to_string();
        info!(%sql, "sql: executing model query");
        let rows = fetch(&self.conn()?, &sql, self.max_rows)?;
        Ok((sql, clean_answer(&format_rows(&rows))))
    }

    pub fn history(&self) -> &[SqlResult] {
        &self.history
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    /// Write the history to `dir/query_history_<timestamp>.json`.
    pub fn export_history(&self, dir: &Path) -> Result<PathBuf, AppError> {
        let path = dir.join(format!("query_history_{}.json", Utc::now().format("%Y%m%d_%H%M%S")));
        let json = serde_json::to_string_pretty(&self.history)
            .map_err(|e| AppError::Sql(format!("cannot encode history: {e}")))?;
        std::fs::write(&path, json)?;
        info!(path = %path.display(), entries = self.history.len(), "query history exported");
        Ok(path)
    }

    /// `CREATE TABLE` statements of the demo tables.
    pub fn schema(&self) -> Result<String, AppError> {
        demo_db::schema_text(&self.conn()?)
    }

    pub fn suggest_questions(&self) -> &'static [&'static str] {
        SUGGESTED_QUESTIONS
    }

    /// Aggregates over employees, products and orders.
    pub fn analytics(&self) -> Result<Analytics, AppError> {
        let conn = self.conn()?;
        let q_err = |what: &'static str| move |e: rusqlite::Error| AppError::Sql(format!("analytics {what}: {e}"));

        let (total_employees, avg_salary, avg_performance): (i64, f64, f64) = conn
            .query_row(
                "SELECT COUNT(*), COALESCE(AVG(salary), 0), COALESCE(AVG(performance_score), 0) FROM users",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .map_err(q_err("users"))?;
        let (total_products, avg_price): (i64, f64) = conn
            .query_row("SELECT COUNT(*), COALESCE(AVG(price), 0) FROM products", [], |r| Ok((r.get(0)?, r.get(1)?)))
            .map_err(q_err("products"))?;
        let (total_orders, total_revenue, avg_order_value): (i64, f64, f64) = conn
            .query_row(
                "SELECT COUNT(*), COALESCE(SUM(o.total_amount), 0), COALESCE(AVG(o.total_amount), 0)
                 FROM orders o
                 JOIN products p ON o.product_id = p.id
                 JOIN users u ON o.user_id = u.id",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .map_err(q_err("orders"))?;

        let mut stmt = conn
            .prepare("SELECT name FROM products WHERE stock < ?1 ORDER BY id")
            .map_err(q_err("low stock"))?;
        let low_stock_products = stmt
            .query_map([LOW_STOCK_THRESHOLD], |r| r.get::<_, String>(0))
            .map_err(q_err("low stock"))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(q_err("low stock"))?;

        Ok(Analytics {
            total_employees,
            avg_salary,
            dept_distribution: distribution(&conn, "SELECT department, COUNT(*) FROM users GROUP BY department")?,
            avg_performance,
            total_products,
            avg_price,
            category_distribution: distribution(&conn, "SELECT category, COUNT(*) FROM products GROUP BY category")?,
            low_stock_products,
            total_orders,
            total_revenue,
            avg_order_value,
            order_status_distribution: distribution(&conn, "SELECT status, COUNT(*) FROM orders GROUP BY status")?,
            generated_at: now_iso8601(),
        })
    }

    /// Run [`PERFORMANCE_QUESTIONS`] without touching history or memory.
    pub async fn test_performance(&mut self) -> PerformanceReport {
        let mut results = Vec::with_capacity(PERFORMANCE_QUESTIONS.len());
        for q in PERFORMANCE_QUESTIONS {
            results.push(self.query_opts(q, false).await);
        }
        let total_time: f64 = results.iter().map(|r| r.processing_time).sum();
        let successful = results.iter().filter(|r| r.success).count();
        info!(successful, total = results.len(), total_time, "sql: performance run finished");
        PerformanceReport {
            total_questions: results.len(),
            successful,
            total_time,
            average_time: total_time / results.len().max(1) as f64,
            results,
        }
    }
}

fn distribution(conn: &Connection, sql: &str) -> Result<BTreeMap<String, i64>, AppError> {
    let err = |e: rusqlite::Error| AppError::Sql(format!("analytics distribution: {e}"));
    let mut stmt = conn.prepare(sql).map_err(err)?;
    let rows = stmt
        .query_map([], |r| Ok((r.get::<_, Option<String>>(0)?.unwrap_or_default(), r.get::<_, i64>(1)?)))
        .map_err(err)?;
    rows.collect::<Result<BTreeMap<_, _>, _>>().map_err(err)
}
