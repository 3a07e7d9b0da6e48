//! Query result capture and answer formatting.

use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use rusqlite::Connection;
use rusqlite::types::ValueRef;
use serde::Serialize;

use crate::error::AppError;

pub const NO_DATA_MESSAGE: &str = "No matching data found.";

static SQL_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```sql.*?```").expect("sql fence regex is valid"));
static INLINE_SELECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)SELECT.*?;").expect("inline select regex is valid"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex is valid"));
static LONG_INT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{4,}\b").expect("integer regex is valid"));
static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:sql|sqlite)?\s*(.*?)```").expect("fenced block regex is valid"));
static STATEMENT_START: LazyLock<Regex> =
    LazyLock::new(|| {
        Regex::new(r"(?i)\bSELECT\b|\bWITH\s+(?:RECURSIVE\s+)?\w+\s*(?:\([^)]*\))?\s*AS\b")
            .expect("statement regex is valid")
    });

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Cell {
    fn from_ref(v: ValueRef<'_>) -> Self {
        match v {
            ValueRef::Null => Cell::Null,
            ValueRef::Integer(i) => Cell::Integer(i),
            ValueRef::Real(f) => Cell::Real(f),
            ValueRef::Text(t) => Cell::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Cell::Text(format!("<{} bytes>", b.len())),
        }
    }

    /// Numbers rounded to whole units and grouped with commas.
    pub fn grouped(&self) -> String {
        match self {
            Cell::Integer(i) => group_thousands(*i),
            Cell::Real(f) if f.fract() == 0.0 && f.abs() < 1e15 => group_thousands(*f as i64),
            Cell::Real(f) => format!("{f:.2}"),
            other => other.to_string(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Integer(i) => Some(*i as f64),
            Cell::Real(f) => Some(*f),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => f.write_str("NULL"),
            Cell::Integer(i) => write!(f, "{i}"),
            Cell::Real(v) => write!(f, "{v}"),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl QueryRows {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    fn has(&self, name: &str) -> bool {
        self.column(name).is_some()
    }
}

/// Run `sql` and collect at most `max_rows` rows.
pub fn fetch(conn: &Connection, sql: &str, max_rows: usize) -> Result<QueryRows, AppError> {
    let mut stmt = conn.prepare(sql).map_err(|e| AppError::Sql(format!("prepare: {e}")))?;
    if !stmt.readonly() {
        return Err(AppError::Sql("only read-only statements are allowed".into()));
    }
    let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
    let width = columns.len();

    let mut rows = stmt.query([]).map_err(|e| AppError::Sql(format!("query: {e}")))?;
    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(|e| AppError::Sql(format!("read row: {e}")))? {
        if out.len() == max_rows {
            break;
        }
        let mut cells = Vec::with_capacity(width);
        for i in 0..width {
            let v = row.get_ref(i).map_err(|e| AppError::Sql(format!("read column {i}: {e}")))?;
            cells.push(Cell::from_ref(v));
        }
        out.push(cells);
    }
    Ok(QueryRows { columns, rows: out })
}

pub fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Phrase the result of a keyword-matched query by its column shape.
pub fn format_direct_answer(rows: &QueryRows) -> String {
    if rows.is_empty() {
        return NO_DATA_MESSAGE.to_string();
    }

    if rows.rows.len() == 1 && rows.columns.len() == 2 {
        let (a, b) = (&rows.rows[0][0], &rows.rows[0][1]);
        return if rows.has("salary") {
            format!("{a} earns {} baht", b.grouped())
        } else if rows.has("price") {
            format!("{a} costs {} baht", b.grouped())
        } else if rows.has("age") {
            format!("{a} is {b} years old")
        } else if rows.has("stock") {
            format!("{a} has {b} units in stock")
        } else if rows.has("count") {
            format!("Department {a} has {b} people")
        } else {
            format!("{a}: {b}")
        };
    }

    if let Some(i) = rows.column("avg_salary") {
        let avg = rows.rows[0][i].as_f64().unwrap_or_default();
        return format!("Average salary {} baht", group_thousands(avg.round() as i64));
    }

    let name = rows.column("name");
    let items: Vec<String> = rows
        .rows
        .iter()
        .map(|row| {
            let label = name.map(|i| &row[i]).unwrap_or(&row[0]);
            if let Some(i) = rows.column("salary") {
                format!("{label} ({} baht)", row[i].grouped())
            } else if let Some(i) = rows.column("price") {
                format!("{label} ({} baht)", row[i].grouped())
            } else if let Some(i) = rows.column("age") {
                format!("{label} ({} years)", row[i])
            } else {
                label.to_string()
            }
        })
        .collect();
    items.join(", ")
}

/// Generic rendering for model-written queries: rows separated by `; `,
/// each as `column: value` pairs.
pub fn format_rows(rows: &QueryRows) -> String {
    if rows.is_empty() {
        return NO_DATA_MESSAGE.to_string();
    }
    rows.rows
        .iter()
        .map(|row| {
            rows.columns
                .iter()
                .zip(row)
                .map(|(c, v)| format!("{c}: {v}"))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Strip SQL from a model answer, collapse whitespace and group integers
/// of four or more digits. Digit runs joined to other digits by `-`, `/`,
/// `:` or `.` (dates, times, decimals) are left as they are.
pub fn clean_answer(answer: &str) -> String {
    let s = SQL_FENCE.replace_all(answer, "");
    let s = INLINE_SELECT.replace_all(&s, "");
    let s = WHITESPACE.replace_all(&s, " ");
    let s = s.trim();
    LONG_INT
        .replace_all(s, |caps: &Captures| {
            let m = &caps[0];
            let (start, end) = caps.get(0).map(|g| (g.start(), g.end())).unwrap_or_default();
            if joined_to_digits(s, start, end) {
                return m.to_string();
            }
            m.parse::<i64>().map(group_thousands).unwrap_or_else(|_| m.to_string())
        })
        .into_owned()
}

fn joined_to_digits(s: &str, start: usize, end: usize) -> bool {
    let is_joiner = |c: char| matches!(c, '-' | '/' | ':' | '.');
    let mut before = s[..start].chars().rev();
    let mut after = s[end..].chars();
    let joined_before = before.next().is_some_and(is_joiner) && before.next().is_some_and(|c| c.is_ascii_digit());
    let joined_after = after.next().is_some_and(is_joiner) && after.next().is_some_and(|c| c.is_ascii_digit());
    joined_before || joined_after
}

/// Pull one SQL statement out of a model reply: the first fenced block if
/// any, otherwise everything from the first `SELECT`/`WITH` keyword.
pub fn extract_sql(reply: &str) -> Option<String> {
    let body = FENCED_BLOCK
        .captures(reply)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(reply);
    let start = STATEMENT_START.find(body)?.start();
    let sql = body[start..].trim();
    let sql = match sql.find(';') {
        Some(end) if sql[end + 1..].trim().is_empty() => &sql[..end],
        _ => sql,
    };
    let sql = sql.trim();
    (!sql.is_empty()).then(|| sql.to_string())
}

/// Accept exactly one statement that starts with `SELECT` or `WITH`.
/// A `;` inside a quoted literal or identifier does not end the statement.
pub fn validate_read_only(sql: &str) -> Result<&str, AppError> {
    let sql = sql.trim().trim_end_matches(';').trim();
    if has_unquoted_semicolon(sql) {
        return Err(AppError::Sql("multiple statements are not allowed".into()));
    }
    let first = sql.split_whitespace().next().unwrap_or_default().to_ascii_uppercase();
    if first != "SELECT" && first != "WITH" {
        return Err(AppError::Sql(format!("only SELECT or WITH queries are allowed, got '{first}'")));
    }
    Ok(sql)
}

/// Doubled quotes (`'it''s'`) toggle twice and so stay inside the literal.
fn has_unquoted_semicolon(sql: &str) -> bool {
    let mut quote: Option<char> = None;
    for c in sql.chars() {
        match (quote, c) {
            (None, '\'' | '"' | '`') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, ';') => return true,
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(columns: &[&str], data: Vec<Vec<Cell>>) -> QueryRows {
        QueryRows { columns: columns.iter().map(|c| c.to_string()).collect(), rows: data }
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(950), "950");
        assert_eq!(group_thousands(95000), "95,000");
        assert_eq!(group_thousands(-1234567), "-1,234,567");
    }

    #[test]
    fn single_row_shapes() {
        let r = rows(&["name", "salary"], vec![vec![Cell::Text("Wichan".into()), Cell::Integer(95000)]]);
        assert_eq!(format_direct_answer(&r), "Wichan earns 95,000 baht");
        let r = rows(&["name", "stock"], vec![vec![Cell::Text("Standing Desk".into()), Cell::Integer(20)]]);
        assert_eq!(format_direct_answer(&r), "Standing Desk has 20 units in stock");
        let r = rows(&["avg_salary"], vec![vec![Cell::Real(71625.0)]]);
        assert_eq!(format_direct_answer(&r), "Average salary 71,625 baht");
    }

    #[test]
    fn multi_row_lists() {
        let r = rows(
            &["name", "price"],
            vec![
                vec![Cell::Text("MacBook Pro".into()), Cell::Real(89000.0)],
                vec![Cell::Text("Webcam".into()), Cell::Real(4500.0)],
            ],
        );
        assert_eq!(format_direct_answer(&r), "MacBook Pro (89,000 baht), Webcam (4,500 baht)");
        assert_eq!(format_direct_answer(&QueryRows::default()), NO_DATA_MESSAGE);
    }

    #[test]
    fn clean_answer_strips_sql_and_groups() {
        let raw = "```sql\nSELECT 1\n```\nTotal   revenue is 374000 baht. SELECT x FROM y; done";
        assert_eq!(clean_answer(raw), "Total revenue is 374,000 baht. done");
    }

    #[test]
    fn clean_answer_leaves_dates_alone() {
        let raw = "name: Somchai, hire_date: 2020-01-15, salary: 85000; at 12:30:45 paid 1234.50";
        assert_eq!(clean_answer(raw), "name: Somchai, hire_date: 2020-01-15, salary: 85,000; at 12:30:45 paid 1234.50");
        assert_eq!(clean_answer("loss of -12000."), "loss of -12,000.");
    }

    #[test]
    fn extract_from_fence_or_prose() {
        assert_eq!(
            extract_sql("Here you go:\n```sql\nSELECT name FROM users;\n```").as_deref(),
            Some("SELECT name FROM users")
        );
        assert_eq!(
            extract_sql("A: select count(*) from orders").as_deref(),
            Some("select count(*) from orders")
        );
        assert!(extract_sql("I don't know").is_none());
        assert!(extract_sql("Happy to help with that").is_none());
        assert_eq!(
            extract_sql("WITH t AS (SELECT 1 AS n) SELECT n FROM t").as_deref(),
            Some("WITH t AS (SELECT 1 AS n) SELECT n FROM t")
        );
    }

    #[test]
    fn only_single_read_statements_pass() {
        assert_eq!(validate_read_only("SELECT 1;").unwrap(), "SELECT 1");
        assert!(validate_read_only("WITH t AS (SELECT 1) SELECT * FROM t").is_ok());
        assert!(validate_read_only("DELETE FROM users").is_err());
        assert!(validate_read_only("SELECT 1; DROP TABLE users").is_err());
        assert!(validate_read_only("SELECT 'a;b' AS note, \"x;y\" FROM t").is_ok());
        assert!(validate_read_only("SELECT 'it''s; fine'").is_ok());
        assert!(validate_read_only("SELECT 'a'; DELETE FROM users WHERE note = ';'").is_err());
    }
}
