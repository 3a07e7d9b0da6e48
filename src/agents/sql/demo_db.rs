//! Demo SQLite database: schema, seed rows and indexes.
//!
//! The file is deleted and rebuilt every time the SQL agent starts, so runs
//! never see each other's data.

use std::path::Path;

use rusqlite::{Connection, params};
use tracing::info;

use crate::error::AppError;

pub const TABLES: &[&str] = &["users", "products", "orders", "departments", "sales_targets"];

const SCHEMA: &str = "
CREATE TABLE users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    age INTEGER NOT NULL,
    email TEXT UNIQUE,
    department TEXT,
    salary INTEGER,
    hire_date DATE,
    manager_id INTEGER,
    city TEXT,
    performance_score REAL,
    FOREIGN KEY (manager_id) REFERENCES users (id)
);
CREATE TABLE products (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    price REAL NOT NULL,
    category TEXT,
    stock INTEGER DEFAULT 0,
    supplier TEXT,
    created_date DATE,
    rating REAL,
    description TEXT
);
CREATE TABLE orders (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER,
    product_id INTEGER,
    quantity INTEGER,
    order_date DATE,
    status TEXT DEFAULT 'pending',
    total_amount REAL,
    discount REAL DEFAULT 0,
    FOREIGN KEY (user_id) REFERENCES users (id),
    FOREIGN KEY (product_id) REFERENCES products (id)
);
CREATE TABLE departments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    budget INTEGER,
    manager_id INTEGER,
    location TEXT,
    FOREIGN KEY (manager_id) REFERENCES users (id)
);
CREATE TABLE sales_targets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    department TEXT,
    month TEXT,
    target_amount INTEGER,
    actual_amount INTEGER,
    year INTEGER
);
";

const INDEXES: &str = "
CREATE INDEX IF NOT EXISTS idx_users_department ON users(department);
CREATE INDEX IF NOT EXISTS idx_users_salary ON users(salary);
CREATE INDEX IF NOT EXISTS idx_products_category ON products(category);
CREATE INDEX IF NOT EXISTS idx_orders_user_id ON orders(user_id);
CREATE INDEX IF NOT EXISTS idx_orders_product_id ON orders(product_id);
";

const DEPARTMENTS: &[(&str, i64, &str)] = &[
    ("Engineering", 500_000, "Bangkok"),
    ("Marketing", 300_000, "Bangkok"),
    ("Sales", 400_000, "Chiang Mai"),
    ("HR", 200_000, "Bangkok"),
    ("Finance", 350_000, "Bangkok"),
];

// name, age, email, department, salary, hire_date, manager_id, city, performance_score
type UserRow = (&'static str, i64, &'static str, &'static str, i64, &'static str, Option<i64>, &'static str, f64);

const USERS: &[UserRow] = &[
    ("สมชาย วงศ์ใหญ่", 35, "somchai@company.com", "Engineering", 85_000, "2020-01-15", None, "Bangkok", 4.5),
    ("สมหญิง ดีมาก", 28, "somying@company.com", "Marketing", 65_000, "2021-03-20", Some(1), "Bangkok", 4.2),
    ("วิชาญ เก่งมาก", 42, "wichan@company.com", "Engineering", 95_000, "2018-07-10", None, "Bangkok", 4.8),
    ("นันทนา สวยงาม", 30, "nantana@company.com", "Sales", 70_000, "2019-11-05", Some(3), "Chiang Mai", 4.3),
    ("ประสิทธิ์ มั่นใจ", 38, "prasit@company.com", "HR", 60_000, "2019-05-12", None, "Bangkok", 4.1),
    ("อรุณ ขยัน", 26, "arun@company.com", "Marketing", 55_000, "2022-01-08", Some(2), "Bangkok", 3.9),
    ("สุดา เฉลียว", 33, "suda@company.com", "Finance", 75_000, "2020-09-15", None, "Bangkok", 4.4),
    ("พิมพ์ใจ รัก", 29, "pimjai@company.com", "Sales", 68_000, "2021-06-20", Some(4), "Chiang Mai", 4.6),
];

// name, price, category, stock, supplier, rating, description
type ProductRow = (&'static str, f64, &'static str, i64, &'static str, f64, &'static str);

const PRODUCTS: &[ProductRow] = &[
    ("MacBook Pro", 89_000.0, "Electronics", 25, "Apple Thailand", 4.7, "High-performance laptop"),
    ("iPhone 15", 35_000.0, "Electronics", 50, "Apple Thailand", 4.5, "Latest smartphone"),
    ("Samsung Monitor", 15_000.0, "Electronics", 80, "Samsung", 4.3, "27-inch 4K monitor"),
    ("Wireless Mouse", 1_500.0, "Electronics", 200, "Logitech", 4.2, "Ergonomic wireless mouse"),
    ("Mechanical Keyboard", 3_500.0, "Electronics", 150, "Corsair", 4.4, "RGB mechanical keyboard"),
    ("Office Chair", 12_000.0, "Furniture", 30, "Herman Miller", 4.6, "Ergonomic office chair"),
    ("Standing Desk", 25_000.0, "Furniture", 20, "IKEA", 4.1, "Height-adjustable desk"),
    ("Tablet", 18_000.0, "Electronics", 60, "Samsung", 4.0, "Android tablet"),
    ("Headphones", 8_000.0, "Electronics", 100, "Sony", 4.5, "Noise-canceling headphones"),
    ("Webcam", 4_500.0, "Electronics", 75, "Logitech", 4.2, "HD webcam for meetings"),
];

const PRODUCT_CREATED: &str = "2024-01-01";

// user_id, product_id, quantity, order_date, status, total_amount, discount
type OrderRow = (i64, i64, i64, &'static str, &'static str, f64, f64);

const ORDERS: &[OrderRow] = &[
    (1, 1, 2, "2024-01-15", "completed", 70_000.0, 5_000.0),
    (2, 1, 1, "2024-01-16", "completed", 89_000.0, 0.0),
    (1, 3, 1, "2024-01-17", "pending", 15_000.0, 0.0),
    (3, 2, 3, "2024-01-18", "completed", 105_000.0, 10_000.0),
    (4, 4, 1, "2024-01-19", "shipped", 1_500.0, 0.0),
    (5, 5, 2, "2024-01-20", "completed", 7_000.0, 1_000.0),
    (6, 6, 1, "2024-01-21", "pending", 12_000.0, 0.0),
    (7, 7, 3, "2024-01-22", "completed", 54_000.0, 4_000.0),
    (8, 8, 1, "2024-01-23", "shipped", 4_500.0, 0.0),
    (1, 9, 2, "2024-01-24", "completed", 16_000.0, 0.0),
];

const SALES_TARGETS: &[(&str, &str, i64, i64, i64)] = &[
    ("Sales", "January", 500_000, 480_000, 2024),
    ("Sales", "February", 520_000, 510_000, 2024),
    ("Marketing", "January", 300_000, 290_000, 2024),
    ("Marketing", "February", 310_000, 320_000, 2024),
];

fn sql_err(what: &str) -> impl Fn(rusqlite::Error) -> AppError + '_ {
    move |e| AppError::Sql(format!("{what}: {e}"))
}

/// Open the database with foreign keys on and a busy timeout.
pub fn open_conn(db_path: &Path) -> Result<Connection, AppError> {
    let conn = Connection::open(db_path)
        .map_err(|e| AppError::Sql(format!("open {}: {e}", db_path.display())))?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(sql_err("set foreign_keys ON"))?;
    conn.pragma_update(None, "busy_timeout", 5000)
        .map_err(sql_err("set busy_timeout"))?;
    Ok(conn)
}

/// Delete `db_path` if present and rebuild it with schema, seed data and
/// indexes.
pub fn recreate(db_path: &Path) -> Result<(), AppError> {
    if db_path.exists() {
        std::fs::remove_file(db_path)?;
    }
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut conn = open_conn(db_path)?;
    conn.execute_batch(SCHEMA).map_err(sql_err("create schema"))?;

    let tx = conn.transaction().map_err(sql_err("begin seed"))?;
    for (name, budget, location) in DEPARTMENTS {
        tx.execute(
            "INSERT INTO departments (name, budget, manager_id, location) VALUES (?1, ?2, NULL, ?3)",
            params![name, budget, location],
        )
        .map_err(sql_err("seed departments"))?;
    }
    for (name, age, email, dept, salary, hired, manager, city, score) in USERS {
        tx.execute(
            "INSERT INTO users (name, age, email, department, salary, hire_date, manager_id, city, performance_score)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![name, age, email, dept, salary, hired, manager, city, score],
        )
        .map_err(sql_err("seed users"))?;
    }
    for (name, price, category, stock, supplier, rating, description) in PRODUCTS {
        tx.execute(
            "INSERT INTO products (name, price, category, stock, supplier, created_date, rating, description)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![name, price, category, stock, supplier, PRODUCT_CREATED, rating, description],
        )
        .map_err(sql_err("seed products"))?;
    }
    for (user_id, product_id, quantity, date, status, total, discount) in ORDERS {
        tx.execute(
            "INSERT INTO orders (user_id, product_id, quantity, order_date, status, total_amount, discount)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![user_id, product_id, quantity, date, status, total, discount],
        )
        .map_err(sql_err("seed orders"))?;
    }
    for (dept, month, target, actual, year) in SALES_TARGETS {
        tx.execute(
            "INSERT INTO sales_targets (department, month, target_amount, actual_amount, year)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![dept, month, target, actual, year],
        )
        .map_err(sql_err("seed sales_targets"))?;
    }
    tx.commit().map_err(sql_err("commit seed"))?;

    conn.execute_batch(INDEXES).map_err(sql_err("create indexes"))?;
    info!(path = %db_path.display(), "demo database ready");
    Ok(())
}

/// `CREATE TABLE` statements of the demo tables, in [`TABLES`] order.
pub fn schema_text(conn: &Connection) -> Result<String, AppError> {
    let mut stmt = conn
        .prepare("SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1")
        .map_err(sql_err("prepare schema"))?;
    let mut parts = Vec::with_capacity(TABLES.len());
    for table in TABLES {
        let sql: String = stmt
            .query_row(params![table], |row| row.get(0))
            .map_err(sql_err("read schema"))?;
        parts.push(sql);
    }
    Ok(parts.join(";\n\n") + ";")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0)).unwrap()
    }

    #[test]
    fn recreate_seeds_every_table() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("demo.db");
        recreate(&path).unwrap();
        let conn = open_conn(&path).unwrap();
        assert_eq!(count(&conn, "users"), 8);
        assert_eq!(count(&conn, "products"), 10);
        assert_eq!(count(&conn, "orders"), 10);
        assert_eq!(count(&conn, "departments"), 5);
        assert_eq!(count(&conn, "sales_targets"), 4);
    }

    #[test]
    fn recreate_discards_previous_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("demo.db");
        recreate(&path).unwrap();
        open_conn(&path)
            .unwrap()
            .execute("DELETE FROM orders", [])
            .unwrap();
        recreate(&path).unwrap();
        assert_eq!(count(&open_conn(&path).unwrap(), "orders"), 10);
    }

    #[test]
    fn schema_lists_all_tables() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("demo.db");
        recreate(&path).unwrap();
        let schema = schema_text(&open_conn(&path).unwrap()).unwrap();
        for table in TABLES {
            assert!(schema.contains(&format!("CREATE TABLE {table}")));
        }
    }
}
