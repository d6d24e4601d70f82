// quote-desk: append-only SQLite store of quotations and admin credentials

use crate::product::ProductLine;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS quotations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    product_line TEXT NOT NULL,
    customer_name TEXT NOT NULL,
    customer_email TEXT NOT NULL,
    customer_phone TEXT NOT NULL,
    message TEXT NOT NULL DEFAULT '',
    table_details TEXT NOT NULL,
    grand_total REAL NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS quotations_by_line ON quotations (product_line, id);
CREATE TABLE IF NOT EXISTS quotation_admins (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    password TEXT NOT NULL
);
";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("stored product line is invalid: {0}")]
    InvalidProductLine(String),
    #[error("database task failed: {0}")]
    Task(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A persisted submission as served by the listing endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotationRecord {
    pub id: i64,
    pub product_line: ProductLine,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub message: String,
    pub table_details: String,
    pub grand_total: f64,
    pub created_at: String,
}

/// Fields of a submission not yet stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuotation {
    pub product_line: ProductLine,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub message: String,
    pub table_details: String,
    pub grand_total: f64,
}

#[derive(Clone)]
pub struct QuotationStore {
    conn: Arc<Mutex<Connection>>,
}

impl QuotationStore {
    pub fn open(path: &Path) -> StoreResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` on the blocking pool while holding the connection.
    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone().lock_owned().await;
        tokio::task::spawn_blocking(move || f(&*conn))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }

    /// Appends a quotation and returns its id.
    pub async fn insert(&self, quotation: &NewQuotation) -> StoreResult<i64> {
        let q = quotation.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO quotations
                 (product_line, customer_name, customer_email, customer_phone, message, table_details, grand_total, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    q.product_line.as_str(),
                    q.customer_name,
                    q.customer_email,
                    q.customer_phone,
                    q.message,
                    q.table_details,
                    q.grand_total,
                    chrono::Utc::now().to_rfc3339(),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    /// All quotations of one product line, newest first.
    pub async fn list(&self, product_line: ProductLine) -> StoreResult<Vec<QuotationRecord>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, product_line, customer_name, customer_email, customer_phone,
                        message, table_details, grand_total, created_at
                 FROM quotations WHERE product_line = ?1 ORDER BY id DESC",
            )?;
            let mut rows = stmt.query(params![product_line.as_str()])?;

            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(row_to_record(row)?);
            }
            Ok(records)
        })
        .await
    }

    pub async fn count(&self, product_line: ProductLine) -> StoreResult<i64> {
        self.with_conn(move |conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM quotations WHERE product_line = ?1",
                params![product_line.as_str()],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
    }

    pub async fn add_admin(&self, username: &str, password: &str) -> StoreResult<i64> {
        let (username, password) = (username.to_string(), password.to_string());
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO quotation_admins (username, password) VALUES (?1, ?2)",
                params![username, password],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    /// Id of the admin whose stored credentials match exactly.
    pub async fn find_admin(&self, username: &str, password: &str) -> StoreResult<Option<i64>> {
        let (username, password) = (username.to_string(), password.to_string());
        self.with_conn(move |conn| {
            let id = conn
                .query_row(
                    "SELECT id FROM quotation_admins WHERE username = ?1 AND password = ?2",
                    params![username, password],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(id)
        })
        .await
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> StoreResult<QuotationRecord> {
    let line: String = row.get(1)?;
    Ok(QuotationRecord {
        id: row.get(0)?,
        product_line: line
            .parse()
            .map_err(|_| StoreError::InvalidProductLine(line.clone()))?,
        customer_name: row.get(2)?,
        customer_email: row.get(3)?,
        customer_phone: row.get(4)?,
        message: row.get(5)?,
        table_details: row.get(6)?,
        grand_total: row.get(7)?,
        created_at: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quotation(line: ProductLine, name: &str) -> NewQuotation {
        NewQuotation {
            product_line: line,
            customer_name: name.to_string(),
            customer_email: "akhila@gmail.com".to_string(),
            customer_phone: "9876543210".to_string(),
            message: String::new(),
            table_details: "[]".to_string(),
            grand_total: 500.0,
        }
    }

    #[tokio::test]
    async fn list_is_newest_first_and_per_line() {
        let store = QuotationStore::open_in_memory().unwrap();
        store.insert(&quotation(ProductLine::Website, "First")).await.unwrap();
        store.insert(&quotation(ProductLine::App, "Other")).await.unwrap();
        store.insert(&quotation(ProductLine::Website, "Second")).await.unwrap();

        let records = store.list(ProductLine::Website).await.unwrap();
        let names: Vec<_> = records.iter().map(|r| r.customer_name.as_str()).collect();
        assert_eq!(names, vec!["Second", "First"]);
        assert!(records.iter().all(|r| r.product_line == ProductLine::Website));
        assert_eq!(store.count(ProductLine::App).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn admin_lookup_requires_exact_match() {
        let store = QuotationStore::open_in_memory().unwrap();
        let id = store.add_admin("admin", "s3cret").await.unwrap();

        assert_eq!(store.find_admin("admin", "s3cret").await.unwrap(), Some(id));
        assert_eq!(store.find_admin("admin", "S3cret").await.unwrap(), None);
        assert_eq!(store.find_admin("Admin", "s3cret").await.unwrap(), None);
    }

    #[tokio::test]
    async fn store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quotes.db");
        {
            let store = QuotationStore::open(&path).unwrap();
            store.insert(&quotation(ProductLine::App, "Kept")).await.unwrap();
        }
        let store = QuotationStore::open(&path).unwrap();
        let records = store.list(ProductLine::App).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].customer_name, "Kept");
        assert_eq!(records[0].grand_total, 500.0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_inserts_get_distinct_ids() {
        let store = QuotationStore::open_in_memory().unwrap();
        let tasks: Vec<_> = (0..8)
            .map(|n| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .insert(&quotation(ProductLine::Website, &format!("Customer {n}")))
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut ids = Vec::new();
        for task in tasks {
            ids.push(task.await.unwrap());
        }
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 8);
        assert_eq!(store.count(ProductLine::Website).await.unwrap(), 8);
    }
}
