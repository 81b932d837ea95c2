//! SQLite-backed document store
//!
//! Every document is one row keyed by its full path. The collection name is
//! denormalised into its own column so collection-group queries stay indexed;
//! ancestor tags are matched with `json_extract` on the stored body.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::{check_batch, check_document_path, merge, Document, DocumentStore, StoreError, WriteOp};
use crate::core::layer::LAYER_IDENTIFIERS_KEY;
use crate::core::path::{get_id, get_path, normalise_path, segments};

/// Current schema version; stores written with any other version are refused
const SCHEMA_VERSION: i32 = 1;

/// Document store in a single SQLite file
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at `path`
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        let conn = Connection::open(path).map_err(backend)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(backend)?;
        Self::from_connection(conn)
    }

    /// A store that lives only as long as the process
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory().map_err(backend)?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Backend("connection lock poisoned".to_string()))
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );
            "#,
        )
        .map_err(backend)?;

        let version: Option<i32> = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .optional()
            .map_err(backend)?;

        match version {
            Some(SCHEMA_VERSION) => {}
            Some(found) => {
                return Err(StoreError::UnsupportedSchema {
                    found,
                    expected: SCHEMA_VERSION,
                })
            }
            None => {
                conn.execute_batch(
                    r#"
                    CREATE TABLE IF NOT EXISTS documents (
                        path TEXT PRIMARY KEY,
                        collection TEXT NOT NULL,
                        depth INTEGER NOT NULL,
                        data TEXT NOT NULL
                    );
                    CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection);
                    "#,
                )
                .map_err(backend)?;
                conn.execute(
                    "INSERT INTO schema_version (version) VALUES (?1)",
                    params![SCHEMA_VERSION],
                )
                .map_err(backend)?;
            }
        }
        Ok(())
    }

    fn get_sync(&self, path: &str) -> Result<Option<Document>, StoreError> {
        check_document_path(path)?;
        let path = normalise_path(path);
        let conn = self.lock()?;
        let body: Option<String> = conn
            .query_row(
                "SELECT data FROM documents WHERE path = ?1",
                params![path],
                |row| row.get(0),
            )
            .optional()
            .map_err(backend)?;
        body.map(|body| decode(&path, &body).map(|data| Document::new(path.clone(), data)))
            .transpose()
    }

    fn select_sync(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<Document>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql).map_err(backend)?;
        let rows = stmt
            .query_map(args, |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
            .map_err(backend)?;

        let mut documents = Vec::new();
        for row in rows {
            let (path, body) = row.map_err(backend)?;
            let data = decode(&path, &body)?;
            documents.push(Document::new(path, data));
        }
        Ok(documents)
    }

    fn apply_sync(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        check_batch(&ops)?;
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(backend)?;
        for op in ops {
            match op {
                WriteOp::Set { path, data } => {
                    let path = normalise_path(&path);
                    upsert(&tx, &path, &data)?;
                }
                WriteOp::Update { path, data } => {
                    let path = normalise_path(&path);
                    let body: Option<String> = tx
                        .query_row(
                            "SELECT data FROM documents WHERE path = ?1",
                            params![path],
                            |row| row.get(0),
                        )
                        .optional()
                        .map_err(backend)?;
                    let mut existing = match body {
                        Some(body) => decode(&path, &body)?,
                        None => return Err(StoreError::MissingDocument(path)),
                    };
                    merge(&mut existing, data);
                    upsert(&tx, &path, &existing)?;
                }
                WriteOp::Delete { path } => {
                    tx.execute(
                        "DELETE FROM documents WHERE path = ?1",
                        params![normalise_path(&path)],
                    )
                    .map_err(backend)?;
                }
            }
        }
        // dropping an uncommitted transaction rolls it back
        tx.commit().map_err(backend)
    }
}

fn upsert(conn: &Connection, path: &str, data: &Map<String, Value>) -> Result<(), StoreError> {
    let body = serde_json::to_string(data).map_err(|e| StoreError::Corrupt {
        path: path.to_string(),
        reason: e.to_string(),
    })?;
    let depth = segments(path).map_or(0, |segs| segs.len()) as i64;
    conn.execute(
        "INSERT INTO documents (path, collection, depth, data) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(path) DO UPDATE SET data = excluded.data",
        params![path, get_id(&get_path(path)), depth, body],
    )
    .map_err(backend)?;
    Ok(())
}

fn decode(path: &str, body: &str) -> Result<Map<String, Value>, StoreError> {
    match serde_json::from_str(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(StoreError::Corrupt {
            path: path.to_string(),
            reason: "document body is not an object".to_string(),
        }),
        Err(e) => Err(StoreError::Corrupt {
            path: path.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn backend(e: rusqlite::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn get(&self, path: &str) -> Result<Option<Document>, StoreError> {
        self.get_sync(path)
    }

    async fn query_tagged(
        &self,
        collection: &str,
        tag: &str,
        id: &str,
    ) -> Result<Vec<Document>, StoreError> {
        let selector = format!("$.{}.{}", LAYER_IDENTIFIERS_KEY, tag);
        self.select_sync(
            "SELECT path, data FROM documents
             WHERE collection = ?1 AND json_extract(data, ?2) = ?3
             ORDER BY path",
            params![collection, selector, id],
        )
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.select_sync(
            "SELECT path, data FROM documents
             WHERE collection = ?1 AND depth = 1
             ORDER BY path",
            params![collection],
        )
    }

    async fn apply_batch(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        self.apply_sync(ops)
    }
}
