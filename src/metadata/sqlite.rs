//! SQLite-backed metadata store.
//!
//! Uses `rusqlite` with the `bundled` feature so no system SQLite
//! library is required.  All async trait methods are thin wrappers
//! around synchronous rusqlite calls executed under a `Mutex`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::store::{MetadataStore, NewObjectRecord, ObjectRecord};

/// Metadata store backed by a single SQLite database file.
pub struct SqliteMetadataStore {
    /// The database connection, guarded by a mutex for Send + Sync.
    conn: Mutex<Connection>,
}

impl SqliteMetadataStore {
    /// Open (or create) the database at `path` and initialize the schema.
    ///
    /// Passing `":memory:"` creates an in-memory database (useful for tests).
    pub fn new(path: &str) -> anyhow::Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.apply_pragmas()?;
        store.init_db()?;
        Ok(store)
    }

    /// Apply recommended SQLite pragmas for performance and safety.
    fn apply_pragmas(&self) -> anyhow::Result<()> {
        let conn = self.conn.lock().expect("mutex poisoned");
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
            ",
        )?;
        Ok(())
    }

    /// Create the required table and index if they do not already exist.
    /// Idempotent -- safe to call on every startup.
    fn init_db(&self) -> anyhow::Result<()> {
        let conn = self.conn.lock().expect("mutex poisoned");
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS objects (
                seq         INTEGER PRIMARY KEY AUTOINCREMENT,
                id          TEXT NOT NULL UNIQUE,
                title       TEXT NOT NULL,
                description TEXT NOT NULL,
                image_url   TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_objects_created_at
                ON objects (created_at DESC, seq ASC);
            ",
        )?;
        Ok(())
    }

    /// Render a timestamp in the fixed-width RFC 3339 form stored in the
    /// `created_at` column.  Fixed width keeps lexicographic order equal
    /// to chronological order.
    fn format_timestamp(ts: DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
    }

    fn parse_timestamp(raw: &str) -> anyhow::Result<DateTime<Utc>> {
        Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
    }

    fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, String, String, String, String)> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
        ))
    }

    fn build_record(
        (id, title, description, image_url, created_at): (String, String, String, String, String),
    ) -> anyhow::Result<ObjectRecord> {
        Ok(ObjectRecord {
            id: Uuid::parse_str(&id)?,
            title,
            description,
            image_url,
            created_at: Self::parse_timestamp(&created_at)?,
        })
    }
}

const SELECT_COLUMNS: &str = "id, title, description, image_url, created_at";

impl MetadataStore for SqliteMetadataStore {
    fn insert(
        &self,
        record: NewObjectRecord,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ObjectRecord>> + Send + '_>> {
        Box::pin(async move {
            let id = Uuid::new_v4();
            let created_at = Utc::now();
            let conn = self.conn.lock().expect("mutex poisoned");
            conn.execute(
                "INSERT INTO objects (id, title, description, image_url, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id.to_string(),
                    record.title,
                    record.description,
                    record.image_url,
                    Self::format_timestamp(created_at),
                ],
            )?;
            Ok(ObjectRecord {
                id,
                title: record.title,
                description: record.description,
                image_url: record.image_url,
                created_at,
            })
        })
    }

    fn find_by_id(
        &self,
        id: Uuid,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<ObjectRecord>>> + Send + '_>> {
        Box::pin(async move {
            let conn = self.conn.lock().expect("mutex poisoned");
            let row = conn
                .query_row(
                    &format!("SELECT {SELECT_COLUMNS} FROM objects WHERE id = ?1"),
                    params![id.to_string()],
                    Self::row_to_record,
                )
                .optional()?;
            row.map(Self::build_record).transpose()
        })
    }

    fn list_by_created_desc(
        &self,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<ObjectRecord>>> + Send + '_>> {
        Box::pin(async move {
            let conn = self.conn.lock().expect("mutex poisoned");
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM objects
                 ORDER BY created_at DESC, seq ASC"
            ))?;
            let rows = stmt.query_map([], Self::row_to_record)?;
            let mut records = Vec::new();
            for row in rows {
                records.push(Self::build_record(row?)?);
            }
            Ok(records)
        })
    }

    fn delete_by_id(
        &self,
        id: Uuid,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<bool>> + Send + '_>> {
        Box::pin(async move {
            let conn = self.conn.lock().expect("mutex poisoned");
            let affected =
                conn.execute("DELETE FROM objects WHERE id = ?1", params![id.to_string()])?;
            Ok(affected > 0)
        })
    }
}

// -- Tests --------------------------------------------------------------------
