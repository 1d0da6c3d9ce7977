//! Storage layer for cornerstone.
//!
//! This module provides `SQLite`-backed document storage. Every document is a
//! JSON object keyed by collection and identifier, and every write replaces
//! the whole document. There is no versioning or optimistic locking: the
//! last write wins.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::model::{
    date_key, validate_id, CalendarEvent, Collection, DailyStats, GalleryPhoto, PageContent,
    Record, SiteSettings, TrainingProgram, Visit,
};

/// A raw document as stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDocument {
    /// Collection the document belongs to.
    pub collection: Collection,
    /// Identifier within the collection.
    pub id: String,
    /// The full document.
    pub body: Value,
    /// When the document was first written.
    pub created_at: DateTime<Utc>,
    /// When the document was last written.
    pub updated_at: DateTime<Utc>,
}

/// Columns selected for a [`StoredDocument`], in row order.
const DOCUMENT_COLUMNS: &str = "id, body, COALESCE(created_at, updated_at), updated_at";

type DocumentRow = (String, String, String, String);

fn document_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DocumentRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

/// Document store.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a document, replacing any existing one with the same id.
    ///
    /// Returns the time recorded as `updated_at`. `created_at` is set on
    /// the first write only.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is malformed, the body is not a JSON
    /// object, or the database operation fails.
    pub fn put_document(
        &self,
        collection: Collection,
        id: &str,
        body: &Value,
    ) -> Result<DateTime<Utc>> {
        validate_id(id)?;
        if !body.is_object() {
            return Err(Error::invalid("document body must be a JSON object"));
        }

        let updated_at = Utc::now();
        self.conn.execute(
            r"
            INSERT INTO documents (collection, id, body, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            ON CONFLICT (collection, id) DO UPDATE SET
                body = excluded.body,
                updated_at = excluded.updated_at
            ",
            params![
                collection.as_str(),
                id,
                serde_json::to_string(body)?,
                updated_at.to_rfc3339(),
            ],
        )?;

        debug!("Wrote {}/{}", collection, id);
        Ok(updated_at)
    }

    /// Get a document by collection and id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_document(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<StoredDocument>> {
        let sql = format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE collection = ?1 AND id = ?2"
        );
        let row = self
            .conn
            .query_row(&sql, params![collection.as_str(), id], document_row)
            .optional()?;

        row.map(|row| Self::to_document(collection, row)).transpose()
    }

    /// List every document in a collection, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_documents(&self, collection: Collection) -> Result<Vec<StoredDocument>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE collection = ?1 ORDER BY id ASC"
        ))?;

        let rows = stmt
            .query_map([collection.as_str()], document_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|row| Self::to_document(collection, row))
            .collect()
    }

    /// Delete a document.
    ///
    /// Returns `true` if a document was deleted, `false` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_document(&self, collection: Collection, id: &str) -> Result<bool> {
        let affected = self.conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection.as_str(), id],
        )?;
        if affected > 0 {
            info!("Deleted {}/{}", collection, id);
        }
        Ok(affected > 0)
    }

    /// Count the documents in a collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self, collection: Collection) -> Result<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            [collection.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Validate and write a typed record. Performs exactly one write.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails (nothing is written) or the
    /// database operation fails.
    pub fn save<R: Record>(&self, record: &R) -> Result<DateTime<Utc>> {
        record.validate()?;
        let body = serde_json::to_value(record)?;
        self.put_document(R::COLLECTION, &record.id(), &body)
    }

    /// Load a typed record.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored document does not decode as `R` or
    /// the database operation fails.
    pub fn load<R: Record>(&self, id: &str) -> Result<Option<R>> {
        self.get_document(R::COLLECTION, id)?
            .map(|doc| serde_json::from_value(doc.body).map_err(Error::from))
            .transpose()
    }

    /// Load every record of a type, ordered by id.
    ///
    /// Documents that do not decode as `R` are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn load_all<R: Record>(&self) -> Result<Vec<R>> {
        let records = self
            .list_documents(R::COLLECTION)?
            .into_iter()
            .filter_map(|doc| match serde_json::from_value(doc.body) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping malformed {}/{}: {}", doc.collection, doc.id, e);
                    None
                }
            })
            .collect();
        Ok(records)
    }

    /// Delete a typed record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn remove<R: Record>(&self, id: &str) -> Result<bool> {
        self.delete_document(R::COLLECTION, id)
    }

    /// Decode `body` as the record type of `collection`, bind it to `id`,
    /// validate it and save it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDocument`] if the body does not decode, names
    /// a different id, or fails validation. Nothing is written in that case.
    pub fn save_json(
        &self,
        collection: Collection,
        id: &str,
        body: Value,
    ) -> Result<DateTime<Utc>> {
        match collection {
            Collection::Pages => self.save_decoded::<PageContent>(id, body),
            Collection::Programs => self.save_decoded::<TrainingProgram>(id, body),
            Collection::Events => self.save_decoded::<CalendarEvent>(id, body),
            Collection::Photos => self.save_decoded::<GalleryPhoto>(id, body),
            Collection::Settings => self.save_decoded::<SiteSettings>(id, body),
            Collection::Analytics => self.save_decoded::<DailyStats>(id, body),
        }
    }

    fn save_decoded<R: Record>(&self, id: &str, body: Value) -> Result<DateTime<Utc>> {
        let mut record: R = serde_json::from_value(body)
            .map_err(|e| Error::invalid(format!("{}: {e}", R::COLLECTION)))?;
        record.bind_id(id)?;
        self.save(&record)
    }

    /// Count a page view against the counters for `date`, keeping at most
    /// `max_paths` distinct paths for the day.
    ///
    /// The read-modify-write runs in one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn record_visit(
        &self,
        date: NaiveDate,
        visit: &Visit,
        max_paths: usize,
    ) -> Result<DailyStats> {
        let tx = self.conn.unchecked_transaction()?;

        let id = date_key(date);
        let mut stats = match self.load::<DailyStats>(&id) {
            Ok(Some(stats)) => stats,
            Ok(None) => DailyStats::new(date),
            Err(Error::Json(e)) => {
                warn!("Resetting malformed counters for {}: {}", id, e);
                DailyStats::new(date)
            }
            Err(e) => return Err(e),
        };
        stats.apply(visit, max_paths);
        self.save(&stats)?;

        tx.commit()?;
        Ok(stats)
    }

    /// Daily counters between two dates (inclusive), ordered by date.
    ///
    /// An open bound means unbounded on that side.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn daily_stats(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<DailyStats>> {
        let from = from.map_or_else(|| "0000-00-00".to_string(), date_key);
        let to = to.map_or_else(|| "9999-99-99".to_string(), date_key);

        let mut stmt = self.conn.prepare(
            r"
            SELECT id, body FROM documents
            WHERE collection = ?1 AND id >= ?2 AND id <= ?3
            ORDER BY id ASC
            ",
        )?;

        let rows = stmt
            .query_map(params![Collection::Analytics.as_str(), from, to], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?
            .collect::<std::result::Result<Vec<(String, String)>, _>>()?;

        let stats = rows
            .into_iter()
            .filter_map(|(id, body)| match serde_json::from_str(&body) {
                Ok(stats) => Some(stats),
                Err(e) => {
                    warn!("Skipping malformed analytics/{}: {}", id, e);
                    None
                }
            })
            .collect();
        Ok(stats)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let collections = Collection::ALL
            .into_iter()
            .map(|collection| {
                Ok(CollectionCount {
                    collection,
                    documents: self.count(collection)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let total_documents = collections.iter().map(|c| c.documents).sum();

        let newest: Option<String> = self
            .conn
            .query_row(
                "SELECT updated_at FROM documents ORDER BY updated_at DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        let last_updated = newest
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            collections,
            total_documents,
            last_updated,
            db_size_bytes,
        })
    }

    fn to_document(
        collection: Collection,
        (id, body, created_at, updated_at): DocumentRow,
    ) -> Result<StoredDocument> {
        let timestamp = |raw: &str, column: &str| {
            DateTime::parse_from_rfc3339(raw).map_or_else(
                |_| {
                    warn!("Bad {} on {}/{}: {}", column, collection, id, raw);
                    Utc::now()
                },
                |dt| dt.with_timezone(&Utc),
            )
        };

        Ok(StoredDocument {
            collection,
            body: serde_json::from_str(&body)?,
            created_at: timestamp(&created_at, "created_at"),
            updated_at: timestamp(&updated_at, "updated_at"),
            id,
        })
    }
}

/// Document count for one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionCount {
    /// The collection.
    pub collection: Collection,
    /// Number of documents in it.
    pub documents: i64,
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    /// Per-collection document counts.
    pub collections: Vec<CollectionCount>,
    /// Total number of documents stored.
    pub total_documents: i64,
    /// Time of the most recent write.
    pub last_updated: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}
