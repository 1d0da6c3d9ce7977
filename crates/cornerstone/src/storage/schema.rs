//! Base tables.
//!
//! Columns added after the first release live in
//! [`migrations`](super::migrations), not here, so that an old database and
//! a fresh one converge through the same steps.

/// Base schema, executed as one batch on every open.
///
/// `documents` holds one row per document with the full JSON body.
/// `metadata` is a key-value table; it records the schema version.
pub const BASE_SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    body TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (collection, id)
);

CREATE INDEX IF NOT EXISTS idx_documents_updated
    ON documents(collection, updated_at DESC);

CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";
