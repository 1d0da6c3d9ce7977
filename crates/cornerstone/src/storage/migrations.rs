//! Schema versioning.
//!
//! The base tables come from [`BASE_SCHEMA`]. Each later version is a
//! list of statements applied in its own transaction, after which the
//! version stored in `metadata` is bumped.

use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::error::{Error, Result};

use super::schema::BASE_SCHEMA;

/// Version a fully migrated database reports.
pub const CURRENT_VERSION: u32 = 2;

const VERSION_KEY: &str = "schema_version";

/// Statements that bring a database from `version - 1` to `version`.
struct Migration {
    version: u32,
    description: &'static str,
    statements: &'static [&'static str],
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "base document tables",
        statements: &[],
    },
    Migration {
        version: 2,
        description: "track document creation time",
        statements: &[
            "ALTER TABLE documents ADD COLUMN created_at TEXT",
            "UPDATE documents SET created_at = updated_at WHERE created_at IS NULL",
        ],
    },
];

/// Create the base tables and apply pending migrations.
///
/// # Errors
///
/// Returns an error if a statement fails or the stored version is unreadable
/// or newer than this build understands.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(BASE_SCHEMA)?;

    let stored = schema_version(conn)?;
    if stored > CURRENT_VERSION {
        return Err(Error::DatabaseMigration {
            message: format!(
                "database schema version {stored} is newer than supported version {CURRENT_VERSION}"
            ),
        });
    }

    for migration in MIGRATIONS.iter().filter(|m| m.version > stored) {
        apply(conn, migration)?;
    }
    Ok(())
}

/// Version recorded in `metadata`; 0 for a fresh database.
///
/// # Errors
///
/// Returns an error if the query fails or the stored value is not a number.
pub fn schema_version(conn: &Connection) -> Result<u32> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = ?1",
            [VERSION_KEY],
            |row| row.get(0),
        )
        .optional()?;

    value.map_or(Ok(0), |v| {
        v.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("unreadable schema version {v:?}"),
        })
    })
}

fn apply(conn: &Connection, migration: &Migration) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    for statement in migration.statements {
        tx.execute(statement, []).map_err(|e| Error::DatabaseMigration {
            message: format!("v{} ({}): {e}", migration.version, migration.description),
        })?;
    }
    tx.execute(
        "INSERT INTO metadata (key, value) VALUES (?1, ?2)
         ON CONFLICT (key) DO UPDATE SET value = excluded.value",
        (VERSION_KEY, migration.version.to_string()),
    )?;
    tx.commit()?;

    info!(
        "Applied schema v{}: {}",
        migration.version, migration.description
    );
    Ok(())
}
