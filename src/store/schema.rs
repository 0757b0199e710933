//! Schema creation and versioning for the configuration table.
//!
//! The version lives in `PRAGMA user_version`; `initialize_schema` is safe to
//! run against an existing database.

use rusqlite::Connection;

use super::StoreError;

pub(crate) const SCHEMA_VERSION: i64 = 1;

fn get_user_version(conn: &Connection) -> Result<i64, StoreError> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

fn set_user_version(conn: &Connection, version: i64) -> Result<(), StoreError> {
    conn.execute_batch(&format!("PRAGMA user_version = {version};"))?;
    Ok(())
}

fn create_configurations_table(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS configurations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            scale_down REAL CHECK (scale_down IS NULL OR (scale_down > 0 AND scale_down <= 0.25)),
            logo_position TEXT NOT NULL DEFAULT 'top-left',
            description TEXT,
            logo_data BLOB,
            logo_mime_type TEXT,
            logo_file_name TEXT,
            is_active INTEGER NOT NULL DEFAULT 1 CHECK (is_active IN (0, 1)),
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_configurations_owner
            ON configurations(user_id, is_active, created_at DESC);",
    )?;
    Ok(())
}

pub(crate) fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
    let version = get_user_version(conn)?;
    if version > SCHEMA_VERSION {
        return Err(StoreError::Validation(format!(
            "database schema version {version} is newer than supported version {SCHEMA_VERSION}"
        )));
    }

    create_configurations_table(conn)?;

    if version < SCHEMA_VERSION {
        set_user_version(conn, SCHEMA_VERSION)?;
    }
    Ok(())
}
