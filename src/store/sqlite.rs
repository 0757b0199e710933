//! SQLite-backed configuration store.
//!
//! One connection guarded by a mutex. Open it at startup, pass it by
//! reference to whatever needs it, and [`close`](SqliteStore::close) it on
//! shutdown.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension, Row, ToSql, params, params_from_iter};
use tracing::{debug, info};

use super::schema::initialize_schema;
use super::{
    ConfigGateway, ConfigRecord, ConfigUpdate, LogoAsset, NewConfig, StoreError,
    validate_scale_down,
};
use crate::imaging::{LogoConfig, Position};

const SELECT_COLUMNS: &str = "id, user_id, scale_down, logo_position, description, \
     logo_data, logo_mime_type, logo_file_name, is_active, created_at, updated_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<ConfigRecord> {
    let position: String = row.get(3)?;
    let logo_data: Option<Vec<u8>> = row.get(5)?;
    let mime_type: Option<String> = row.get(6)?;
    let file_name: Option<String> = row.get(7)?;

    let logo = logo_data.map(|data| LogoAsset {
        data,
        mime_type: mime_type.unwrap_or_else(|| "image/png".to_string()),
        file_name,
    });

    Ok(ConfigRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        scale_down: row.get(2)?,
        position: Position::from_keyword(&position),
        description: row.get(4)?,
        logo,
        is_active: row.get::<_, i64>(8)? != 0,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn find_active(
    conn: &Connection,
    id: i64,
    identity: &str,
) -> Result<Option<ConfigRecord>, StoreError> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM configurations
         WHERE id = ?1 AND user_id = ?2 AND is_active = 1"
    );
    Ok(conn
        .query_row(&sql, params![id, identity], row_to_record)
        .optional()?)
}

impl SqliteStore {
    /// Open (or create) a database file and apply the schema.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!(journal_mode = %mode, "journal mode set");
        initialize_schema(&conn)?;
        info!(path = %path.display(), "configuration store opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open a private in-memory database. Used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Flush and close the underlying connection.
    pub fn close(self) -> Result<(), StoreError> {
        let conn = self
            .conn
            .into_inner()
            .map_err(|e| StoreError::Lock(e.to_string()))?;
        conn.close().map_err(|(_, e)| StoreError::Database(e))?;
        info!("configuration store closed");
        Ok(())
    }

    fn with_conn<T>(
        &self,
        op: impl FnOnce(&Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))?;
        op(&conn)
    }

    pub fn create(&self, identity: &str, new: NewConfig) -> Result<ConfigRecord, StoreError> {
        validate_scale_down(new.scale_down)?;
        let position = new.position.unwrap_or_default();
        let now = now_millis();

        self.with_conn(|conn| {
            let (data, mime_type, file_name) = match new.logo {
                Some(logo) => (Some(logo.data), Some(logo.mime_type), logo.file_name),
                None => (None, None, None),
            };
            conn.execute(
                "INSERT INTO configurations (
                    user_id, scale_down, logo_position, description,
                    logo_data, logo_mime_type, logo_file_name, created_at, updated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    identity,
                    new.scale_down,
                    position.as_str(),
                    new.description,
                    data,
                    mime_type,
                    file_name,
                    now
                ],
            )?;
            let id = conn.last_insert_rowid();
            debug!(id, identity, "configuration created");

            find_active(conn, id, identity)?.ok_or_else(|| {
                StoreError::Database(rusqlite::Error::QueryReturnedNoRows)
            })
        })
    }

    pub fn get(&self, id: i64, identity: &str) -> Result<Option<ConfigRecord>, StoreError> {
        self.with_conn(|conn| find_active(conn, id, identity))
    }

    /// Active configurations for `identity`, newest first.
    pub fn list(
        &self,
        identity: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ConfigRecord>, StoreError> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {SELECT_COLUMNS} FROM configurations
                 WHERE user_id = ?1 AND is_active = 1
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?2 OFFSET ?3"
            );
            let mut stmt = conn.prepare(&sql)?;
            let records = stmt
                .query_map(params![identity, limit, offset], row_to_record)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(records)
        })
    }

    /// Apply the provided fields. Returns `None` when no active record with
    /// that id belongs to `identity`.
    pub fn update(
        &self,
        id: i64,
        identity: &str,
        update: ConfigUpdate,
    ) -> Result<Option<ConfigRecord>, StoreError> {
        if update.is_empty() {
            return Err(StoreError::Validation("no fields to update".into()));
        }
        validate_scale_down(update.scale_down)?;

        let mut fields: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(scale_down) = update.scale_down {
            fields.push("scale_down = ?");
            values.push(Box::new(scale_down));
        }
        if let Some(position) = update.position {
            fields.push("logo_position = ?");
            values.push(Box::new(position.as_str()));
        }
        if let Some(description) = update.description {
            fields.push("description = ?");
            values.push(Box::new(description));
        }
        if let Some(logo) = update.logo {
            fields.push("logo_data = ?");
            values.push(Box::new(logo.data));
            fields.push("logo_mime_type = ?");
            values.push(Box::new(logo.mime_type));
            fields.push("logo_file_name = ?");
            values.push(Box::new(logo.file_name));
        }
        fields.push("updated_at = ?");
        values.push(Box::new(now_millis()));
        values.push(Box::new(id));
        values.push(Box::new(identity.to_string()));

        let sql = format!(
            "UPDATE configurations SET {} WHERE id = ? AND user_id = ? AND is_active = 1",
            fields.join(", ")
        );

        self.with_conn(|conn| {
            let affected = conn.execute(&sql, params_from_iter(values.iter()))?;
            if affected == 0 {
                return Ok(None);
            }
            debug!(id, identity, "configuration updated");
            find_active(conn, id, identity)
        })
    }

    /// Mark a configuration inactive. Returns whether anything changed.
    pub fn soft_delete(&self, id: i64, identity: &str) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE configurations SET is_active = 0, updated_at = ?1
                 WHERE id = ?2 AND user_id = ?3 AND is_active = 1",
                params![now_millis(), id, identity],
            )?;
            debug!(id, identity, deleted = affected > 0, "configuration soft-deleted");
            Ok(affected > 0)
        })
    }
}

impl ConfigGateway for SqliteStore {
    fn fetch_by_id(&self, id: i64, identity: &str) -> Result<Option<LogoConfig>, StoreError> {
        Ok(self.get(id, identity)?.map(|r| r.to_logo_config()))
    }
}
