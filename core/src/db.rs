use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::Local;
use rusqlite::{Connection, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

const BACKUP_SUFFIX: &str = "_backup";
const TIMESTAMP_SUFFIX: &str = "_timestamp";
const HEALTH_CHECK_KEY: &str = "storage_test";
const DEVICE_ID_KEY: &str = "deviceId";

/// Local device storage: a string key/value table with backup keys.
pub struct Database {
    conn: Connection,
}

/// Where a collection was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadSource {
    Primary,
    Backup,
    Missing,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS storage (
                    key TEXT PRIMARY KEY NOT NULL,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    // --- Raw key/value access ---

    pub fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let now = Local::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO storage (key, value, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, now],
            )
            .with_context(|| format!("Failed to write storage key '{key}'"))?;
        Ok(())
    }

    pub fn get_item(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM storage WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;
        if let Some(row) = rows.next()? {
            Ok(Some(row.get(0)?))
        } else {
            Ok(None)
        }
    }

    pub fn remove_item(&self, key: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM storage WHERE key = ?1", params![key])?;
        Ok(rows > 0)
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT key FROM storage ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }

    // --- Collections with backup redundancy ---

    /// Write `key`, `key_backup` and `key_timestamp` in one transaction.
    pub fn save_collection<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let data = serde_json::to_string(value)
            .with_context(|| format!("Failed to serialize '{key}'"))?;
        let now = Local::now().to_rfc3339();

        let tx = self.conn.unchecked_transaction()?;
        self.set_item(key, &data)?;
        self.set_item(&format!("{key}{BACKUP_SUFFIX}"), &data)?;
        self.set_item(&format!("{key}{TIMESTAMP_SUFFIX}"), &now)?;
        tx.commit()
            .with_context(|| format!("Failed to save '{key}'"))?;

        tracing::debug!(key, bytes = data.len(), "collection saved");
        Ok(())
    }

    /// Read a collection, falling back to its backup copy when the primary
    /// is missing, `null` or corrupt.
    pub fn load_collection<T: DeserializeOwned + Default>(
        &self,
        key: &str,
    ) -> Result<(T, LoadSource)> {
        let backup_key = format!("{key}{BACKUP_SUFFIX}");

        match self.get_item(key)? {
            Some(raw) if raw != "null" => match serde_json::from_str(&raw) {
                Ok(value) => {
                    tracing::debug!(key, "collection loaded");
                    return Ok((value, LoadSource::Primary));
                }
                Err(e) => {
                    tracing::warn!(key, error = %e, "primary copy corrupt, trying backup");
                }
            },
            _ => {}
        }

        match self.get_item(&backup_key)? {
            Some(raw) if raw != "null" => match serde_json::from_str(&raw) {
                Ok(value) => {
                    tracing::warn!(key, "collection recovered from backup");
                    Ok((value, LoadSource::Backup))
                }
                Err(e) => {
                    tracing::error!(key, error = %e, "backup copy also corrupt, starting empty");
                    Ok((T::default(), LoadSource::Missing))
                }
            },
            _ => Ok((T::default(), LoadSource::Missing)),
        }
    }

    pub fn has_collection(&self, key: &str) -> Result<bool> {
        Ok(self.get_item(key)?.is_some()
            || self.get_item(&format!("{key}{BACKUP_SUFFIX}"))?.is_some())
    }

    pub fn collection_timestamp(&self, key: &str) -> Result<Option<String>> {
        self.get_item(&format!("{key}{TIMESTAMP_SUFFIX}"))
    }

    pub fn remove_collection(&self, key: &str) -> Result<()> {
        for k in [
            key.to_string(),
            format!("{key}{BACKUP_SUFFIX}"),
            format!("{key}{TIMESTAMP_SUFFIX}"),
        ] {
            self.remove_item(&k)?;
        }
        Ok(())
    }

    // --- Health / identity ---

    /// Write, read back and remove a sentinel value.
    pub fn check_health(&self) -> Result<()> {
        let sentinel = "test";
        self.set_item(HEALTH_CHECK_KEY, sentinel)?;
        let read = self.get_item(HEALTH_CHECK_KEY)?;
        self.remove_item(HEALTH_CHECK_KEY)?;
        if read.as_deref() != Some(sentinel) {
            bail!("Storage read/write mismatch");
        }
        Ok(())
    }

    pub fn get_or_create_device_id(&self) -> Result<String> {
        if let Some(id) = self.get_item(DEVICE_ID_KEY)? {
            return Ok(id);
        }
        let id = Uuid::new_v4().to_string();
        self.set_item(DEVICE_ID_KEY, &id)?;
        Ok(id)
    }
}
