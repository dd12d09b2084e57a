use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

const TABLENAME: &str = "kvstore";
const KEY_FIELD: &str = "key";
const VALUE_FIELD: &str = "value";

#[derive(Error, Debug)]
pub enum KVStoreError {
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    #[error(transparent)]
    SQLite(#[from] rusqlite::Error),
    #[error("could not (de)serialize value: {0}")]
    Json(#[from] serde_json::Error),
}

/// SQLite-backed key/value store with JSON-encoded values
pub struct KVDb(Connection);

impl KVDb {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, KVStoreError> {
        // Create directory for DB if it doesn't already exist
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let connection = Connection::open(&path)?;
        connection.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS '{TABLENAME}' (
                {KEY_FIELD} TEXT PRIMARY KEY NOT NULL,
                {VALUE_FIELD} BLOB NOT NULL
                )"
            ),
            [],
        )?;
        log::trace!("Opened KV store at {}", path.as_ref().display());

        Ok(KVDb(connection))
    }

    fn select(&self, key: &str) -> Result<Option<Vec<u8>>, KVStoreError> {
        self.0
            .query_row(
                &format!("SELECT {VALUE_FIELD} FROM '{TABLENAME}' WHERE {KEY_FIELD} = ?1"),
                [key],
                |r| r.get::<_, Vec<u8>>(0),
            )
            .optional()
            .map_err(Into::into)
    }

    fn upsert(&self, key: &str, value: &[u8]) -> Result<(), KVStoreError> {
        let mut stmt = self.0.prepare(&format!(
            "INSERT INTO '{TABLENAME}' ({KEY_FIELD}, {VALUE_FIELD}) values (?1, ?2)
            ON CONFLICT({KEY_FIELD}) DO UPDATE SET {VALUE_FIELD}=?2",
        ))?;
        stmt.execute(params![key, value])?;
        Ok(())
    }

    pub fn get<T: DeserializeOwned>(
        &self,
        key: impl AsRef<str>,
    ) -> Result<Option<T>, KVStoreError> {
        self.select(key.as_ref())?
            .map(|v| serde_json::from_slice::<T>(&v))
            .transpose()
            .map_err(Into::into)
    }

    pub fn set<V: Serialize>(&self, key: impl AsRef<str>, value: V) -> Result<(), KVStoreError> {
        log::trace!("Setting key '{}'", key.as_ref());
        self.upsert(key.as_ref(), &serde_json::to_vec(&value)?)
    }
}
