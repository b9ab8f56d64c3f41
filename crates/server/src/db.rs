use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key {0:?} not found in database")]
    NotFound(String),

    #[error("error parsing value {value:?} of key {key:?}: {reason}")]
    Parse {
        key: String,
        value: String,
        reason: String,
    },

    #[error("database file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database file is not valid json: {0}")]
    Json(#[from] serde_json::Error),
}

/// String key-value store kept in memory and mirrored to a JSON file.
///
/// Every write rewrites the whole file while holding the write lock, so the
/// file always matches the map.
#[derive(Debug)]
pub struct Database {
    path: PathBuf,
    data: RwLock<BTreeMap<String, String>>,
}

impl Database {
    /// Opens (or creates) the file and fills in any missing defaults.
    pub async fn open(path: impl AsRef<Path>, defaults: &[(&str, &str)]) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let mut data: BTreeMap<String, String> = match tokio::fs::read_to_string(&path).await {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        for (key, value) in defaults {
            data.entry(key.to_string()).or_insert_with(|| value.to_string());
        }

        write_file(&path, &data).await?;

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn get_str(&self, key: &str) -> Result<String, StoreError> {
        self.data
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    pub async fn get_int(&self, key: &str) -> Result<i32, StoreError> {
        let value = self.get_str(key).await?;
        value.parse().map_err(|e: std::num::ParseIntError| StoreError::Parse {
            key: key.to_string(),
            value,
            reason: e.to_string(),
        })
    }

    pub async fn get_float(&self, key: &str) -> Result<f64, StoreError> {
        let value = self.get_str(key).await?;
        value.parse().map_err(|e: std::num::ParseFloatError| StoreError::Parse {
            key: key.to_string(),
            value,
            reason: e.to_string(),
        })
    }

    pub async fn set(&self, key: &str, value: impl Into<String>) -> Result<(), StoreError> {
        self.set_many(vec![(key.to_string(), value.into())]).await
    }

    /// Writes several keys with a single file rewrite. On a write failure the
    /// in-memory map is left untouched.
    pub async fn set_many(&self, entries: Vec<(String, String)>) -> Result<(), StoreError> {
        let mut data = self.data.write().await;
        let mut next = data.clone();
        next.extend(entries);
        write_file(&self.path, &next).await?;
        *data = next;
        Ok(())
    }
}

async fn write_file(path: &Path, data: &BTreeMap<String, String>) -> Result<(), StoreError> {
    let mut contents = serde_json::to_vec(data)?;
    contents.push(b'\n');
    tokio::fs::write(path, contents).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DEFAULTS: &[(&str, &str)] = &[("mode", "OFF"), ("fanSpeed", "0")];

    #[tokio::test]
    async fn test_open_creates_file_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.json");

        let db = Database::open(&path, DEFAULTS).await.unwrap();
        assert_eq!(db.get_str("mode").await.unwrap(), "OFF");
        assert_eq!(db.get_int("fanSpeed").await.unwrap(), 0);

        let on_disk: BTreeMap<String, String> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk.get("mode").map(String::as_str), Some("OFF"));
    }

    #[tokio::test]
    async fn test_open_keeps_existing_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(&path, r#"{"mode":"HEAT","extra":"1"}"#).unwrap();

        let db = Database::open(&path, DEFAULTS).await.unwrap();
        assert_eq!(db.get_str("mode").await.unwrap(), "HEAT");
        assert_eq!(db.get_str("extra").await.unwrap(), "1");
        assert_eq!(db.get_int("fanSpeed").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_open_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(&path, "").unwrap();

        let db = Database::open(&path, DEFAULTS).await.unwrap();
        assert_eq!(db.get_str("mode").await.unwrap(), "OFF");
    }

    #[tokio::test]
    async fn test_open_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = Database::open(&path, DEFAULTS).await.unwrap_err();
        assert!(matches!(err, StoreError::Json(_)));
    }

    #[tokio::test]
    async fn test_set_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.json");

        let db = Database::open(&path, DEFAULTS).await.unwrap();
        db.set("mode", "COOL").await.unwrap();
        db.set_many(vec![
            ("fanSpeed".to_string(), "40".to_string()),
            ("currentTemperature".to_string(), "21.5".to_string()),
        ])
        .await
        .unwrap();
        drop(db);

        let db = Database::open(&path, DEFAULTS).await.unwrap();
        assert_eq!(db.get_str("mode").await.unwrap(), "COOL");
        assert_eq!(db.get_int("fanSpeed").await.unwrap(), 40);
        assert_eq!(db.get_float("currentTemperature").await.unwrap(), 21.5);
    }

    #[tokio::test]
    async fn test_missing_and_unparseable() {
        let dir = TempDir::new().unwrap();
        let db = Database::open(dir.path().join("db.json"), DEFAULTS).await.unwrap();

        assert!(matches!(db.get_str("nope").await, Err(StoreError::NotFound(k)) if k == "nope"));
        assert!(matches!(db.get_int("mode").await, Err(StoreError::Parse { .. })));
        assert!(matches!(db.get_float("mode").await, Err(StoreError::Parse { .. })));
    }
}
