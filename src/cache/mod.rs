//! Whole-structure snapshot cache.
//!
//! Each blob is a JSON envelope carrying a format version and a kind tag so
//! an incompatible file is reported instead of being half-read.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{Result, SyncError};
use crate::zoom::{RecordingIndex, User};

pub const CACHE_FORMAT_VERSION: u32 = 1;
pub const USERS_CACHE_KEY: &str = "users_list_cache.json";
pub const RECORDINGS_CACHE_KEY: &str = "recordings_index_cache.json";

/// Structures that can be stored in the blob cache.
pub trait Cacheable: Serialize + DeserializeOwned {
    /// Tag written into the envelope and checked on load.
    const KIND: &'static str;
}

impl Cacheable for Vec<User> {
    const KIND: &'static str = "users";
}

impl Cacheable for RecordingIndex {
    const KIND: &'static str = "recording_index";
}

#[derive(Debug, Serialize)]
struct EnvelopeOut<'a, T> {
    format_version: u32,
    kind: &'a str,
    created_at: String,
    data: &'a T,
}

#[derive(Debug, Deserialize)]
struct EnvelopeIn {
    format_version: u32,
    kind: String,
    #[serde(default)]
    created_at: Option<String>,
    data: Value,
}

/// Metadata about a stored blob, without its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntryInfo {
    pub path: PathBuf,
    pub kind: String,
    pub created_at: Option<String>,
}

pub struct BlobCache {
    dir: PathBuf,
}

impl BlobCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    /// Serialize `data` under `key`, replacing any previous blob.
    pub fn store<T: Cacheable>(&self, key: &str, data: &T) -> Result<()> {
        let path = self.path_for(key);
        std::fs::create_dir_all(&self.dir)?;

        let envelope = EnvelopeOut {
            format_version: CACHE_FORMAT_VERSION,
            kind: T::KIND,
            created_at: Utc::now().to_rfc3339(),
            data,
        };
        let bytes = serde_json::to_vec_pretty(&envelope).map_err(|err| SyncError::CacheCorrupt {
            path: path.clone(),
            message: format!("failed to serialize: {err}"),
        })?;

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|err| SyncError::Io(err.error))?;

        info!("Cached {} to {}", T::KIND, path.display());
        Ok(())
    }

    /// Load the blob under `key`, or `None` when no such file exists.
    pub fn load<T: Cacheable>(&self, key: &str) -> Result<Option<T>> {
        let path = self.path_for(key);
        let Some(envelope) = self.read_envelope(&path)? else {
            debug!("No cache at {}", path.display());
            return Ok(None);
        };

        if envelope.kind != T::KIND {
            return Err(corrupt(
                &path,
                format!("expected {} data, found {}", T::KIND, envelope.kind),
            ));
        }

        let data = serde_json::from_value(envelope.data)
            .map_err(|err| corrupt(&path, format!("unexpected {} layout: {err}", T::KIND)))?;

        info!("Loaded cached {} from {}", T::KIND, path.display());
        Ok(Some(data))
    }

    /// Describe the blob under `key` without decoding its payload.
    pub fn inspect(&self, key: &str) -> Result<Option<CacheEntryInfo>> {
        let path = self.path_for(key);
        Ok(self.read_envelope(&path)?.map(|envelope| CacheEntryInfo {
            path,
            kind: envelope.kind,
            created_at: envelope.created_at,
        }))
    }

    /// Delete the blob under `key`. Returns whether a file was removed.
    pub fn remove(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!("Removed cache {}", path.display());
                Ok(true)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn read_envelope(&self, path: &Path) -> Result<Option<EnvelopeIn>> {
        let content = match std::fs::read(path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let envelope: EnvelopeIn = serde_json::from_slice(&content)
            .map_err(|err| corrupt(path, format!("not a cache envelope: {err}")))?;

        if envelope.format_version != CACHE_FORMAT_VERSION {
            return Err(corrupt(
                path,
                format!(
                    "format version {} is not supported (expected {})",
                    envelope.format_version, CACHE_FORMAT_VERSION
                ),
            ));
        }

        Ok(Some(envelope))
    }
}

fn corrupt(path: &Path, message: String) -> SyncError {
    SyncError::CacheCorrupt {
        path: path.to_path_buf(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zoom::{Recording, RecordingFile};
    use serde_json::{json, Map};
    use tempfile::TempDir;

    fn sample_users() -> Vec<User> {
        vec![
            serde_json::from_value(json!({"id": "u1", "email": "a@example.com", "dept": "eng"}))
                .unwrap(),
            serde_json::from_value(json!({"id": "u2", "email": "b@example.com"})).unwrap(),
        ]
    }

    fn sample_index() -> RecordingIndex {
        let mut index = RecordingIndex::new();
        index.extend(
            "u1",
            vec![Recording {
                topic: "Weekly".to_string(),
                recording_files: vec![RecordingFile {
                    id: "f1".to_string(),
                    recording_type: "shared_screen_with_speaker_view".to_string(),
                    download_url: "https://zoom.us/rec/download/f1".to_string(),
                    extra: Map::new(),
                }],
                extra: Map::new(),
            }],
        );
        index.extend("u2", Vec::new());
        index
    }

    #[test]
    fn test_round_trip_users() {
        let dir = TempDir::new().unwrap();
        let cache = BlobCache::new(dir.path());

        cache.store(USERS_CACHE_KEY, &sample_users()).unwrap();
        let loaded: Vec<User> = cache.load(USERS_CACHE_KEY).unwrap().unwrap();
        assert_eq!(loaded, sample_users());
    }

    #[test]
    fn test_round_trip_index_preserves_order() {
        let dir = TempDir::new().unwrap();
        let cache = BlobCache::new(dir.path());

        cache.store(RECORDINGS_CACHE_KEY, &sample_index()).unwrap();
        let loaded: RecordingIndex = cache.load(RECORDINGS_CACHE_KEY).unwrap().unwrap();
        assert_eq!(loaded, sample_index());
        assert_eq!(loaded.users[0].user_id, "u1");
    }

    #[test]
    fn test_missing_key_is_none() {
        let dir = TempDir::new().unwrap();
        let cache = BlobCache::new(dir.path());
        let loaded: Option<Vec<User>> = cache.load("nope.json").unwrap();
        assert!(loaded.is_none());
        assert!(cache.inspect("nope.json").unwrap().is_none());
    }

    #[test]
    fn test_store_overwrites() {
        let dir = TempDir::new().unwrap();
        let cache = BlobCache::new(dir.path());

        cache.store(USERS_CACHE_KEY, &sample_users()).unwrap();
        cache.store(USERS_CACHE_KEY, &Vec::<User>::new()).unwrap();
        let loaded: Vec<User> = cache.load(USERS_CACHE_KEY).unwrap().unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_wrong_kind_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let cache = BlobCache::new(dir.path());

        cache.store(USERS_CACHE_KEY, &sample_users()).unwrap();
        let err = cache.load::<RecordingIndex>(USERS_CACHE_KEY).unwrap_err();
        assert!(matches!(err, SyncError::CacheCorrupt { .. }));
    }

    #[test]
    fn test_unknown_version_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let cache = BlobCache::new(dir.path());
        std::fs::write(
            cache.path_for(USERS_CACHE_KEY),
            json!({"format_version": 99, "kind": "users", "data": []}).to_string(),
        )
        .unwrap();

        let err = cache.load::<Vec<User>>(USERS_CACHE_KEY).unwrap_err();
        assert!(matches!(err, SyncError::CacheCorrupt { .. }));
    }

    #[test]
    fn test_foreign_bytes_are_corrupt() {
        let dir = TempDir::new().unwrap();
        let cache = BlobCache::new(dir.path());
        std::fs::write(cache.path_for(USERS_CACHE_KEY), b"\x80\x04\x95 pickle").unwrap();

        let err = cache.load::<Vec<User>>(USERS_CACHE_KEY).unwrap_err();
        assert!(matches!(err, SyncError::CacheCorrupt { .. }));
    }

    #[test]
    fn test_remove() {
        let dir = TempDir::new().unwrap();
        let cache = BlobCache::new(dir.path());
        cache.store(USERS_CACHE_KEY, &sample_users()).unwrap();

        let info = cache.inspect(USERS_CACHE_KEY).unwrap().unwrap();
        assert_eq!(info.kind, "users");
        assert!(info.created_at.is_some());

        assert!(cache.remove(USERS_CACHE_KEY).unwrap());
        assert!(!cache.remove(USERS_CACHE_KEY).unwrap());
    }
}
