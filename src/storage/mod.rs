//! Durable client storage
//!
//! Holds the bearer token, the optional refresh token, and the persisted
//! `{user, isAuthenticated}` session snapshot. Access is synchronous: both
//! the HTTP client and the auth store read and write it, and every read
//! sees the latest write.
//!
//! Two backends are provided:
//!
//! - [`FileStorage`] - a JSON key/value file that survives restarts
//! - [`MemoryStorage`] - process-local, used by tests and embedders

use crate::types::{AppError, Result, SessionSnapshot};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Key of the bearer access token.
pub const ACCESS_TOKEN_KEY: &str = "auth_token";
/// Key of the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
/// Key of the serialized [`SessionSnapshot`].
pub const SESSION_SNAPSHOT_KEY: &str = "auth-storage";

/// Key/value storage that outlives a single process run
pub trait SessionStorage: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a value; deleting a missing key is not an error
    fn remove(&self, key: &str) -> Result<()>;

    fn access_token(&self) -> Option<String> {
        self.get(ACCESS_TOKEN_KEY).filter(|t| !t.is_empty())
    }

    fn refresh_token(&self) -> Option<String> {
        self.get(REFRESH_TOKEN_KEY).filter(|t| !t.is_empty())
    }

    /// Persist the access token and, when present, the refresh token
    fn store_tokens(&self, access_token: &str, refresh_token: Option<&str>) -> Result<()> {
        self.set(ACCESS_TOKEN_KEY, access_token)?;
        if let Some(refresh) = refresh_token {
            self.set(REFRESH_TOKEN_KEY, refresh)?;
        }
        Ok(())
    }

    fn clear_access_token(&self) -> Result<()> {
        self.remove(ACCESS_TOKEN_KEY)
    }

    /// Read the session snapshot; an unreadable snapshot counts as absent
    fn session_snapshot(&self) -> Option<SessionSnapshot> {
        let raw = self.get(SESSION_SNAPSHOT_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("Discarding unreadable session snapshot: {}", e);
                None
            }
        }
    }

    fn store_session_snapshot(&self, snapshot: &SessionSnapshot) -> Result<()> {
        let raw = serde_json::to_string(snapshot)?;
        self.set(SESSION_SNAPSHOT_KEY, &raw)
    }

    /// Remove tokens and snapshot
    fn clear_session(&self) -> Result<()> {
        self.remove(ACCESS_TOKEN_KEY)?;
        self.remove(REFRESH_TOKEN_KEY)?;
        self.remove(SESSION_SNAPSHOT_KEY)
    }
}

// ============================================================================
// In-memory storage
// ============================================================================

/// Process-local storage
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: RwLock<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values.write().remove(key);
        Ok(())
    }
}

// ============================================================================
// File storage
// ============================================================================

/// JSON file storage with an in-memory mirror.
///
/// Writes go through to disk immediately; the file is created on first write.
/// Each write lands in a temp file next to the target and is renamed over
/// it, so readers never see a partial file. On Unix the file is `0600`.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    values: RwLock<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open (or lazily create) the storage file at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw).map_err(|e| {
                    AppError::Storage(format!("{} is not valid session storage: {}", path.display(), e))
                })?
            }
        } else {
            BTreeMap::new()
        };
        debug!("Opened session storage at {}", path.display());
        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, values: &BTreeMap<String, String>) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let raw = serde_json::to_string_pretty(values)?;
        let mut staged = tempfile::NamedTempFile::new_in(dir)?;
        staged.write_all(raw.as_bytes())?;
        restrict_permissions(staged.as_file())?;
        staged.as_file().sync_all()?;
        staged
            .persist(&self.path)
            .map_err(|e| AppError::Storage(format!("failed to replace {}: {}", self.path.display(), e)))?;
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(file: &fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &fs::File) -> std::io::Result<()> {
    Ok(())
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.write();
        values.insert(key.to_string(), value.to_string());
        self.flush(&values)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.values.write();
        if values.remove(key).is_some() {
            self.flush(&values)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::User;

    fn sample_user() -> User {
        User {
            id: 1,
            email: "qa@example.com".to_string(),
            name: Some("QA Lead".to_string()),
            is_verified: true,
            created_at: None,
        }
    }

    #[test]
    fn test_memory_storage_tokens() {
        let storage = MemoryStorage::new();
        assert!(storage.access_token().is_none());

        storage.store_tokens("abc", Some("def")).unwrap();
        assert_eq!(storage.access_token().as_deref(), Some("abc"));
        assert_eq!(storage.refresh_token().as_deref(), Some("def"));

        storage.clear_access_token().unwrap();
        assert!(storage.access_token().is_none());
        assert_eq!(storage.refresh_token().as_deref(), Some("def"));
    }

    #[test]
    fn test_empty_token_counts_as_absent() {
        let storage = MemoryStorage::new();
        storage.set(ACCESS_TOKEN_KEY, "").unwrap();
        assert!(storage.access_token().is_none());
    }

    #[test]
    fn test_snapshot_roundtrip_and_clear() {
        let storage = MemoryStorage::new();
        let snapshot = SessionSnapshot {
            user: Some(sample_user()),
            is_authenticated: true,
        };
        storage.store_session_snapshot(&snapshot).unwrap();
        assert_eq!(storage.session_snapshot(), Some(snapshot));

        storage.store_tokens("abc", None).unwrap();
        storage.clear_session().unwrap();
        assert!(storage.session_snapshot().is_none());
        assert!(storage.access_token().is_none());
    }

    #[test]
    fn test_corrupt_snapshot_is_ignored() {
        let storage = MemoryStorage::new();
        storage.set(SESSION_SNAPSHOT_KEY, "{not json").unwrap();
        assert!(storage.session_snapshot().is_none());
    }

    #[test]
    fn test_file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        {
            let storage = FileStorage::open(&path).unwrap();
            storage.store_tokens("persisted", Some("refresh")).unwrap();
        }

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.access_token().as_deref(), Some("persisted"));
        assert_eq!(reopened.refresh_token().as_deref(), Some("refresh"));

        reopened.clear_session().unwrap();
        let again = FileStorage::open(&path).unwrap();
        assert!(again.access_token().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_storage_is_private_to_owner() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let storage = FileStorage::open(&path).unwrap();
        storage.store_tokens("secret", Some("refresh")).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_file_storage_leaves_no_staging_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let storage = FileStorage::open(&path).unwrap();
        storage.store_tokens("one", None).unwrap();
        storage.store_tokens("two", None).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"two\""));
    }

    #[test]
    fn test_file_storage_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(matches!(FileStorage::open(&path), Err(AppError::Storage(_))));
    }
}
