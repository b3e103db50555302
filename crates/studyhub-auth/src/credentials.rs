//! Credential storage for the session token pair
//!
//! The store owns the current access/refresh token pair. The client only
//! ever reads the pair and requests updates; it never mutates storage
//! directly. `CredentialStore` is a trait so host applications can plug in
//! their own persistence (keychain, database); two implementations ship
//! here: a JSON file store and an in-memory store.
//!
//! All file writes use atomic temp-file + rename to prevent corruption on
//! crash. A tokio Mutex serializes concurrent writes; no guarantees beyond
//! last-write-wins are needed because the client serializes credential
//! updates through its renewal state machine.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use common::Secret;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// The session's credential pair.
///
/// Both tokens are optional: a fresh install has neither, an anonymous
/// session has no access token, and a wiped session has neither again.
/// Tokens are wrapped in [`Secret`] so Debug/log output stays redacted
/// while the pair still serializes to the credential file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    /// Short-lived token attached to individual requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<Secret<String>>,
    /// Longer-lived token used solely to obtain a new access token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<Secret<String>>,
}

impl Credentials {
    /// Build a pair from plain strings.
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(Secret::new(access_token.into())),
            refresh_token: Some(Secret::new(refresh_token.into())),
        }
    }

    /// Whether neither token is present.
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// Storage interface consumed by the client.
///
/// `get` returns the current pair (empty when logged out), `set` replaces
/// it, `clear` wipes it. Methods return boxed futures for dyn-compatibility
/// (`Arc<dyn CredentialStore>`).
pub trait CredentialStore: Send + Sync {
    /// Current credential pair; empty when no session exists.
    fn get(&self) -> Pin<Box<dyn Future<Output = Credentials> + Send + '_>>;

    /// Replace the stored pair.
    fn set(&self, credentials: Credentials) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Wipe the stored pair.
    fn clear(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// JSON-file-backed credential store.
///
/// The file is the source of truth across process restarts; an in-memory
/// copy behind a Mutex backs reads so request-time reads don't touch disk.
pub struct FileCredentialStore {
    path: PathBuf,
    state: Mutex<Credentials>,
}

impl FileCredentialStore {
    /// Load credentials from the given file path.
    ///
    /// If the file doesn't exist, starts with an empty pair and creates the
    /// file so future loads don't need the cold-start path.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading credential file: {e}")))?;
            let credentials: Credentials = serde_json::from_str(&contents)
                .map_err(|e| Error::CredentialParse(format!("parsing credential file: {e}")))?;
            info!(path = %path.display(), "loaded credentials");
            credentials
        } else {
            info!(path = %path.display(), "credential file not found, starting with empty session");
            let credentials = Credentials::default();
            write_atomic(&path, &credentials).await?;
            credentials
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Pin<Box<dyn Future<Output = Credentials> + Send + '_>> {
        Box::pin(async {
            let state = self.state.lock().await;
            state.clone()
        })
    }

    fn set(&self, credentials: Credentials) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            *state = credentials;
            debug!("updated credentials");
            write_atomic(&self.path, &state).await
        })
    }

    fn clear(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async {
            let mut state = self.state.lock().await;
            *state = Credentials::default();
            debug!("cleared credentials");
            write_atomic(&self.path, &state).await
        })
    }
}

/// In-memory credential store for tests and host apps that persist
/// credentials elsewhere.
#[derive(Default)]
pub struct MemoryCredentialStore {
    state: Mutex<Credentials>,
}

impl MemoryCredentialStore {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            state: Mutex::new(credentials),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Pin<Box<dyn Future<Output = Credentials> + Send + '_>> {
        Box::pin(async {
            let state = self.state.lock().await;
            state.clone()
        })
    }

    fn set(&self, credentials: Credentials) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            *state = credentials;
            Ok(())
        })
    }

    fn clear(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async {
            let mut state = self.state.lock().await;
            *state = Credentials::default();
            Ok(())
        })
    }
}

/// Write the credential pair to a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target. File permissions are set to 0600 since the file contains
/// session tokens.
async fn write_atomic(path: &Path, credentials: &Credentials) -> Result<()> {
    let json = serde_json::to_string_pretty(credentials)
        .map_err(|e| Error::CredentialParse(format!("serializing credentials: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("credential path has no parent directory".into()))?;

    let tmp_path = dir.join(format!(".credentials.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp credential file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting credential file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp credential file: {e}")))?;

    debug!(path = %path.display(), "persisted credentials");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expose(credentials: &Credentials) -> (Option<&str>, Option<&str>) {
        (
            credentials.access_token.as_ref().map(|t| t.expose().as_str()),
            credentials.refresh_token.as_ref().map(|t| t.expose().as_str()),
        )
    }

    #[tokio::test]
    async fn roundtrip_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        let store = FileCredentialStore::load(path.clone()).await.unwrap();
        store.set(Credentials::new("at_1", "rt_1")).await.unwrap();

        let store2 = FileCredentialStore::load(path).await.unwrap();
        let pair = store2.get().await;
        assert_eq!(expose(&pair), (Some("at_1"), Some("rt_1")));
    }

    #[tokio::test]
    async fn cold_start_creates_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        assert!(!path.exists());
        let store = FileCredentialStore::load(path.clone()).await.unwrap();
        assert!(store.get().await.is_empty());
        assert!(path.exists());

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let parsed: Credentials = serde_json::from_str(&contents).unwrap();
        assert!(parsed.is_empty());
    }

    #[tokio::test]
    async fn clear_wipes_both_tokens_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        let store = FileCredentialStore::load(path.clone()).await.unwrap();
        store.set(Credentials::new("at_1", "rt_1")).await.unwrap();
        store.clear().await.unwrap();

        assert!(store.get().await.is_empty());

        let reloaded = FileCredentialStore::load(path).await.unwrap();
        assert!(reloaded.get().await.is_empty());
    }

    #[tokio::test]
    async fn partial_pair_survives_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        // Access token only: the anonymous-refresh edge, still valid state
        let store = FileCredentialStore::load(path.clone()).await.unwrap();
        store
            .set(Credentials {
                access_token: Some(Secret::new("at_only".into())),
                refresh_token: None,
            })
            .await
            .unwrap();

        let reloaded = FileCredentialStore::load(path).await.unwrap();
        let pair = reloaded.get().await;
        assert_eq!(expose(&pair), (Some("at_only"), None));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn file_permissions_are_0600() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        let store = FileCredentialStore::load(path.clone()).await.unwrap();
        store.set(Credentials::new("at_1", "rt_1")).await.unwrap();

        let metadata = tokio::fs::metadata(&path).await.unwrap();
        let mode = metadata.permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "credential file must be 0600, got {mode:o}");
    }

    #[tokio::test]
    async fn concurrent_sets_leave_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let store = std::sync::Arc::new(FileCredentialStore::load(path.clone()).await.unwrap());

        let mut handles = vec![];
        for i in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .set(Credentials::new(format!("at_{i}"), format!("rt_{i}")))
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        // Last write wins; the file must still parse
        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let parsed: Credentials = serde_json::from_str(&contents).unwrap();
        assert!(!parsed.is_empty());
    }

    #[tokio::test]
    async fn memory_store_set_get_clear() {
        let store = MemoryCredentialStore::default();
        assert!(store.get().await.is_empty());

        store.set(Credentials::new("at_1", "rt_1")).await.unwrap();
        let pair = store.get().await;
        assert_eq!(expose(&pair), (Some("at_1"), Some("rt_1")));

        store.clear().await.unwrap();
        assert!(store.get().await.is_empty());
    }

    #[test]
    fn debug_output_redacts_tokens() {
        let pair = Credentials::new("at_secret", "rt_secret");
        let debug = format!("{pair:?}");
        assert!(!debug.contains("at_secret"));
        assert!(!debug.contains("rt_secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn absent_tokens_are_omitted_from_json() {
        let json = serde_json::to_string(&Credentials::default()).unwrap();
        assert_eq!(json, "{}");
    }
}
