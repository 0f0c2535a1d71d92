use crate::error::StoreError;
use crate::store::AccountStore;
use async_trait::async_trait;
use aurum_domain::entities::{HolderAccount, HolderId, PoolId, PoolState};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Account store writing one JSON document per holder and per pool.
///
/// Layout: `<root>/holders/<holder>.json` and `<root>/pools/<pool>.json`.
/// Documents are written to a temporary file and renamed into place.
#[derive(Debug, Clone)]
pub struct JsonFileAccountStore {
    root: PathBuf,
}

impl JsonFileAccountStore {
    /// Creates a store under `root`, creating the directories if needed.
    ///
    /// # Errors
    /// Returns an error if the directories cannot be created.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        tokio::fs::create_dir_all(root.join("holders")).await?;
        tokio::fs::create_dir_all(root.join("pools")).await?;
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn holder_path(&self, holder: &HolderId) -> PathBuf {
        self.root
            .join("holders")
            .join(format!("{}.json", file_stem(holder.as_str())))
    }

    fn pool_path(&self, pool: &PoolId) -> PathBuf {
        self.root
            .join("pools")
            .join(format!("{}.json", file_stem(pool.as_str())))
    }
}

/// Maps a key to a file-system safe stem; other bytes are hex-escaped.
fn file_stem(key: &str) -> String {
    let mut stem = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("%{byte:02x}"));
        }
    }
    stem
}

async fn read_document<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| StoreError::Corrupt {
            key: path.display().to_string(),
            source,
        })
}

async fn write_document<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    debug!(path = %path.display(), bytes = bytes.len(), "Document written");
    Ok(())
}

/// Puts `path` back to `previous`, removing it if it did not exist.
async fn restore_document(path: &Path, previous: Option<Vec<u8>>) -> Result<(), StoreError> {
    match previous {
        Some(bytes) => {
            let tmp = path.with_extension("json.tmp");
            tokio::fs::write(&tmp, &bytes).await?;
            tokio::fs::rename(&tmp, path).await?;
        }
        None => match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        },
    }
    Ok(())
}

async fn read_bytes(path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl JsonFileAccountStore {
    /// Writes `documents` in order; on failure the ones already written are
    /// put back to their previous contents.
    async fn write_all(&self, documents: Vec<(PathBuf, Vec<u8>)>) -> Result<(), StoreError> {
        let mut written: Vec<(PathBuf, Option<Vec<u8>>)> = Vec::with_capacity(documents.len());
        for (path, bytes) in documents {
            let previous = match read_bytes(&path).await {
                Ok(previous) => previous,
                Err(e) => {
                    self.roll_back(written).await;
                    return Err(e);
                }
            };
            let tmp = path.with_extension("json.tmp");
            let result = match tokio::fs::write(&tmp, &bytes).await {
                Ok(()) => tokio::fs::rename(&tmp, &path).await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                self.roll_back(written).await;
                return Err(e.into());
            }
            written.push((path, previous));
        }
        Ok(())
    }

    async fn roll_back(&self, written: Vec<(PathBuf, Option<Vec<u8>>)>) {
        for (path, previous) in written.into_iter().rev() {
            if let Err(e) = restore_document(&path, previous).await {
                warn!(path = %path.display(), error = %e, "Failed to restore document");
            }
        }
    }
}

#[async_trait]
impl AccountStore for JsonFileAccountStore {
    async fn load_account(&self, holder: &HolderId) -> Result<Option<HolderAccount>, StoreError> {
        read_document(&self.holder_path(holder)).await
    }

    async fn save_account(&self, account: &HolderAccount) -> Result<(), StoreError> {
        write_document(&self.holder_path(&account.holder), account).await
    }

    async fn load_pool(&self, pool: &PoolId) -> Result<Option<PoolState>, StoreError> {
        read_document(&self.pool_path(pool)).await
    }

    async fn save_pool(&self, state: &PoolState) -> Result<(), StoreError> {
        write_document(&self.pool_path(&state.pool), state).await
    }

    async fn save_batch(&self, accounts: &[HolderAccount], pools: &[PoolState]) -> Result<(), StoreError> {
        let mut documents = Vec::with_capacity(accounts.len() + pools.len());
        for account in accounts {
            documents.push((self.holder_path(&account.holder), serde_json::to_vec_pretty(account)?));
        }
        for state in pools {
            documents.push((self.pool_path(&state.pool), serde_json::to_vec_pretty(state)?));
        }
        let count = documents.len();
        self.write_all(documents).await?;
        debug!(documents = count, "Batch written");
        Ok(())
    }
}
