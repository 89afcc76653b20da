//! File-backed response storage.
//!
//! A responses directory holds one index document plus one body file per
//! captured query:
//!
//! ```text
//! responses/
//!   index.json            {"?a=1&b=2": "<hmac-sha256 hex>.json", ...}
//!   <hmac-sha256 hex>.json
//! ```
//!
//! Writing a body, updating the index and saving it are three separate steps.
//! A crash between them can leave a body without an index entry, or an entry
//! pointing at an older body.

pub mod content;
pub mod index;
pub mod json;
pub mod name;
pub mod snapshot;

use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

pub use content::ContentStore;
pub use index::Index;
pub use name::StorageName;
pub use snapshot::ReplaySnapshot;

use crate::Error;
use crate::key::QueryKey;

/// File name of the index document inside the responses directory.
pub const INDEX_FILE: &str = "index.json";

/// A responses directory: content store plus its index document.
#[derive(Debug)]
pub struct ResponsesDir {
    store: ContentStore,
    index_path: PathBuf,
    write_lock: Mutex<()>,
}

impl ResponsesDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let index_path = root.join(INDEX_FILE);
        Self { store: ContentStore::new(root), index_path, write_lock: Mutex::new(()) }
    }

    pub fn root(&self) -> &Path {
        self.store.root()
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub async fn load_index(&self) -> Result<Index, Error> {
        Index::load(&self.index_path).await
    }

    /// Load the index and every body it references.
    ///
    /// Unlike [`ResponsesDir::load_index`], a missing index document is an
    /// error: replaying from a directory that was never captured into would
    /// answer every request with a miss.
    pub async fn load_snapshot(&self) -> Result<ReplaySnapshot, Error> {
        let bytes = tokio::fs::read(&self.index_path)
            .await
            .map_err(|source| Error::StorageRead { path: self.index_path.clone(), source })?;
        let index = Index::from_slice(&self.index_path, &bytes)?;
        ReplaySnapshot::load(&self.store, &index).await
    }

    /// Persist `body` for `key` and point the index at it.
    ///
    /// Recordings within this process are serialized so concurrent captures
    /// never drop each other's index entries. Other processes writing the same
    /// directory are not coordinated with.
    pub async fn record(&self, key: QueryKey, body: &[u8]) -> Result<StorageName, Error> {
        let name = StorageName::for_key(&key);
        let _guard = self.write_lock.lock().await;

        self.store.put(&name, body).await?;

        let mut index = self.load_index().await?;
        if let Some(previous) = index.upsert(key.clone(), name.clone()) {
            tracing::debug!(key = %key, previous = %previous, "replacing existing capture");
        }
        index.save(&self.index_path).await?;

        tracing::info!(key = %key, name = %name, bytes = body.len(), "recorded response");

        Ok(name)
    }
}
