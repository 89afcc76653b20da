//! On-disk response bodies, one file per storage name.

use std::path::{Path, PathBuf};

use bytes::Bytes;

use super::INDEX_FILE;
use super::name::{FILE_EXTENSION, StorageName};
use crate::Error;

/// Response body store rooted at the responses directory.
#[derive(Clone, Debug)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the body stored under `name`.
    pub fn path(&self, name: &StorageName) -> PathBuf {
        self.root.join(name.as_str())
    }

    /// Write `body` under `name`, replacing any previous body.
    ///
    /// Creates the responses directory on first use.
    pub async fn put(&self, name: &StorageName, body: &[u8]) -> Result<(), Error> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| Error::StorageWrite { path: self.root.clone(), source })?;

        let path = self.path(name);
        tokio::fs::write(&path, body)
            .await
            .map_err(|source| Error::StorageWrite { path, source })
    }

    /// Read the body stored under `name`.
    ///
    /// A missing file surfaces as [`Error::StorageRead`] with
    /// [`Error::is_not_found`] returning true.
    pub async fn get(&self, name: &StorageName) -> Result<Bytes, Error> {
        let path = self.path(name);
        match tokio::fs::read(&path).await {
            Ok(body) => Ok(Bytes::from(body)),
            Err(source) => Err(Error::StorageRead { path, source }),
        }
    }

    /// Whether a body file exists for `name`.
    pub async fn contains(&self, name: &StorageName) -> bool {
        tokio::fs::try_exists(self.path(name)).await.unwrap_or(false)
    }

    /// Names of all body files present in the responses directory, sorted.
    ///
    /// The index document itself is excluded.
    pub async fn stored_names(&self) -> Result<Vec<StorageName>, Error> {
        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(Error::StorageRead { path: self.root.clone(), source }),
        };

        let mut names = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|source| Error::StorageRead { path: self.root.clone(), source })?
        {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else { continue };
            if file_name == INDEX_FILE || !file_name.ends_with(&format!(".{FILE_EXTENSION}")) {
                continue;
            }
            if let Some(name) = StorageName::parse(file_name) {
                names.push(name);
            }
        }
        names.sort();

        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::QueryKey;

    #[tokio::test]
    async fn test_put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path());
        let name = StorageName::for_key(&QueryKey::raw("?a=1"));

        store.put(&name, b"OK").await.unwrap();

        assert_eq!(store.get(&name).await.unwrap(), Bytes::from_static(b"OK"));
        assert!(store.contains(&name).await);
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path());
        let name = StorageName::for_key(&QueryKey::raw("?a=1"));

        store.put(&name, b"first").await.unwrap();
        store.put(&name, b"second").await.unwrap();

        assert_eq!(store.get(&name).await.unwrap(), Bytes::from_static(b"second"));
    }

    #[tokio::test]
    async fn test_put_creates_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path().join("nested").join("responses"));
        let name = StorageName::for_key(&QueryKey::raw("?a=1"));

        store.put(&name, b"{}").await.unwrap();

        assert!(store.path(&name).exists());
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path());
        let name = StorageName::for_key(&QueryKey::raw("?missing"));

        let err = store.get(&name).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!store.contains(&name).await);
    }

    #[tokio::test]
    async fn test_path_is_under_root() {
        let store = ContentStore::new("/srv/responses");
        let name = StorageName::for_key(&QueryKey::raw("?a=1"));
        assert_eq!(store.path(&name), PathBuf::from("/srv/responses").join(name.as_str()));
    }

    #[tokio::test]
    async fn test_stored_names_skips_index_and_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path());
        let name = StorageName::for_key(&QueryKey::raw("?a=1"));
        store.put(&name, b"OK").await.unwrap();
        std::fs::write(dir.path().join(INDEX_FILE), "{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hi").unwrap();

        assert_eq!(store.stored_names().await.unwrap(), vec![name]);
    }

    #[tokio::test]
    async fn test_stored_names_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path().join("absent"));
        assert!(store.stored_names().await.unwrap().is_empty());
    }
}
