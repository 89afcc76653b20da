//! Persisted mapping from lookup key to storage name.
//!
//! The index document is a single JSON object, written with sorted keys and
//! stable indentation so unchanged mappings produce byte-identical files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::json::to_stable_vec;
use super::name::StorageName;
use crate::Error;
use crate::key::QueryKey;

/// In-memory view of the index document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Index {
    entries: BTreeMap<QueryKey, StorageName>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the index at `path`.
    ///
    /// A missing file yields an empty index (first run). A file that exists
    /// but is not a JSON object of strings fails with [`Error::MalformedIndex`].
    pub async fn load(path: &Path) -> Result<Self, Error> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Self::from_slice(path, &bytes),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no index at {}, starting empty", path.display());
                Ok(Self::new())
            }
            Err(source) => Err(Error::StorageRead { path: path.to_path_buf(), source }),
        }
    }

    /// Parse an index document. `path` is only used for error reporting.
    pub fn from_slice(path: &Path, bytes: &[u8]) -> Result<Self, Error> {
        let malformed = |reason: String| Error::MalformedIndex { path: path.to_path_buf(), reason };

        let raw: BTreeMap<String, String> = serde_json::from_slice(bytes).map_err(|e| malformed(e.to_string()))?;

        let mut entries = BTreeMap::new();
        for (raw_key, name) in raw {
            let name = StorageName::parse(&name)
                .ok_or_else(|| malformed(format!("invalid storage name {name:?} for key {raw_key:?}")))?;
            let key = QueryKey::raw(&raw_key);
            if entries.contains_key(&key) {
                return Err(malformed(format!("keys {raw_key:?} and {:?} collide", key.as_str())));
            }
            entries.insert(key, name);
        }

        Ok(Self { entries })
    }

    /// Render the index document.
    pub fn to_document(&self) -> Result<Vec<u8>, Error> {
        to_stable_vec(&self.entries).map_err(|e| Error::InvalidInput(format!("failed to serialize index: {e}")))
    }

    /// Write the index document to `path`.
    ///
    /// The document is written to a sibling temp file and renamed over `path`,
    /// so a concurrent reader sees either the old or the new document.
    pub async fn save(&self, path: &Path) -> Result<(), Error> {
        let document = self.to_document()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| Error::StorageWrite { path: parent.to_path_buf(), source })?;
        }

        let tmp = temp_path(path);
        tokio::fs::write(&tmp, &document)
            .await
            .map_err(|source| Error::StorageWrite { path: tmp.clone(), source })?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|source| Error::StorageWrite { path: path.to_path_buf(), source })
    }

    /// Insert or replace the storage name for `key`.
    ///
    /// Last write wins; the previous name, if any, is returned.
    pub fn upsert(&mut self, key: QueryKey, name: StorageName) -> Option<StorageName> {
        self.entries.insert(key, name)
    }

    pub fn get(&self, key: &QueryKey) -> Option<&StorageName> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QueryKey, &StorageName)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(query: &str) -> (QueryKey, StorageName) {
        let key = QueryKey::normalized(query);
        let name = StorageName::for_key(&key);
        (key, name)
    }

    #[tokio::test]
    async fn test_load_missing_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let index = Index::load(&dir.path().join("index.json")).await.unwrap();
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn test_load_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = Index::load(&path).await;
        assert!(matches!(result, Err(Error::MalformedIndex { .. })));
    }

    #[tokio::test]
    async fn test_load_rejects_non_string_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        std::fs::write(&path, r#"{"?a=1": 42}"#).unwrap();

        let result = Index::load(&path).await;
        assert!(matches!(result, Err(Error::MalformedIndex { .. })));
    }

    #[test]
    fn test_from_slice_rejects_escaping_names() {
        let result = Index::from_slice(Path::new("index.json"), br#"{"?a=1": "../../etc/passwd"}"#);
        assert!(matches!(result, Err(Error::MalformedIndex { reason, .. }) if reason.contains("invalid storage name")));
    }

    #[test]
    fn test_from_slice_rejects_index_as_storage_name() {
        let result = Index::from_slice(Path::new("index.json"), br#"{"?a=1": "index.json"}"#);
        assert!(matches!(result, Err(Error::MalformedIndex { reason, .. }) if reason.contains("invalid storage name")));
    }

    #[test]
    fn test_from_slice_rejects_keys_differing_only_by_prefix() {
        let result = Index::from_slice(Path::new("index.json"), br#"{"a=1": "x.json", "?a=1": "y.json"}"#);
        assert!(matches!(result, Err(Error::MalformedIndex { reason, .. }) if reason.contains("collide")));
    }

    #[test]
    fn test_from_slice_adds_missing_prefix() {
        let index = Index::from_slice(Path::new("index.json"), br#"{"a=1": "x.json"}"#).unwrap();
        assert_eq!(index.get(&QueryKey::raw("?a=1")).map(StorageName::as_str), Some("x.json"));
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        let mut index = Index::new();
        let (key, name) = entry("?b=2&a=1");
        index.upsert(key.clone(), name.clone());

        index.save(&path).await.unwrap();
        let loaded = Index::load(&path).await.unwrap();

        assert_eq!(loaded, index);
        assert_eq!(loaded.get(&key), Some(&name));
        assert!(!dir.path().join("index.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_save_is_byte_stable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        let mut forward = Index::new();
        let mut backward = Index::new();
        let entries: Vec<_> = ["?z=1", "?a=1", "?m=1&b=2"].iter().map(|q| entry(q)).collect();
        for (k, n) in &entries {
            forward.upsert(k.clone(), n.clone());
        }
        for (k, n) in entries.iter().rev() {
            backward.upsert(k.clone(), n.clone());
        }

        forward.save(&path).await.unwrap();
        let first = std::fs::read(&path).unwrap();
        forward.save(&path).await.unwrap();
        let second = std::fs::read(&path).unwrap();
        backward.save(&path).await.unwrap();
        let third = std::fs::read(&path).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, third);
    }

    #[test]
    fn test_document_format() {
        let mut index = Index::new();
        let (key, name) = entry("?b=2&a=1");
        index.upsert(key, name.clone());

        let doc = String::from_utf8(index.to_document().unwrap()).unwrap();
        assert_eq!(doc, format!("{{\n    \"?a=1&b=2\": \"{name}\"\n}}"));
    }

    #[test]
    fn test_upsert_last_write_wins() {
        let mut index = Index::new();
        let key = QueryKey::raw("?a=1");
        let first = StorageName::parse("first.json").unwrap();
        let second = StorageName::parse("second.json").unwrap();

        assert_eq!(index.upsert(key.clone(), first.clone()), None);
        assert_eq!(index.upsert(key.clone(), second.clone()), Some(first));
        assert_eq!(index.get(&key), Some(&second));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_temp_path() {
        assert_eq!(temp_path(Path::new("/srv/index.json")), PathBuf::from("/srv/index.json.tmp"));
    }
}
