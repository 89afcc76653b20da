//! Read-only replay snapshot built once at startup.

use std::collections::HashMap;

use bytes::Bytes;

use super::content::ContentStore;
use super::index::Index;
use crate::Error;
use crate::key::QueryKey;

/// Every indexed body held in memory, keyed by normalized query.
#[derive(Debug, Clone, Default)]
pub struct ReplaySnapshot {
    bodies: HashMap<QueryKey, Bytes>,
}

impl ReplaySnapshot {
    /// Read every body referenced by `index`.
    ///
    /// Keys are normalized while loading, so indexes written with or without
    /// normalization are both served. A referenced body that cannot be read
    /// fails the whole load.
    pub async fn load(store: &ContentStore, index: &Index) -> Result<Self, Error> {
        let mut bodies = HashMap::with_capacity(index.len());

        for (key, name) in index.iter() {
            let body = store.get(name).await?;
            let normalized = key.to_normalized();
            if bodies.insert(normalized.clone(), body).is_some() {
                tracing::warn!(key = %key, normalized = %normalized, "index keys collide after normalization; keeping the last entry");
            }
        }

        tracing::debug!(entries = bodies.len(), "loaded replay snapshot");

        Ok(Self { bodies })
    }

    /// Look up the body for an already-normalized key.
    pub fn get(&self, key: &QueryKey) -> Option<&Bytes> {
        self.bodies.get(key)
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}
