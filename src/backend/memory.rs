use std::collections::HashMap;
use std::sync::RwLock;

use futures::future::{BoxFuture, FutureExt};

use crate::backend::KeyValueStore;
use crate::errors::StoreError;

/// A store that keeps its values in memory. Nothing survives the
/// process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    map: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the value under the given key without going
    /// through the async interface.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.map.read().expect("memory store lock poisoned").get(key).cloned()
    }

    /// Writes a value directly, bypassing the async interface.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.map
            .write()
            .expect("memory store lock poisoned")
            .insert(key.into(), value.into());
    }
}

impl KeyValueStore for MemoryStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StoreError>> {
        let value = self.peek(key);

        async move { Ok::<_, StoreError>(value) }.boxed()
    }

    fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<(), StoreError>> {
        self.insert(key, value);

        async move { Ok::<_, StoreError>(()) }.boxed()
    }
}
