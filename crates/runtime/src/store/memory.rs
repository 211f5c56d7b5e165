//! In-memory store for tests and ephemeral sessions.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::store::SaveStore;

#[derive(Debug, Default)]
pub struct MemorySaveStore {
    blobs: BTreeMap<String, Vec<u8>>,
}

impl MemorySaveStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SaveStore for MemorySaveStore {
    fn put(&mut self, key: &str, value: &[u8]) -> Result<()> {
        self.blobs.insert(key.to_owned(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.get(key).cloned())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        self.blobs.remove(key);
        Ok(())
    }

    fn list_keys(&self) -> Result<Vec<String>> {
        Ok(self.blobs.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_ordered() {
        let mut store = MemorySaveStore::new();
        store.put("b", b"2").unwrap();
        store.put("a", b"1").unwrap();
        store.put("a.meta", b"m").unwrap();
        assert_eq!(store.list_keys().unwrap(), vec!["a", "a.meta", "b"]);
        store.delete("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
        assert!(store.get("b").unwrap().is_some());
    }
}
