//! File-backed store: one file per key with a SHA-256 integrity prefix.
//!
//! Writes go through a temp file and rename so a crash never leaves a
//! half-written save behind.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{Result, StoreError};
use crate::store::SaveStore;

const CHECKSUM_LEN: usize = 32;

pub struct FileSaveStore {
    dir: PathBuf,
}

impl FileSaveStore {
    /// Opens (creating if needed) a store rooted at `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            key: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// The platform default save directory for a game nid.
    pub fn default_dir(game_nid: &str) -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", game_nid).map(|d| d.data_dir().join("saves"))
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are internal slot names; keep filenames conservative.
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{safe}.sav"))
    }

    fn key_for(path: &Path) -> Option<String> {
        let name = path.file_name()?.to_str()?;
        name.strip_suffix(".sav").map(str::to_owned)
    }
}

impl SaveStore for FileSaveStore {
    fn put(&mut self, key: &str, value: &[u8]) -> Result<()> {
        let checksum = Sha256::digest(value);
        let path = self.path_for(key);
        let tmp = path.with_extension("sav.tmp");

        let io = |source| StoreError::Io {
            key: key.to_owned(),
            source,
        };
        let mut file = fs::File::create(&tmp).map_err(io)?;
        file.write_all(&checksum).map_err(io)?;
        file.write_all(value).map_err(io)?;
        file.sync_all().map_err(io)?;
        fs::rename(&tmp, &path).map_err(io)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        let blob = match fs::read(&path) {
            Ok(blob) => blob,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    key: key.to_owned(),
                    source,
                });
            }
        };
        if blob.len() < CHECKSUM_LEN {
            return Err(StoreError::Corrupted {
                key: key.to_owned(),
            });
        }
        let (stored, payload) = blob.split_at(CHECKSUM_LEN);
        let computed = Sha256::digest(payload);
        if stored != computed.as_slice() {
            tracing::error!(key, expected = %hex::encode(stored), "save blob checksum mismatch");
            return Err(StoreError::Corrupted {
                key: key.to_owned(),
            });
        }
        Ok(Some(payload.to_vec()))
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                key: key.to_owned(),
                source,
            }),
        }
    }

    fn list_keys(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.dir).map_err(|source| StoreError::Io {
            key: self.dir.display().to_string(),
            source,
        })?;
        let mut keys: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| Self::key_for(&e.path()))
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_and_listing() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileSaveStore::new(dir.path()).unwrap();
        store.put("sample-1", b"hello").unwrap();
        store.put("sample-1.meta", b"{}").unwrap();

        assert_eq!(store.get("sample-1").unwrap().unwrap(), b"hello");
        assert_eq!(
            store.list_keys().unwrap(),
            vec!["sample-1", "sample-1.meta"]
        );
        store.delete("sample-1").unwrap();
        assert_eq!(store.get("sample-1").unwrap(), None);
    }

    #[test]
    fn corrupted_blob_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileSaveStore::new(dir.path()).unwrap();
        store.put("sample-1", b"hello").unwrap();

        let path = dir.path().join("sample-1.sav");
        let mut blob = fs::read(&path).unwrap();
        let last = blob.len() - 1;
        blob[last] ^= 0xff;
        fs::write(&path, blob).unwrap();

        assert!(matches!(
            store.get("sample-1"),
            Err(StoreError::Corrupted { .. })
        ));
    }

    #[test]
    fn missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSaveStore::new(dir.path()).unwrap();
        assert_eq!(store.get("nope").unwrap(), None);
    }
}
