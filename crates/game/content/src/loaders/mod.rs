//! Loaders for reading game data from RON files.

pub mod level;
pub mod map;

use std::path::Path;

use serde::de::DeserializeOwned;

/// Common result type for loaders.
pub type LoadResult<T> = anyhow::Result<T>;

/// Helper function to read file contents.
pub(crate) fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read file {}: {}", path.display(), e))
}

/// Parses a whole RON file into a deserializable registry value.
pub(crate) fn parse_ron<T: DeserializeOwned>(path: &Path) -> LoadResult<T> {
    let content = read_file(path)?;
    ron::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))
}

/// Loads a registry file, falling back to the default when the file is
/// absent. Parse errors are still hard errors.
pub(crate) fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> LoadResult<T> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "data file missing, using defaults");
        return Ok(T::default());
    }
    parse_ron(path)
}
