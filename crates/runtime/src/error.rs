//! Persistence error types.

/// Storage-layer failures: I/O, quota, corruption.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io failure for key {key:?}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("blob for key {key:?} failed its integrity check")]
    Corrupted { key: String },

    #[error("serialization failed: {0}")]
    Encode(String),

    #[error("deserialization failed: {0}")]
    Decode(String),
}

/// Restore-side failures that abort the whole load (as opposed to
/// per-record skips, which only warn).
#[derive(Debug, thiserror::Error)]
pub enum RestoreError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("snapshot version {found:?} is not readable by this build")]
    IncompatibleVersion { found: String },
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
