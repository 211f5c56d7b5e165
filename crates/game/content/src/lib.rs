//! Content loading for the tactics engine.
//!
//! Converts RON data files into the in-memory [`Database`] registries.
//! All loaders use tolerant semantics: a missing optional file yields an
//! empty registry with a warning, so a partial project still boots.

pub mod factory;
pub mod loaders;
pub mod sample;

pub use factory::ContentFactory;
pub use loaders::LoadResult;

pub use emblem_core::Database;
