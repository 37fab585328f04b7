//! Corpus store implementations for trustgate.

pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::InMemoryCorpus;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteCorpus;
