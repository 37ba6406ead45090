//! Storage abstraction and implementations for standup.
//!
//! This crate provides the narrow history and feedback interfaces the insight
//! pipeline consumes, a wider [`Storage`] trait for the rest of the
//! application, a JSON file backend and an optional SQLite backend.

#![warn(missing_docs)]

pub mod trait_;
#[cfg(feature = "json")]
pub mod json_storage;
#[cfg(feature = "sqlite")]
pub mod sqlite_storage;

pub use trait_::{FeedbackSink, HistoryStore, Result, Storage, StorageError};
#[cfg(feature = "json")]
pub use json_storage::JsonStorage;
#[cfg(feature = "sqlite")]
pub use sqlite_storage::SqliteStorage;
