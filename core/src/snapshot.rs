//! Local storage format and the durable key-value slot trait.
//!
//! Local mode keeps the whole list as one JSON array under [`STORAGE_KEY`].
//! It is read once when the store is built and overwritten after every change.

use crate::types::TodoItem;
use thiserror::Error;

/// Key of the slot holding the serialized list
pub const STORAGE_KEY: &str = "todos";

/// Errors from the local storage slot or its codec
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the slot failed
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored value is not a valid list
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A durable key-value slot
///
/// Calls are synchronous: local mirroring happens inside the mutation, before
/// observers are notified.
pub trait SnapshotStorage: Send + Sync {
    /// Returns the stored value, or `None` when the key was never written
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` when the slot cannot be read.
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Overwrites the value stored under `key`
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` when the slot cannot be written.
    fn save(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Serializes a list into the storage format
///
/// # Errors
///
/// Returns `StorageError::Serialization` if an item cannot be encoded.
pub fn encode(items: &[TodoItem]) -> Result<String, StorageError> {
    Ok(serde_json::to_string(items)?)
}

/// Parses the storage format back into a list
///
/// # Errors
///
/// Returns `StorageError::Serialization` when `raw` is not a JSON array of items.
pub fn decode(raw: &str) -> Result<Vec<TodoItem>, StorageError> {
    Ok(serde_json::from_str(raw)?)
}

/// Loads the list stored under [`STORAGE_KEY`], empty when nothing was saved
///
/// # Errors
///
/// Propagates read and decode failures.
pub fn load_items(storage: &dyn SnapshotStorage) -> Result<Vec<TodoItem>, StorageError> {
    match storage.load(STORAGE_KEY)? {
        Some(raw) => decode(&raw),
        None => Ok(Vec::new()),
    }
}

/// Overwrites the slot under [`STORAGE_KEY`] with `items`
///
/// # Errors
///
/// Propagates encode and write failures.
pub fn save_items(storage: &dyn SnapshotStorage, items: &[TodoItem]) -> Result<(), StorageError> {
    storage.save(STORAGE_KEY, &encode(items)?)
}
