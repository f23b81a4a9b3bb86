//! Local persistence for the Pastibot client.
//!
//! One storage backend ships by default: a JSON key-value file under the
//! client's home directory (owner-only on Unix). The `SecureStorage` trait
//! keeps the seam open for platform keychain backends.

mod file;
mod keys;
mod traits;
mod vault;

pub use file::FileStorage;
pub use keys::StorageKeys;
pub use traits::SecureStorage;
pub use vault::TokenVault;

use std::path::Path;
use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Platform-specific storage error
    #[error("Platform storage error: {0}")]
    Platform(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Create the default storage implementation at the given file path.
pub fn create_storage(path: &Path) -> StorageResult<Box<dyn SecureStorage>> {
    let storage = FileStorage::new(path)?;
    Ok(Box::new(storage))
}

/// Create a TokenVault backed by the default storage at the given path.
pub fn create_vault(path: &Path) -> StorageResult<TokenVault> {
    let storage = create_storage(path)?;
    Ok(TokenVault::new(storage))
}
