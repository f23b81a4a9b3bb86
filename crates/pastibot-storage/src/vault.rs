//! High-level API for the client's persisted session state.

use crate::{SecureStorage, StorageError, StorageKeys, StorageResult};

/// Typed facade over a storage backend.
///
/// Holds the one opaque bearer token under its well-known key, plus the
/// small flow hints that survive restarts (pending role across a
/// federated-login redirect, the caregiver's selected patient).
pub struct TokenVault {
    storage: Box<dyn SecureStorage>,
}

impl TokenVault {
    /// Create a new vault with the given storage backend
    pub fn new(storage: Box<dyn SecureStorage>) -> Self {
        Self { storage }
    }

    // ==========================================
    // Bearer token
    // ==========================================

    /// Store the bearer token
    pub fn set_access_token(&self, token: &str) -> StorageResult<()> {
        self.storage.set(StorageKeys::ACCESS_TOKEN, token)
    }

    /// Retrieve the bearer token
    pub fn access_token(&self) -> StorageResult<Option<String>> {
        self.storage.get(StorageKeys::ACCESS_TOKEN)
    }

    /// Check if a persisted session token exists
    pub fn has_session(&self) -> StorageResult<bool> {
        self.storage.has(StorageKeys::ACCESS_TOKEN)
    }

    /// Remove the bearer token, returning whether one existed
    pub fn clear_access_token(&self) -> StorageResult<bool> {
        self.storage.delete(StorageKeys::ACCESS_TOKEN)
    }

    // ==========================================
    // Flow hints
    // ==========================================

    /// Stash the role hint before handing off to a federated-login redirect
    pub fn set_pending_role(&self, role: &str) -> StorageResult<()> {
        self.storage.set(StorageKeys::PENDING_ROLE, role)
    }

    /// Read and clear the pending role hint
    pub fn take_pending_role(&self) -> StorageResult<Option<String>> {
        let role = self.storage.get(StorageKeys::PENDING_ROLE)?;
        if role.is_some() {
            let _ = self.storage.delete(StorageKeys::PENDING_ROLE);
        }
        Ok(role)
    }

    /// Remember the caregiver's selected patient
    pub fn set_active_patient(&self, patient_id: i64) -> StorageResult<()> {
        self.storage
            .set(StorageKeys::ACTIVE_PATIENT_ID, &patient_id.to_string())
    }

    /// Retrieve the caregiver's selected patient
    pub fn active_patient(&self) -> StorageResult<Option<i64>> {
        match self.storage.get(StorageKeys::ACTIVE_PATIENT_ID)? {
            Some(raw) => raw
                .parse::<i64>()
                .map(Some)
                .map_err(|e| StorageError::Encoding(format!("active patient id: {}", e))),
            None => Ok(None),
        }
    }

    /// Forget the selected patient
    pub fn clear_active_patient(&self) -> StorageResult<bool> {
        self.storage.delete(StorageKeys::ACTIVE_PATIENT_ID)
    }

    // ==========================================
    // Session teardown
    // ==========================================

    /// Clear everything tied to the authenticated session.
    ///
    /// Individual delete failures are ignored: logout must always
    /// succeed locally.
    pub fn clear_session(&self) -> StorageResult<()> {
        let _ = self.storage.delete(StorageKeys::ACCESS_TOKEN);
        let _ = self.storage.delete(StorageKeys::PENDING_ROLE);
        Ok(())
    }
}
