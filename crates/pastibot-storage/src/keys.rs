//! Storage key constants.

/// Storage keys used by the client
pub struct StorageKeys;

impl StorageKeys {
    /// Bearer token for the backend session
    pub const ACCESS_TOKEN: &'static str = "access_token";

    /// Role hint persisted across a federated-login redirect
    pub const PENDING_ROLE: &'static str = "pending_role";

    /// Caregiver's currently selected patient
    pub const ACTIVE_PATIENT_ID: &'static str = "active_patient_id";
}
