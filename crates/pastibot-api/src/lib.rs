//! Typed REST client for the Pastibot backend.
//!
//! Covers the `/auth/*` session endpoints plus the patient, medicine,
//! and robot resources. Authenticated requests carry the bearer token
//! held in the client's shared slot.

mod auth;
mod client;
mod error;
mod models;
mod patients;
mod robot;

pub use client::ApiClient;
pub use error::{ApiError, ApiResult};
pub use models::{
    AuthResponse, DispenseAck, FederatedRegisterRequest, ForgotPasswordResponse, HistoryEntry,
    InventorySlot, Medicine, MedicinePayload, MedicineRef, MonitoringEntry, Patient,
    PatientProfile, PatientUserCard, ProfileUpdate, RegisterRequest, Reminder, RobotStatus, Role,
    SetRoleResponse, User,
};
