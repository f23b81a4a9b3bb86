//! Session management for the Pastibot client.
//!
//! This crate provides:
//! - Explicit FSM-based session state management
//! - Token persistence and launch-time restore
//! - Credential, registration and federated sign-in flows converging on
//!   one install path
//! - A local redirect listener for browser-based federated sign-in
//! - The pure post-sign-in destination policy

mod error;
mod federated;
mod machine;
mod manager;
mod redirect;

#[cfg(test)]
mod tests;

pub use error::{SessionError, SessionResult};
pub use federated::{
    FederatedHandoff, FederatedProvider, RedirectListener, RedirectOutcome,
    DEFAULT_REDIRECT_PORT, DEFAULT_REDIRECT_TIMEOUT_SECS,
};
pub use machine::session_machine;
pub use machine::{SessionMachine, SessionMachineInput, SessionMachineState, SessionState};
pub use manager::{
    SessionManager, SessionSnapshot, SessionStateCallback, SessionStateChangedPayload,
    SignInOutcome,
};
pub use redirect::{destination_for, Destination};
