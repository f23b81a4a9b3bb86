//! Session state machine using rust-fsm.
//!
//! This module defines an explicit finite state machine for the session
//! lifecycle, replacing implicit state derivation from storage checks.
//!
//! ## State Diagram
//!
//! ```text
//! ┌─────────────────┐
//! │  Bootstrapping  │ (initial)
//! └────────┬────────┘
//!          │ RestoreStarted / LoginStarted
//!          ▼
//! ┌─────────────────┐     ┌─────────────────┐
//! │    Restoring    │     │    LoggingIn    │
//! └────────┬────────┘     └────────┬────────┘
//!          │                       │
//!          │ ProfileLoaded         │ ProfileLoaded ──► Authenticated
//!          │                       │
//!          │ NoStoredToken         │ LoginFailed ──► Anonymous
//!          │ TokenRejected         │
//!          │ TransientFailure      ▼
//!          ▼                ┌─────────────────┐
//! ┌─────────────────┐       │  Authenticated  │
//! │    Anonymous    │ ◄──── └────────┬────────┘
//! └────────┬────────┘  TokenRejected │
//!          │                         │ LogoutRequested
//!          │ LoginStarted            ▼
//!          │ RestoreStarted   ┌─────────────────┐
//!          ▼                  │   LoggingOut    │
//!     (back to top)           └────────┬────────┘
//!                                      │ LogoutComplete
//!                                      ▼
//!                                  Anonymous
//! ```
//!
//! A login while already authenticated is permitted: the Authenticated
//! state accepts LoginStarted, and the newest login's result wins. If
//! that attempt fails, PreviousSessionKept returns the machine to
//! Authenticated, since the untouched previous session stays in effect.

use rust_fsm::*;
use serde::{Deserialize, Serialize};

// Define the FSM using rust-fsm's declarative macro
// This generates a module `session_machine` with:
// - session_machine::State (enum)
// - session_machine::Input (enum)
// - session_machine::StateMachine (type alias)
// - session_machine::Impl (trait impl)
state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub session_machine(Bootstrapping)

    Bootstrapping => {
        RestoreStarted => Restoring,
        LoginStarted => LoggingIn
    },
    Restoring => {
        // No token in storage - nothing to restore
        NoStoredToken => Anonymous,
        // Stored token accepted and profile fetched
        ProfileLoaded => Authenticated,
        // Server rejected the stored token
        TokenRejected => Anonymous,
        // Network failure - token kept in storage, retry possible later
        TransientFailure => Anonymous
    },
    Anonymous => {
        LoginStarted => LoggingIn,
        RestoreStarted => Restoring
    },
    LoggingIn => {
        ProfileLoaded => Authenticated,
        LoginFailed => Anonymous,
        // A failed re-login attempt; the session it would have replaced
        // is still in effect
        PreviousSessionKept => Authenticated
    },
    Authenticated => {
        // Re-login is allowed; the newest result replaces the session
        LoginStarted => LoggingIn,
        // A later request hit 401/403 with the current token
        TokenRejected => Anonymous,
        LogoutRequested => LoggingOut
    },
    LoggingOut => {
        LogoutComplete => Anonymous
    }
}

// Re-export the generated types with clearer names
pub use session_machine::Input as SessionMachineInput;
pub use session_machine::State as SessionMachineState;
pub use session_machine::StateMachine as SessionMachine;

/// User-friendly session state for external consumption.
///
/// This is a simplified view of the FSM state for CLI output and callers
/// that only care about the observable phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Initial launch state; persisted token not yet examined.
    Bootstrapping,
    /// Restoring a persisted token (validating with the server).
    Restoring,
    /// No usable session.
    Anonymous,
    /// Currently logging in or registering.
    LoggingIn,
    /// Signed in with a server-confirmed session.
    Authenticated,
    /// Currently logging out.
    LoggingOut,
}

impl SessionState {
    /// Returns true if the user has a confirmed session (Authenticated only).
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated)
    }

    /// Returns true if the state is a transient/in-progress state.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SessionState::Bootstrapping
                | SessionState::Restoring
                | SessionState::LoggingIn
                | SessionState::LoggingOut
        )
    }
}

impl From<&SessionMachineState> for SessionState {
    fn from(state: &SessionMachineState) -> Self {
        match state {
            SessionMachineState::Bootstrapping => SessionState::Bootstrapping,
            SessionMachineState::Restoring => SessionState::Restoring,
            SessionMachineState::Anonymous => SessionState::Anonymous,
            SessionMachineState::LoggingIn => SessionState::LoggingIn,
            SessionMachineState::Authenticated => SessionState::Authenticated,
            SessionMachineState::LoggingOut => SessionState::LoggingOut,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_bootstrapping() {
        let machine = SessionMachine::new();
        assert_eq!(*machine.state(), SessionMachineState::Bootstrapping);
    }

    #[test]
    fn test_restore_with_valid_token() {
        let mut machine = SessionMachine::new();

        machine
            .consume(&SessionMachineInput::RestoreStarted)
            .unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Restoring);

        machine
            .consume(&SessionMachineInput::ProfileLoaded)
            .unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Authenticated);
    }

    #[test]
    fn test_restore_without_stored_token() {
        let mut machine = SessionMachine::new();

        machine
            .consume(&SessionMachineInput::RestoreStarted)
            .unwrap();
        machine
            .consume(&SessionMachineInput::NoStoredToken)
            .unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Anonymous);
    }

    #[test]
    fn test_restore_with_rejected_token() {
        let mut machine = SessionMachine::new();

        machine
            .consume(&SessionMachineInput::RestoreStarted)
            .unwrap();
        machine
            .consume(&SessionMachineInput::TokenRejected)
            .unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Anonymous);
    }

    #[test]
    fn test_restore_failure_allows_retry() {
        let mut machine = SessionMachine::new();

        machine
            .consume(&SessionMachineInput::RestoreStarted)
            .unwrap();
        machine
            .consume(&SessionMachineInput::TransientFailure)
            .unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Anonymous);

        // A second restore attempt is allowed after a transient failure
        machine
            .consume(&SessionMachineInput::RestoreStarted)
            .unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Restoring);
    }

    #[test]
    fn test_login_flow() {
        let mut machine = SessionMachine::new();

        let result = machine.consume(&SessionMachineInput::LoginStarted);
        assert!(result.is_ok());
        assert_eq!(*machine.state(), SessionMachineState::LoggingIn);

        let result = machine.consume(&SessionMachineInput::ProfileLoaded);
        assert!(result.is_ok());
        assert_eq!(*machine.state(), SessionMachineState::Authenticated);
    }

    #[test]
    fn test_login_failure_returns_to_anonymous() {
        let mut machine = SessionMachine::new();

        machine.consume(&SessionMachineInput::LoginStarted).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::LoggingIn);

        let result = machine.consume(&SessionMachineInput::LoginFailed);
        assert!(result.is_ok());
        assert_eq!(*machine.state(), SessionMachineState::Anonymous);
    }

    #[test]
    fn test_relogin_while_authenticated() {
        let mut machine = SessionMachine::new();

        machine.consume(&SessionMachineInput::LoginStarted).unwrap();
        machine
            .consume(&SessionMachineInput::ProfileLoaded)
            .unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Authenticated);

        // Logging in again while authenticated is allowed
        machine.consume(&SessionMachineInput::LoginStarted).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::LoggingIn);

        machine
            .consume(&SessionMachineInput::ProfileLoaded)
            .unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Authenticated);
    }

    #[test]
    fn test_failed_relogin_keeps_authenticated() {
        let mut machine = SessionMachine::new();

        machine.consume(&SessionMachineInput::LoginStarted).unwrap();
        machine
            .consume(&SessionMachineInput::ProfileLoaded)
            .unwrap();

        // Second login attempt fails; the first session is still live
        machine.consume(&SessionMachineInput::LoginStarted).unwrap();
        machine
            .consume(&SessionMachineInput::PreviousSessionKept)
            .unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Authenticated);
    }

    #[test]
    fn test_logout_flow() {
        let mut machine = SessionMachine::new();

        machine.consume(&SessionMachineInput::LoginStarted).unwrap();
        machine
            .consume(&SessionMachineInput::ProfileLoaded)
            .unwrap();

        machine
            .consume(&SessionMachineInput::LogoutRequested)
            .unwrap();
        assert_eq!(*machine.state(), SessionMachineState::LoggingOut);

        machine
            .consume(&SessionMachineInput::LogoutComplete)
            .unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Anonymous);
    }

    #[test]
    fn test_token_rejection_while_authenticated() {
        let mut machine = SessionMachine::new();

        machine.consume(&SessionMachineInput::LoginStarted).unwrap();
        machine
            .consume(&SessionMachineInput::ProfileLoaded)
            .unwrap();

        machine
            .consume(&SessionMachineInput::TokenRejected)
            .unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Anonymous);
    }

    #[test]
    fn test_cannot_authenticate_from_anonymous_directly() {
        let mut machine = SessionMachine::new();

        machine
            .consume(&SessionMachineInput::RestoreStarted)
            .unwrap();
        machine
            .consume(&SessionMachineInput::NoStoredToken)
            .unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Anonymous);

        // Must go through LoggingIn or Restoring first
        let result = machine.consume(&SessionMachineInput::ProfileLoaded);
        assert!(result.is_err());
        assert_eq!(*machine.state(), SessionMachineState::Anonymous);
    }

    #[test]
    fn test_cannot_logout_while_bootstrapping() {
        let mut machine = SessionMachine::new();

        let result = machine.consume(&SessionMachineInput::LogoutRequested);
        assert!(result.is_err());
        assert_eq!(*machine.state(), SessionMachineState::Bootstrapping);
    }

    #[test]
    fn test_session_state_conversion() {
        assert_eq!(
            SessionState::from(&SessionMachineState::Bootstrapping),
            SessionState::Bootstrapping
        );
        assert_eq!(
            SessionState::from(&SessionMachineState::Authenticated),
            SessionState::Authenticated
        );
        assert!(SessionState::Authenticated.is_authenticated());
        assert!(!SessionState::Anonymous.is_authenticated());
        assert!(SessionState::Restoring.is_transient());
        assert!(!SessionState::Authenticated.is_transient());
    }

    #[test]
    fn test_session_state_serialization() {
        let json = serde_json::to_string(&SessionState::Authenticated).unwrap();
        assert_eq!(json, "\"authenticated\"");

        let state: SessionState = serde_json::from_str("\"anonymous\"").unwrap();
        assert_eq!(state, SessionState::Anonymous);
    }
}
