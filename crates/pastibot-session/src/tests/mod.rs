//! Integration tests for the session manager.
//!
//! Every scenario drives a real `SessionManager` against a scripted local
//! HTTP backend, so request bodies, bearer headers and failure handling
//! are exercised end to end:
//!
//! - `harness.rs`        - In-memory token vault and the scripted backend
//! - `restore.rs`        - Launch-time session restore
//! - `login.rs`          - Credential login and registration
//! - `logout.rs`         - Logout, stale responses, push registration
//! - `federated_flow.rs` - Browser redirect hand-off and resumption
//! - `roles.rs`          - Role assignment and patient onboarding
//! - `passwords.rs`      - Password creation and reset

mod federated_flow;
