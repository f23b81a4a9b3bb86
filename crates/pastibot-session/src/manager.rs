//! Session lifecycle management with FSM-based state tracking.
//!
//! This module provides a `SessionManager` that uses an internal finite
//! state machine to track the session explicitly, rather than deriving it
//! from storage checks. Session data (the bearer token and the fetched
//! identity) lives in an atomically-replaced snapshot; the FSM tracks the
//! transient phases (restoring, logging in, logging out) that are never
//! persisted.
//!
//! The manager owns nothing global: it is constructed from an injected
//! `TokenVault` and `ApiClient`, and consumers read state through
//! `snapshot()`.

use crate::federated::{FederatedHandoff, FederatedProvider};
use crate::machine::{SessionMachine, SessionMachineInput, SessionState};
use crate::redirect::{destination_for, Destination};
use crate::{SessionError, SessionResult};
use pastibot_api::{
    ApiClient, AuthResponse, FederatedRegisterRequest, ProfileUpdate, RegisterRequest, Role, User,
};
use pastibot_storage::TokenVault;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Point-in-time view of the session.
///
/// Invariant: `user` is only ever `Some` while `access_token` is `Some`.
/// Updates replace the whole snapshot under one lock, so a reader never
/// sees the token of one session next to the identity of another.
/// Snapshots carry the bearer token and are never serialized; state
/// notifications go through the token-free [`SessionStateChangedPayload`].
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    /// Bearer token for the current session.
    pub access_token: Option<String>,
    /// The signed-in account, fetched from the backend.
    pub user: Option<User>,
    /// True until the first restore (or first sign-in) resolves after launch.
    pub bootstrapping: bool,
}

impl SessionSnapshot {
    fn launching() -> Self {
        Self {
            access_token: None,
            user: None,
            bootstrapping: true,
        }
    }

    /// Whether a confirmed identity is present.
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// What a successful sign-in resolved to.
#[derive(Debug, Clone, Serialize)]
pub struct SignInOutcome {
    /// The signed-in account.
    pub user: User,
    /// Where the app should send the user next.
    pub destination: Destination,
    /// Provider-created account that has not set a local password yet.
    pub needs_password: bool,
}

/// Payload for session state change notifications.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStateChangedPayload {
    /// Current session state.
    pub state: SessionState,
    /// User ID if signed in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    /// User email if signed in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Callback type for session state change notifications.
pub type SessionStateCallback = Box<dyn Fn(SessionStateChangedPayload) + Send + Sync>;

/// Session manager for the Pastibot client.
///
/// One instance per process. All sign-in paths (password, registration,
/// federated resume) converge on the same install path, so the snapshot
/// invariants hold no matter how the session was obtained.
pub struct SessionManager {
    vault: TokenVault,
    api: ApiClient,
    /// Internal FSM for tracking session state transitions.
    fsm: Mutex<SessionMachine>,
    /// Whole-session snapshot, replaced atomically on every change.
    snapshot: Mutex<SessionSnapshot>,
    /// Session epoch. Bumped on every install and clear so a response that
    /// raced a logout or re-login can be recognized as stale and dropped.
    generation: AtomicU64,
    /// Optional callback for state change notifications.
    state_callback: Mutex<Option<SessionStateCallback>>,
}

impl SessionManager {
    /// Create a new session manager.
    pub fn new(vault: TokenVault, api: ApiClient) -> Self {
        Self {
            vault,
            api,
            fsm: Mutex::new(SessionMachine::new()),
            snapshot: Mutex::new(SessionSnapshot::launching()),
            generation: AtomicU64::new(0),
            state_callback: Mutex::new(None),
        }
    }

    /// The API client this session drives.
    ///
    /// Carries the session bearer token, so data calls made through it are
    /// authenticated as the current user.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Set a callback to be notified of session state changes.
    pub fn set_state_callback(&self, callback: SessionStateCallback) {
        let mut cb = self.state_callback.lock().unwrap();
        *cb = Some(callback);
    }

    /// Get the current FSM state.
    pub fn state(&self) -> SessionState {
        let fsm = self.fsm.lock().unwrap();
        SessionState::from(fsm.state())
    }

    /// A copy of the current session snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.lock().unwrap().clone()
    }

    /// Whether a confirmed identity is present.
    pub fn is_authenticated(&self) -> bool {
        self.snapshot.lock().unwrap().is_authenticated()
    }

    /// The current session epoch.
    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Transition the FSM and notify the callback if the state changed.
    fn transition(&self, input: &SessionMachineInput) -> SessionResult<SessionState> {
        let mut fsm = self.fsm.lock().unwrap();
        let old_state = SessionState::from(fsm.state());

        fsm.consume(input).map_err(|_| {
            SessionError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input,
                fsm.state()
            ))
        })?;

        let new_state = SessionState::from(fsm.state());
        drop(fsm);

        if old_state != new_state {
            debug!(
                old_state = ?old_state,
                new_state = ?new_state,
                "Session state transition"
            );
            self.notify_state_change(&new_state);
        }

        Ok(new_state)
    }

    /// Notify the callback of a state change.
    fn notify_state_change(&self, state: &SessionState) {
        let cb = self.state_callback.lock().unwrap();
        if let Some(callback) = cb.as_ref() {
            let (user_id, email) = {
                let snapshot = self.snapshot.lock().unwrap();
                match snapshot.user.as_ref() {
                    Some(user) => (Some(user.id), Some(user.email.clone())),
                    None => (None, None),
                }
            };

            callback(SessionStateChangedPayload {
                state: state.clone(),
                user_id,
                email,
            });
        }
    }

    /// Install a confirmed session: persist the token, attach the bearer,
    /// and replace the snapshot in one step.
    fn install_session(&self, token: &str, user: User) -> SessionResult<()> {
        // Vault first: if the write fails, the in-memory session is untouched
        self.vault.set_access_token(token)?;
        self.api.set_bearer(token);

        let mut snapshot = self.snapshot.lock().unwrap();
        snapshot.access_token = Some(token.to_string());
        snapshot.user = Some(user);
        snapshot.bootstrapping = false;
        // Bumped under the snapshot lock so stale-response checks can read
        // generation and snapshot consistently
        self.generation.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Drop all local session state: vault token, bearer, snapshot.
    ///
    /// Never fails; a storage error here is logged and the in-memory state
    /// is cleared regardless.
    fn clear_local_session(&self) {
        if let Err(e) = self.vault.clear_session() {
            warn!(error = %e, "Failed to clear stored session");
        }
        self.api.clear_bearer();

        let mut snapshot = self.snapshot.lock().unwrap();
        snapshot.access_token = None;
        snapshot.user = None;
        snapshot.bootstrapping = false;
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Mark the launch check as finished without establishing a session.
    fn finish_bootstrap(&self) {
        let mut snapshot = self.snapshot.lock().unwrap();
        snapshot.bootstrapping = false;
    }

    /// Shared tail of every sign-in path.
    fn complete_sign_in(&self, token: String, user: User) -> SessionResult<SignInOutcome> {
        self.install_session(&token, user.clone())?;
        self.transition(&SessionMachineInput::ProfileLoaded)?;

        let destination = destination_for(&user);
        let needs_password = !user.has_password();
        info!(user_id = user.id, destination = %destination, "Signed in");

        Ok(SignInOutcome {
            user,
            destination,
            needs_password,
        })
    }

    /// Settle the FSM after a failed sign-in attempt. A re-login that
    /// failed leaves the previous session in effect, so the machine goes
    /// back to Authenticated rather than Anonymous.
    fn fail_login(&self) {
        let input = if self.is_authenticated() {
            SessionMachineInput::PreviousSessionKept
        } else {
            SessionMachineInput::LoginFailed
        };
        let _ = self.transition(&input);
    }

    /// Adopt a fresh auth response, rolling the FSM back on install failure.
    fn finish_login(&self, auth: AuthResponse) -> SessionResult<SignInOutcome> {
        match self.complete_sign_in(auth.access_token, auth.user) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.fail_login();
                Err(e)
            }
        }
    }

    /// Restore a persisted session at launch.
    ///
    /// Called once as the first step of the init sequence, before any
    /// sign-in entry point. Uses the FSM to track the attempt:
    /// - Bootstrapping -> Restoring -> NoStoredToken -> Anonymous
    /// - Bootstrapping -> Restoring -> ProfileLoaded -> Authenticated
    /// - Bootstrapping -> Restoring -> TokenRejected -> Anonymous (token cleared)
    /// - Bootstrapping -> Restoring -> TransientFailure -> Anonymous (token kept)
    ///
    /// Returns:
    /// - `Ok(Authenticated)` if the stored token was accepted
    /// - `Ok(Anonymous)` if there was no token, or the server rejected it
    /// - `Err(...)` on a network/server failure; the token stays in the
    ///   vault and the caller may invoke `restore()` again
    pub async fn restore(&self) -> SessionResult<SessionState> {
        self.transition(&SessionMachineInput::RestoreStarted)?;

        let token = match self.vault.access_token()? {
            Some(token) => token,
            None => {
                debug!("No stored token; starting anonymous");
                self.finish_bootstrap();
                return self.transition(&SessionMachineInput::NoStoredToken);
            }
        };

        self.api.set_bearer(&token);

        match self.api.profile().await {
            Ok(user) => {
                info!(user_id = user.id, "Restored session from stored token");
                if let Err(e) = self.install_session(&token, user) {
                    self.api.clear_bearer();
                    self.finish_bootstrap();
                    let _ = self.transition(&SessionMachineInput::TransientFailure);
                    return Err(e);
                }
                self.transition(&SessionMachineInput::ProfileLoaded)
            }
            Err(e) if e.is_unauthorized() => {
                warn!(error = %e, "Stored token rejected by server");
                self.clear_local_session();
                self.transition(&SessionMachineInput::TokenRejected)
            }
            Err(e) => {
                // Transient failure: the token may still be good, keep it.
                // The bearer is detached so nothing runs half-authenticated.
                warn!(error = %e, "Could not validate stored session");
                self.api.clear_bearer();
                self.finish_bootstrap();
                let _ = self.transition(&SessionMachineInput::TransientFailure);
                Err(e.into())
            }
        }
    }

    /// Sign in with email and password.
    ///
    /// On success the token is persisted and the identity populated in one
    /// snapshot swap. On failure the backend's message is surfaced verbatim
    /// and the previous session (if any) is left exactly as it was.
    ///
    /// Permitted while already authenticated; the new session replaces the
    /// old one.
    pub async fn login_with_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> SessionResult<SignInOutcome> {
        self.transition(&SessionMachineInput::LoginStarted)?;
        debug!(email = %email, "Attempting credential login");

        match self.api.login(email, password).await {
            Ok(auth) => self.finish_login(auth),
            Err(e) => {
                warn!(error = %e, "Login failed");
                self.fail_login();
                Err(e.into())
            }
        }
    }

    /// Create an account and sign in with it.
    pub async fn register(&self, request: &RegisterRequest) -> SessionResult<SignInOutcome> {
        self.transition(&SessionMachineInput::LoginStarted)?;
        debug!(email = %request.email, "Registering account");

        match self.api.register(request).await {
            Ok(auth) => self.finish_login(auth),
            Err(e) => {
                warn!(error = %e, "Registration failed");
                self.fail_login();
                Err(e.into())
            }
        }
    }

    /// Sign in with a provider ID token obtained natively on this device.
    pub async fn login_with_id_token(&self, id_token: &str) -> SessionResult<SignInOutcome> {
        self.transition(&SessionMachineInput::LoginStarted)?;
        debug!("Attempting federated token login");

        match self.api.federated_login(id_token).await {
            Ok(auth) => self.finish_login(auth),
            Err(e) => {
                warn!(error = %e, "Federated token login failed");
                self.fail_login();
                Err(e.into())
            }
        }
    }

    /// Create an account from a provider ID token and sign in with it.
    pub async fn register_with_id_token(
        &self,
        request: &FederatedRegisterRequest,
    ) -> SessionResult<SignInOutcome> {
        self.transition(&SessionMachineInput::LoginStarted)?;
        debug!("Registering account from federated token");

        match self.api.federated_register(request).await {
            Ok(auth) => self.finish_login(auth),
            Err(e) => {
                warn!(error = %e, "Federated registration failed");
                self.fail_login();
                Err(e.into())
            }
        }
    }

    /// Stash the role chosen before a federated redirect.
    ///
    /// Consumed by `resume_federated` when the account comes back without a
    /// role assigned.
    pub fn stash_pending_role(&self, role: Role) -> SessionResult<()> {
        if let Some(wire) = role.as_wire() {
            self.vault.set_pending_role(wire)?;
        }
        Ok(())
    }

    /// Prepare a federated sign-in: stash the chosen role and build the
    /// browser hand-off.
    ///
    /// The caller opens `auth_url` in a browser and feeds the redirect's
    /// token to `resume_federated`. This call itself never mutates the
    /// session.
    pub fn begin_federated(
        &self,
        provider: FederatedProvider,
        role: Role,
        return_url: &str,
    ) -> SessionResult<FederatedHandoff> {
        self.stash_pending_role(role)?;
        FederatedHandoff::new(self.api.base_url(), provider, role, return_url)
    }

    /// Resume a federated sign-in from the redirect's token.
    ///
    /// This is the return-from-redirect handler: the browser flow ends with
    /// the backend handing over a session token, and this call converges on
    /// the same install path as credential login. If the account has no role
    /// yet and a pending role was stashed before the redirect, the role is
    /// assigned here (adopting the rotated token the backend returns).
    ///
    /// On any failure the session is left exactly as it was before the call.
    pub async fn resume_federated(&self, token: &str) -> SessionResult<SignInOutcome> {
        let token = token.trim();
        if token.is_empty() {
            return Err(SessionError::Federated(
                "redirect carried no session token".to_string(),
            ));
        }

        self.transition(&SessionMachineInput::LoginStarted)?;

        let previous_bearer = self.api.bearer();
        self.api.set_bearer(token);

        match self.resume_with_bearer(token).await {
            Ok((token, user)) => self.finish_login(AuthResponse {
                access_token: token,
                user,
            }),
            Err(e) => {
                match previous_bearer {
                    Some(prior) => self.api.set_bearer(&prior),
                    None => self.api.clear_bearer(),
                }
                self.fail_login();
                Err(e)
            }
        }
    }

    /// Fetch the identity behind a redirect token and settle the pending
    /// role, returning the final (possibly rotated) token and user.
    async fn resume_with_bearer(&self, token: &str) -> SessionResult<(String, User)> {
        let user = self.api.profile().await?;
        // Consume the hint either way; it belongs to this redirect only
        let pending = self.vault.take_pending_role()?;

        if user.role.is_set() {
            return Ok((token.to_string(), user));
        }

        let Some(role) = pending.as_deref().and_then(Role::from_wire) else {
            return Ok((token.to_string(), user));
        };

        // First sign-in for this account: assign the role chosen before the
        // redirect. Failure is not fatal; the destination policy will send
        // the user to role selection instead.
        debug!(role = %role, "Assigning pending role after federated sign-in");
        let response = match self.api.set_role(role, None).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Pending role assignment failed");
                return Ok((token.to_string(), user));
            }
        };

        let token = match response.access_token {
            Some(rotated) => {
                self.api.set_bearer(&rotated);
                rotated
            }
            None => token.to_string(),
        };

        let user = self.api.profile().await?;
        Ok((token, user))
    }

    /// Sign out.
    ///
    /// Synchronous and idempotent: clears the vault token, the in-memory
    /// identity and the attached bearer without talking to the backend.
    /// Calling it again is a no-op. Advances the session epoch so responses
    /// still in flight for the old session are dropped on arrival.
    pub fn logout(&self) {
        // Tolerate any state; logging out when already anonymous is fine
        let _ = self.transition(&SessionMachineInput::LogoutRequested);

        self.clear_local_session();

        let _ = self.transition(&SessionMachineInput::LogoutComplete);

        info!("Logged out");
    }

    /// Re-fetch the signed-in user's profile without touching the token.
    ///
    /// Used after server-side mutations (role assignment, profile
    /// completion). If the session changed while the request was in flight,
    /// the response is discarded. An authorization rejection clears the
    /// session like a logout.
    pub async fn refresh_profile(&self) -> SessionResult<User> {
        if !self.is_authenticated() {
            return Err(SessionError::NotSignedIn);
        }

        let started_in = self.generation();

        match self.api.profile().await {
            Ok(user) => {
                let mut snapshot = self.snapshot.lock().unwrap();
                if self.generation.load(Ordering::SeqCst) != started_in {
                    warn!("Discarding profile response from a superseded session");
                    return Err(SessionError::Superseded);
                }
                snapshot.user = Some(user.clone());
                Ok(user)
            }
            Err(e) if e.is_unauthorized() => {
                if self.generation() == started_in {
                    warn!(error = %e, "Session token rejected by server");
                    self.clear_local_session();
                    let _ = self.transition(&SessionMachineInput::TokenRejected);
                }
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Assign the account's role.
    ///
    /// Patients must provide a caregiver code here; the first-login
    /// auto-assignment after a federated redirect is the only code-less
    /// path. Adopts the rotated token when the backend returns one, then
    /// refreshes the profile.
    pub async fn select_role(
        &self,
        role: Role,
        caregiver_code: Option<&str>,
    ) -> SessionResult<SignInOutcome> {
        if !self.is_authenticated() {
            return Err(SessionError::NotSignedIn);
        }
        if role == Role::Patient && caregiver_code.map_or(true, |c| c.trim().is_empty()) {
            return Err(SessionError::InvalidInput(
                "patients must provide a caregiver code".to_string(),
            ));
        }

        let response = match self.api.set_role(role, caregiver_code).await {
            Ok(response) => response,
            Err(e) => return Err(self.fail_authenticated_call(e)),
        };

        if let Some(rotated) = response.access_token {
            debug!("Adopting rotated token after role assignment");
            self.vault.set_access_token(&rotated)?;
            self.api.set_bearer(&rotated);
            let mut snapshot = self.snapshot.lock().unwrap();
            snapshot.access_token = Some(rotated);
        }

        let user = self.refresh_profile().await?;
        Ok(SignInOutcome {
            destination: destination_for(&user),
            needs_password: !user.has_password(),
            user,
        })
    }

    /// Finish patient onboarding: save the profile fields, link the
    /// caregiver when a code is given, and refresh the identity.
    ///
    /// A failed caregiver link blocks completion and is surfaced as-is.
    pub async fn complete_patient_profile(
        &self,
        update: &ProfileUpdate,
        caregiver_code: Option<&str>,
    ) -> SessionResult<SignInOutcome> {
        if !self.is_authenticated() {
            return Err(SessionError::NotSignedIn);
        }

        if let Err(e) = self.api.update_my_profile(update).await {
            return Err(self.fail_authenticated_call(e));
        }

        if let Some(code) = caregiver_code.filter(|c| !c.trim().is_empty()) {
            if let Err(e) = self.api.link_caregiver(code).await {
                warn!(error = %e, "Caregiver link failed");
                return Err(self.fail_authenticated_call(e));
            }
        }

        let user = self.refresh_profile().await?;
        Ok(SignInOutcome {
            destination: destination_for(&user),
            needs_password: !user.has_password(),
            user,
        })
    }

    /// Set a password on a provider-created account.
    pub async fn set_password(&self, password: &str) -> SessionResult<()> {
        if !self.is_authenticated() {
            return Err(SessionError::NotSignedIn);
        }
        match self.api.set_password(password).await {
            Ok(()) => {
                info!("Password set");
                // The password marker changed; pick it up opportunistically
                let _ = self.refresh_profile().await;
                Ok(())
            }
            Err(e) => Err(self.fail_authenticated_call(e)),
        }
    }

    /// Request a password reset link for an email address.
    ///
    /// Works without a session. Returns the reset link when the backend
    /// exposes it directly.
    pub async fn forgot_password(&self, email: &str) -> SessionResult<Option<String>> {
        let response = self.api.forgot_password(email).await?;
        Ok(response.reset_link)
    }

    /// Redeem a password reset token. Works without a session.
    pub async fn reset_password(&self, token: &str, password: &str) -> SessionResult<()> {
        self.api.reset_password(token, password).await?;
        Ok(())
    }

    /// Register a push notification token for the signed-in user.
    ///
    /// Fire-and-forget: the upload runs in a spawned task, and a failure is
    /// logged without ever touching session state.
    pub fn register_push_token(&self, token: &str) {
        let api = self.api.clone();
        let token = token.to_string();
        tokio::spawn(async move {
            match api.update_fcm(&token).await {
                Ok(()) => debug!("Push token registered"),
                Err(e) => warn!(error = %e, "Push token registration failed"),
            }
        });
    }

    /// Map a failure from an authenticated call, clearing the session when
    /// the server rejected the token itself.
    fn fail_authenticated_call(&self, e: pastibot_api::ApiError) -> SessionError {
        if e.is_unauthorized() {
            warn!(error = %e, "Session token rejected by server");
            self.clear_local_session();
            let _ = self.transition(&SessionMachineInput::TokenRejected);
        }
        e.into()
    }
}
