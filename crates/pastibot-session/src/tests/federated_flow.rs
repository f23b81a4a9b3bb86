//! Federated sign-in resumption scenarios.

use super::harness::{
    caregiver_json, manager_with_storage, patient_json, unassigned_user_json, StubBackend,
    StubResponse,
};
use crate::{Destination, FederatedProvider, RedirectListener, SessionState};
use pastibot_api::Role;

#[tokio::test]
async fn resume_adopts_redirect_token_and_signs_in() {
    let backend = StubBackend::start().await;
    backend.stub("GET", "/auth/profile", StubResponse::json(200, &caregiver_json(1)));

    let (manager, storage) = manager_with_storage(&backend);
    manager.restore().await.unwrap();

    let outcome = manager.resume_federated("tok-redirect").await.unwrap();
    assert_eq!(outcome.user.id, 1);
    assert_eq!(outcome.destination, Destination::CaregiverHome);

    let snapshot = manager.snapshot();
    assert_eq!(snapshot.access_token.as_deref(), Some("tok-redirect"));
    assert_eq!(storage.stored_token().as_deref(), Some("tok-redirect"));
    assert_eq!(manager.state(), SessionState::Authenticated);

    // The profile fetch used the redirect's token
    assert_eq!(
        backend.requests_to("/auth/profile")[0].bearer(),
        Some("tok-redirect")
    );
}

#[tokio::test]
async fn resume_assigns_pending_role_and_adopts_rotated_token() {
    let backend = StubBackend::start().await;
    // First profile fetch: fresh account without a role
    backend.stub(
        "GET",
        "/auth/profile",
        StubResponse::json(200, &unassigned_user_json(8)),
    );
    // Role assignment rotates the token
    backend.stub(
        "POST",
        "/auth/set-role",
        StubResponse::json(200, &serde_json::json!({ "accessToken": "tok-rotated" })),
    );
    // Second profile fetch: the account is now a patient
    backend.stub(
        "GET",
        "/auth/profile",
        StubResponse::json(200, &patient_json(8, None, None, None)),
    );

    let (manager, storage) = manager_with_storage(&backend);
    manager.restore().await.unwrap();
    manager.stash_pending_role(Role::Patient).unwrap();

    let outcome = manager.resume_federated("tok-redirect").await.unwrap();

    // The assigned role came back and onboarding is still missing
    assert_eq!(outcome.user.role, Role::Patient);
    assert_eq!(outcome.destination, Destination::CompleteProfile);

    // The rotated token replaced the redirect token everywhere
    assert_eq!(storage.stored_token().as_deref(), Some("tok-rotated"));
    assert_eq!(
        manager.snapshot().access_token.as_deref(),
        Some("tok-rotated")
    );

    // The hint was consumed by this redirect
    assert!(storage.stored_pending_role().is_none());

    // set-role carried the pending role, without a caregiver code
    let set_role_body = backend.requests_to("/auth/set-role")[0].json_body();
    assert_eq!(set_role_body["role"], "PACIENTE");
    assert!(set_role_body.get("caregiverCode").is_none());

    // The second profile fetch ran under the rotated token
    let profile_requests = backend.requests_to("/auth/profile");
    assert_eq!(profile_requests[1].bearer(), Some("tok-rotated"));
}

#[tokio::test]
async fn resume_without_pending_role_leaves_role_unset() {
    let backend = StubBackend::start().await;
    backend.stub(
        "GET",
        "/auth/profile",
        StubResponse::json(200, &unassigned_user_json(8)),
    );

    let (manager, _storage) = manager_with_storage(&backend);
    manager.restore().await.unwrap();

    let outcome = manager.resume_federated("tok-redirect").await.unwrap();
    assert_eq!(outcome.user.role, Role::Unset);
    assert_eq!(outcome.destination, Destination::RoleSelection);
    // No set-role call was attempted
    assert!(backend.requests_to("/auth/set-role").is_empty());
}

#[tokio::test]
async fn resume_survives_failed_role_assignment() {
    let backend = StubBackend::start().await;
    backend.stub(
        "GET",
        "/auth/profile",
        StubResponse::json(200, &unassigned_user_json(8)),
    );
    backend.stub("POST", "/auth/set-role", StubResponse::status(500));

    let (manager, storage) = manager_with_storage(&backend);
    manager.restore().await.unwrap();
    manager.stash_pending_role(Role::Caregiver).unwrap();

    // The sign-in still lands; the user just has to pick a role in-app
    let outcome = manager.resume_federated("tok-redirect").await.unwrap();
    assert_eq!(outcome.destination, Destination::RoleSelection);
    assert_eq!(storage.stored_token().as_deref(), Some("tok-redirect"));
    assert_eq!(manager.state(), SessionState::Authenticated);
}

#[tokio::test]
async fn failed_resume_leaves_previous_session_intact() {
    let backend = StubBackend::start().await;
    // Restore succeeds with the original account
    backend.stub("GET", "/auth/profile", StubResponse::json(200, &caregiver_json(1)));
    // The redirect token is rejected
    backend.stub(
        "GET",
        "/auth/profile",
        StubResponse::error(401, "Token inválido"),
    );
    // A later call under the original bearer still works
    backend.stub("GET", "/auth/profile", StubResponse::json(200, &caregiver_json(1)));

    let (manager, storage) = manager_with_storage(&backend);
    storage.seed_token("tok-original");
    manager.restore().await.unwrap();

    let err = manager.resume_federated("tok-bogus").await.unwrap_err();
    assert!(err.is_unauthorized());

    // Previous session fully intact, bearer restored
    assert_eq!(storage.stored_token().as_deref(), Some("tok-original"));
    assert_eq!(manager.snapshot().user.as_ref().unwrap().id, 1);
    assert_eq!(manager.state(), SessionState::Authenticated);

    manager.refresh_profile().await.unwrap();
    let profile_requests = backend.requests_to("/auth/profile");
    assert_eq!(profile_requests[2].bearer(), Some("tok-original"));
}

#[tokio::test]
async fn full_redirect_round_trip() {
    let backend = StubBackend::start().await;
    backend.stub("GET", "/auth/profile", StubResponse::json(200, &caregiver_json(1)));

    let (manager, storage) = manager_with_storage(&backend);
    manager.restore().await.unwrap();

    let listener = RedirectListener::new(41741, 5);
    let return_url = listener.return_url();
    let handoff = manager
        .begin_federated(FederatedProvider::Google, Role::Caregiver, &return_url)
        .unwrap();

    // The entry URL points at the backend's provider endpoint
    assert!(handoff.auth_url.as_str().starts_with(&backend.url()));
    assert_eq!(handoff.auth_url.path(), "/auth/google");
    assert_eq!(storage.stored_pending_role().as_deref(), Some("CUIDADOR"));

    let state = handoff.state.clone();
    let waiter = tokio::spawn(async move { listener.wait_for_redirect(Some(&state)).await });
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

    // Simulate the backend redirecting the browser back
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    let mut stream = tokio::net::TcpStream::connect(("127.0.0.1", 41741))
        .await
        .unwrap();
    let request = format!(
        "GET /callback?token=tok-browser&state={} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        handoff.state
    );
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    let _ = stream.read_to_end(&mut response).await;

    let outcome = waiter.await.unwrap().unwrap();
    let token = outcome.into_token().unwrap();
    let signed_in = manager.resume_federated(&token).await.unwrap();

    assert_eq!(signed_in.user.id, 1);
    assert_eq!(manager.snapshot().access_token.as_deref(), Some("tok-browser"));
}
