//! Authentication endpoints.

use crate::models::{
    AuthResponse, FederatedRegisterRequest, ForgotPasswordResponse, RegisterRequest, Role,
    SetRoleResponse, User,
};
use crate::{ApiClient, ApiError, ApiResult};
use serde_json::json;

impl ApiClient {
    /// Exchange credentials for a session token.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<AuthResponse> {
        self.post_json("/auth/login", &json!({ "email": email, "password": password }))
            .await
    }

    /// Create an account; the response authenticates immediately.
    pub async fn register(&self, request: &RegisterRequest) -> ApiResult<AuthResponse> {
        self.post_json("/auth/register", request).await
    }

    /// Fetch the profile of the current bearer.
    pub async fn profile(&self) -> ApiResult<User> {
        self.get_json("/auth/profile").await
    }

    /// Exchange a federated identity-provider credential for a session token.
    pub async fn federated_login(&self, id_token: &str) -> ApiResult<AuthResponse> {
        self.post_json("/auth/firebase-login", &json!({ "idToken": id_token }))
            .await
    }

    /// Create an account from a federated identity-provider credential.
    pub async fn federated_register(
        &self,
        request: &FederatedRegisterRequest,
    ) -> ApiResult<AuthResponse> {
        self.post_json("/auth/firebase-register", request).await
    }

    /// Assign the account role. Patients join a caregiver with a shared code.
    ///
    /// The backend may mint a fresh token scoped to the new role; the
    /// caller is responsible for adopting it.
    pub async fn set_role(
        &self,
        role: Role,
        caregiver_code: Option<&str>,
    ) -> ApiResult<SetRoleResponse> {
        let wire = role
            .as_wire()
            .ok_or_else(|| ApiError::Invalid("cannot assign the unset role".to_string()))?;

        let mut body = json!({ "role": wire });
        if let Some(code) = caregiver_code {
            body["caregiverCode"] = json!(code);
        }

        self.post_json("/auth/set-role", &body).await
    }

    /// Set a password on a federated-only account.
    pub async fn set_password(&self, password: &str) -> ApiResult<()> {
        self.post_unit("/auth/set-password", &json!({ "password": password }))
            .await
    }

    /// Request a password-reset link.
    pub async fn forgot_password(&self, email: &str) -> ApiResult<ForgotPasswordResponse> {
        self.post_json("/auth/forgot-password", &json!({ "email": email }))
            .await
    }

    /// Redeem a password-reset token.
    pub async fn reset_password(&self, token: &str, password: &str) -> ApiResult<()> {
        self.post_unit(
            "/auth/reset-password",
            &json!({ "token": token, "password": password }),
        )
        .await
    }

    /// Register the device's push-notification token.
    pub async fn update_fcm(&self, token: &str) -> ApiResult<()> {
        self.post_unit("/auth/update-fcm", &json!({ "token": token }))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_role_rejects_unset() {
        let client = ApiClient::new("http://localhost:3000").unwrap();
        let err = client.set_role(Role::Unset, None).await.unwrap_err();
        assert!(matches!(err, ApiError::Invalid(_)));
    }
}
