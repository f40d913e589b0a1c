//! Account operations against the estate API.
//!
//! [`AuthService`] issues the auth requests and is the only writer of
//! sign-in state; the 401 path in the HTTP pipeline is the only other place
//! that clears the session.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::{ApiClient, ApiResult};
use crate::session::{Session, SessionStore, User};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Body of `POST /register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub password: String,
    pub password_confirmation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailVerification {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasswordReset {
    pub email: String,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    #[serde(alias = "access_token")]
    token: String,
    user: User,
}

/// Login, logout and the account lifecycle routes.
#[derive(Clone)]
pub struct AuthService {
    api: ApiClient,
    session: SessionStore,
}

impl AuthService {
    pub fn new(api: ApiClient, session: SessionStore) -> Self {
        Self { api, session }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Exchanges credentials for a token and stores the new session.
    ///
    /// Rejected credentials come back as an `Auth` error (401) or a
    /// `Validation` error (422), depending on how the server reports them.
    pub async fn login(&self, credentials: &Credentials) -> ApiResult<Session> {
        let data: LoginData = self.api.post("login", credentials).await?.into_data();
        self.session.sign_in(data.token, data.user);
        Ok(self.session.state())
    }

    /// Ends the session. Never fails.
    ///
    /// The server is told first when there is a token to revoke; whatever it
    /// answers, the local session is cleared.
    pub async fn logout(&self) {
        if self.session.token().is_some()
            && let Err(e) = self.api.post::<_, Option<Value>>("logout", &()).await
        {
            tracing::warn!(kind = %e.kind, "remote logout failed: {e}");
        }
        self.session.clear();
    }

    /// Creates an account. The server follows up with a verification email.
    pub async fn register(&self, registration: &Registration) -> ApiResult<Option<String>> {
        let envelope = self
            .api
            .post::<_, Option<Value>>("register", registration)
            .await?;
        Ok(envelope.message)
    }

    pub async fn verify_email(&self, verification: &EmailVerification) -> ApiResult<Option<String>> {
        let envelope = self
            .api
            .post::<_, Option<Value>>("verify-email", verification)
            .await?;
        Ok(envelope.message)
    }

    pub async fn forgot_password(&self, request: &PasswordReset) -> ApiResult<Option<String>> {
        let envelope = self
            .api
            .post::<_, Option<Value>>("forgot-password", request)
            .await?;
        Ok(envelope.message)
    }

    /// Reloads the signed-in user's profile and stores it in the session.
    pub async fn refresh_user(&self) -> ApiResult<User> {
        let user: User = self.api.get("user").await?.into_data();
        self.session.update_user(user.clone());
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::api::{ApiErrorKind, Pipeline};

    fn service_for(server: &MockServer) -> AuthService {
        let session = SessionStore::in_memory();
        let api = ApiClient::with_pipeline(
            server.uri(),
            Duration::from_secs(5),
            Pipeline::for_session(&session),
        )
        .unwrap();
        AuthService::new(api, session)
    }

    fn credentials() -> Credentials {
        Credentials {
            email: "resident@estate.test".into(),
            password: "secret".into(),
        }
    }

    #[tokio::test]
    async fn test_login_stores_token_and_user() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .and(body_json(json!({"email": "resident@estate.test", "password": "secret"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"token": "tok-1", "user": {"id": 4, "first_name": "Ada"}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let auth = service_for(&server);
        let session = auth.login(&credentials()).await.unwrap();

        assert_eq!(session.token.as_deref(), Some("tok-1"));
        assert_eq!(auth.session().user().unwrap().first_name, "Ada");
    }

    #[tokio::test]
    async fn test_login_accepts_access_token_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"access_token": "tok-2", "user": {"id": 5, "first_name": "Bo"}}
            })))
            .mount(&server)
            .await;

        let auth = service_for(&server);
        auth.login(&credentials()).await.unwrap();
        assert_eq!(auth.session().token().as_deref(), Some("tok-2"));
    }

    #[tokio::test]
    async fn test_rejected_login_is_auth_error_and_leaves_logged_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid credentials"})),
            )
            .mount(&server)
            .await;

        let auth = service_for(&server);
        let err = auth.login(&credentials()).await.unwrap_err();

        assert_eq!(err.kind, ApiErrorKind::Auth);
        assert_eq!(err.user_message(), "Invalid credentials");
        assert!(!auth.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_logout_clears_even_when_server_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/logout"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let auth = service_for(&server);
        auth.session().sign_in("tok".into(), User::named(1, "Ada"));

        auth.logout().await;
        assert_eq!(auth.session().state(), Session::default());
    }

    #[tokio::test]
    async fn test_logout_when_logged_out_skips_server() {
        let server = MockServer::start().await;
        let auth = service_for(&server);

        auth.logout().await;

        assert_eq!(auth.session().state(), Session::default());
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_user_updates_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"id": 1, "first_name": "Ada", "last_name": "Obi", "unit": "B4"}
            })))
            .mount(&server)
            .await;

        let auth = service_for(&server);
        auth.session().sign_in("tok".into(), User::named(1, "A"));

        let user = auth.refresh_user().await.unwrap();
        assert_eq!(user.full_name(), "Ada Obi");
        assert_eq!(auth.session().user().unwrap(), user);
        assert_eq!(auth.session().token().as_deref(), Some("tok"));
    }

    #[tokio::test]
    async fn test_register_returns_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/register"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "data": null,
                "message": "Check your inbox for a verification code"
            })))
            .mount(&server)
            .await;

        let auth = service_for(&server);
        let message = auth
            .register(&Registration {
                first_name: "Ada".into(),
                last_name: "Obi".into(),
                email: "ada@estate.test".into(),
                phone: None,
                password: "pw".into(),
                password_confirmation: "pw".into(),
            })
            .await
            .unwrap();

        assert_eq!(message.as_deref(), Some("Check your inbox for a verification code"));
        assert!(!auth.session().is_authenticated());

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert!(body.get("phone").is_none());
    }
}
