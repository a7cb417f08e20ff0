use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{AuthError, AuthService, AuthSession};
use crate::config::{ClientConfig, ConfigError};

/// Email/password accounts over an Identity Toolkit style REST API
pub struct IdentityToolkit {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    session: Mutex<Option<AuthSession>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: String,
    id_token: Option<String>,
}

impl IdentityToolkit {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            session: Mutex::new(None),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(ConfigError::Missing("CHORUS_API_KEY"))?;
        Ok(Self::new(config.auth_endpoint.clone(), api_key))
    }

    fn session(&self) -> MutexGuard<'_, Option<AuthSession>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn call(&self, method: &str, body: Value) -> Result<Value, AuthError> {
        let url = format!("{}/accounts:{}", self.endpoint, method);

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = rejection(status.as_u16(), &body);
            tracing::debug!(method, status = status.as_u16(), error = %err, "auth request rejected");
            return Err(err);
        }

        Ok(response.json().await?)
    }

    async fn account(&self, method: &str, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let json = self
            .call(
                method,
                json!({ "email": email, "password": password, "returnSecureToken": true }),
            )
            .await?;

        let account: AccountResponse = serde_json::from_value(json)
            .map_err(|e| AuthError::Provider(format!("malformed account response: {e}")))?;

        let session = AuthSession {
            uid: account.local_id,
            email: if account.email.is_empty() { email.to_string() } else { account.email },
            id_token: account.id_token,
        };
        *self.session() = Some(session.clone());
        Ok(session)
    }
}

/// Map a rejected response. Bodies that aren't provider JSON, such as a
/// proxy's error page, fall back to the HTTP status.
fn rejection(status: u16, body: &str) -> AuthError {
    let json = serde_json::from_str::<Value>(body).unwrap_or(Value::Null);
    match provider_code(&json) {
        Some(code) => AuthError::from_code(code),
        None => AuthError::Provider(format!("HTTP {status}")),
    }
}

/// Error code from a `{"error": {"message": "CODE : detail"}}` body
fn provider_code(body: &Value) -> Option<&str> {
    let message = body.pointer("/error/message")?.as_str()?;
    Some(message.split(" : ").next().unwrap_or(message).trim())
}

#[async_trait]
impl AuthService for IdentityToolkit {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        self.account("signInWithPassword", email, password).await
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        self.account("signUp", email, password).await
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        *self.session() = None;
        Ok(())
    }

    async fn delete_identity(&self) -> Result<(), AuthError> {
        let token = self
            .current()
            .and_then(|session| session.id_token)
            .ok_or(AuthError::NotSignedIn)?;

        self.call("delete", json!({ "idToken": token })).await?;
        *self.session() = None;
        Ok(())
    }

    fn current(&self) -> Option<AuthSession> {
        self.session().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_code_strips_detail() {
        let body = json!({
            "error": { "code": 400, "message": "WEAK_PASSWORD : Password should be at least 6 characters" }
        });
        assert_eq!(provider_code(&body), Some("WEAK_PASSWORD"));
        assert_eq!(
            AuthError::from_code(provider_code(&body).unwrap()),
            AuthError::WeakCredential
        );
    }

    #[test]
    fn test_provider_code_missing() {
        assert_eq!(provider_code(&json!({ "kind": "ok" })), None);
    }

    #[test]
    fn test_rejection_reads_provider_code() {
        let body = r#"{"error":{"code":400,"message":"EMAIL_EXISTS"}}"#;
        assert_eq!(rejection(400, body), AuthError::EmailInUse);
        assert_eq!(
            rejection(400, r#"{"error":{"message":"CREDENTIAL_TOO_OLD_LOGIN_AGAIN"}}"#),
            AuthError::RequiresRecentLogin
        );
    }

    #[test]
    fn test_rejection_with_html_body() {
        let body = "<html><body>503 Service Unavailable</body></html>";
        assert_eq!(rejection(503, body), AuthError::Provider("HTTP 503".to_string()));
        assert_eq!(rejection(502, ""), AuthError::Provider("HTTP 502".to_string()));
    }

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        let auth = IdentityToolkit::new("https://auth.example/v1/", "key");
        assert_eq!(auth.endpoint, "https://auth.example/v1");
        assert!(auth.current().is_none());
    }

    #[test]
    fn test_from_config_requires_key() {
        let config = ClientConfig::default();
        assert!(matches!(
            IdentityToolkit::from_config(&config),
            Err(ConfigError::Missing("CHORUS_API_KEY"))
        ));
    }
}
