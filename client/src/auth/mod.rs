//! Authentication collaborator and provider error mapping.

mod identity;
mod memory;

use async_trait::async_trait;
use thiserror::Error;

pub use identity::IdentityToolkit;
pub use memory::MemoryAuth;

/// Failures reported by an identity provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("No account exists for that email")]
    UserNotFound,

    #[error("Wrong email or password")]
    WrongCredential,

    #[error("Email already in use")]
    EmailInUse,

    #[error("Password is too weak")]
    WeakCredential,

    /// Sensitive operations need a fresh sign-in
    #[error("Recent sign-in required")]
    RequiresRecentLogin,

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Auth provider error: {0}")]
    Provider(String),

    #[error("Auth request failed: {0}")]
    Transport(String),
}

impl AuthError {
    /// Map a provider error code. Accepts both `auth/...` style codes and
    /// the upper-case codes returned by the REST endpoints.
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "auth/user-not-found" | "EMAIL_NOT_FOUND" | "USER_NOT_FOUND" => AuthError::UserNotFound,
            "auth/wrong-password" | "auth/invalid-credential" | "INVALID_PASSWORD"
            | "INVALID_LOGIN_CREDENTIALS" => AuthError::WrongCredential,
            "auth/email-already-in-use" | "EMAIL_EXISTS" => AuthError::EmailInUse,
            "auth/weak-password" | "WEAK_PASSWORD" => AuthError::WeakCredential,
            "auth/requires-recent-login" | "CREDENTIAL_TOO_OLD_LOGIN_AGAIN" => {
                AuthError::RequiresRecentLogin
            }
            other => AuthError::Provider(other.to_string()),
        }
    }

    /// Text shown to the user
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::UserNotFound => "User not found",
            AuthError::WrongCredential => "Wrong password",
            AuthError::EmailInUse => "That email is already registered",
            AuthError::WeakCredential => "Password is too weak",
            AuthError::RequiresRecentLogin => "Please sign in again to complete this security action",
            AuthError::NotSignedIn => "Please sign in first",
            AuthError::Provider(_) | AuthError::Transport(_) => {
                "Something went wrong while contacting the server"
            }
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        AuthError::Transport(e.to_string())
    }
}

/// A signed-in identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub uid: String,
    pub email: String,
    /// Bearer token for providers that issue one
    pub id_token: Option<String>,
}

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Delete the signed-in identity. Providers may answer
    /// [`AuthError::RequiresRecentLogin`] when the sign-in is too old.
    async fn delete_identity(&self) -> Result<(), AuthError>;

    fn current(&self) -> Option<AuthSession>;
}
