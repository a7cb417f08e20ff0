use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::{AuthError, AuthService, AuthSession};

const MIN_PASSWORD_LEN: usize = 6;

struct Account {
    uid: String,
    password: String,
}

#[derive(Default)]
struct Inner {
    accounts: HashMap<String, Account>,
    current: Option<AuthSession>,
    next_uid: u64,
    recent_login_required: bool,
}

/// In-process identity provider for tests and demos
#[derive(Default)]
pub struct MemoryAuth {
    inner: Mutex<Inner>,
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make identity deletion fail as if the sign-in were too old
    pub fn require_recent_login(&self, required: bool) {
        self.lock().recent_login_required = required;
    }

    pub fn has_account(&self, email: &str) -> bool {
        self.lock().accounts.contains_key(&email.to_lowercase())
    }
}

#[async_trait]
impl AuthService for MemoryAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let mut inner = self.lock();
        let account = inner
            .accounts
            .get(&email.to_lowercase())
            .ok_or(AuthError::UserNotFound)?;

        if account.password != password {
            return Err(AuthError::WrongCredential);
        }

        let session = AuthSession {
            uid: account.uid.clone(),
            email: email.to_string(),
            id_token: None,
        };
        inner.current = Some(session.clone());
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let mut inner = self.lock();
        let key = email.to_lowercase();

        if inner.accounts.contains_key(&key) {
            return Err(AuthError::EmailInUse);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakCredential);
        }

        inner.next_uid += 1;
        let uid = format!("uid-{}", inner.next_uid);
        inner.accounts.insert(
            key,
            Account {
                uid: uid.clone(),
                password: password.to_string(),
            },
        );

        let session = AuthSession {
            uid,
            email: email.to_string(),
            id_token: None,
        };
        inner.current = Some(session.clone());
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.lock().current = None;
        Ok(())
    }

    async fn delete_identity(&self) -> Result<(), AuthError> {
        let mut inner = self.lock();
        let session = inner.current.clone().ok_or(AuthError::NotSignedIn)?;

        if inner.recent_login_required {
            return Err(AuthError::RequiresRecentLogin);
        }

        inner.accounts.retain(|_, account| account.uid != session.uid);
        inner.current = None;
        Ok(())
    }

    fn current(&self) -> Option<AuthSession> {
        self.lock().current.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let auth = MemoryAuth::new();
        let created = auth.sign_up("mira@example.com", "secret1").await.unwrap();
        auth.sign_out().await.unwrap();
        assert!(auth.current().is_none());

        let session = auth.sign_in("Mira@example.com", "secret1").await.unwrap();
        assert_eq!(session.uid, created.uid);
        assert_eq!(auth.current(), Some(session));
    }

    #[tokio::test]
    async fn test_sign_in_failures() {
        let auth = MemoryAuth::new();
        auth.sign_up("mira@example.com", "secret1").await.unwrap();

        assert_eq!(
            auth.sign_in("nobody@example.com", "secret1").await,
            Err(AuthError::UserNotFound)
        );
        assert_eq!(
            auth.sign_in("mira@example.com", "wrong!!").await,
            Err(AuthError::WrongCredential)
        );
    }

    #[tokio::test]
    async fn test_sign_up_failures() {
        let auth = MemoryAuth::new();
        auth.sign_up("mira@example.com", "secret1").await.unwrap();

        assert_eq!(
            auth.sign_up("mira@example.com", "secret2").await,
            Err(AuthError::EmailInUse)
        );
        assert_eq!(
            auth.sign_up("new@example.com", "123").await,
            Err(AuthError::WeakCredential)
        );
    }

    #[tokio::test]
    async fn test_delete_requires_recent_login() {
        let auth = MemoryAuth::new();
        auth.sign_up("mira@example.com", "secret1").await.unwrap();
        auth.require_recent_login(true);

        assert_eq!(auth.delete_identity().await, Err(AuthError::RequiresRecentLogin));
        assert!(auth.has_account("mira@example.com"));

        auth.require_recent_login(false);
        auth.delete_identity().await.unwrap();
        assert!(!auth.has_account("mira@example.com"));
        assert!(auth.current().is_none());
    }
}
