//! Session lifecycle, profile edits, purchases and moderation.

use chorus_model::{DocPath, Patch, User, UserLevel};
use chorus_presence::economy;
use chrono::Utc;
use rand::Rng;

use crate::auth::{AuthError, AuthSession};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::handle::Client;
use crate::install::{InstallOutcome, InstallPrompt};
use crate::notice::Notice;

const STARTER_COINS: i64 = 1_000;
const FALLBACK_COINS: i64 = 5_000;
const OWNER_COINS: i64 = 100_000_000;
const OWNER_SCORE: i64 = 9_999_999;
const OWNER_VIP_LEVEL: u32 = 12;
const OWNER_CUSTOM_ID: u64 = 1;

/// Outcome of [`Client::delete_account`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deletion {
    Deleted,
    /// The confirmation was declined; nothing was touched
    Cancelled,
}

fn random_custom_id() -> u64 {
    rand::thread_rng().gen_range(10_000..100_000)
}

fn avatar_for(seed: &str) -> String {
    format!("https://api.dicebear.com/7.x/avataaars/svg?seed={seed}")
}

/// Profile used when an account has no record in the store. Never written.
fn fallback_user(session: &AuthSession, config: &ClientConfig) -> User {
    let name = session
        .email
        .split('@')
        .next()
        .unwrap_or_default()
        .to_string();

    User {
        id: session.uid.clone(),
        custom_id: Some(random_custom_id()),
        name,
        avatar: avatar_for(&session.email),
        level: UserLevel::Silver,
        coins: FALLBACK_COINS,
        bio: "Welcome to Chorus".to_string(),
        is_admin: config.is_admin_email(&session.email),
        ..Default::default()
    }
}

/// Record written at sign-up. The configured admin address gets the owner
/// profile.
fn new_user(session: &AuthSession, name: &str, config: &ClientConfig) -> User {
    let user = User {
        id: session.uid.clone(),
        custom_id: Some(random_custom_id()),
        name: name.to_string(),
        avatar: avatar_for(name),
        coins: STARTER_COINS,
        bio: "New on Chorus".to_string(),
        status: Some("user".to_string()),
        ..Default::default()
    };

    if !config.is_admin_email(&session.email) {
        return user;
    }

    User {
        custom_id: Some(OWNER_CUSTOM_ID),
        level: UserLevel::Vip,
        coins: OWNER_COINS,
        wealth: OWNER_SCORE,
        charm: OWNER_SCORE,
        is_vip: true,
        vip_level: OWNER_VIP_LEVEL,
        bio: "Founder".to_string(),
        is_admin: true,
        status: Some("owner".to_string()),
        ..user
    }
}

impl Client {
    fn require(&self, fields: &[&str]) -> Result<(), ClientError> {
        if fields.iter().any(|field| field.trim().is_empty()) {
            self.notify(Notice::error("Please fill in all fields"));
            return Err(ClientError::Validation("all fields are required".to_string()));
        }
        Ok(())
    }

    fn auth_failed(&self, err: AuthError) -> ClientError {
        tracing::warn!(error = %err, "authentication failed");
        self.notify(Notice::error(err.user_message()));
        err.into()
    }

    /// Make `user` the signed-in user and persist it
    fn adopt(&self, user: User) -> Result<(), ClientError> {
        self.session.save(&user)?;
        self.write().user = Some(user);
        Ok(())
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User, ClientError> {
        self.require(&[email, password])?;

        let session = self
            .auth
            .sign_in(email.trim(), password)
            .await
            .map_err(|e| self.auth_failed(e))?;

        let user = match self.store.get(&DocPath::user(session.uid.clone())).await {
            Ok(Some(doc)) => doc
                .decode::<User>()
                .map_err(|e| self.fail("Could not load your profile", e))?,
            Ok(None) => {
                tracing::info!(user_id = %session.uid, "no stored profile, using fallback");
                fallback_user(&session, &self.config)
            }
            Err(e) => return Err(self.fail("Could not load your profile", e)),
        };

        self.adopt(user.clone())?;
        tracing::info!(user_id = %user.id, "signed in");
        Ok(user)
    }

    pub async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<User, ClientError> {
        self.require(&[email, password, name])?;

        let session = self
            .auth
            .sign_up(email.trim(), password)
            .await
            .map_err(|e| self.auth_failed(e))?;

        let user = new_user(&session, name.trim(), &self.config);
        let doc = Patch::from_fields(&user)?.server_timestamp("createdAt");

        if let Err(e) = self.store.set(&DocPath::user(user.id.clone()), doc).await {
            tracing::error!(user_id = %user.id, error = %e, "identity created without a profile");
            self.notify(Notice::error("Could not create your profile"));
            return Err(e.into());
        }

        self.adopt(user.clone())?;
        tracing::info!(user_id = %user.id, admin = user.is_admin, "signed up");
        Ok(user)
    }

    /// Restore the saved user, refreshed from the store. A saved user whose
    /// record is gone is not restored.
    pub async fn resume(&self) -> Result<Option<User>, ClientError> {
        let saved = self
            .session
            .load()
            .map_err(|e| self.fail("Could not restore your session", e))?;
        let Some(saved) = saved else {
            return Ok(None);
        };

        let doc = match self.store.get(&DocPath::user(saved.id.clone())).await {
            Ok(doc) => doc,
            Err(e) => return Err(self.fail("Could not restore your session", e)),
        };
        let Some(doc) = doc else {
            tracing::info!(user_id = %saved.id, "saved user no longer exists");
            return Ok(None);
        };

        let user: User = doc
            .decode()
            .map_err(|e| self.fail("Could not restore your session", e))?;
        self.write().user = Some(user.clone());
        tracing::info!(user_id = %user.id, "session resumed");
        Ok(Some(user))
    }

    /// Sign out and forget the user and the active room locally. The room's
    /// listener count is not touched.
    pub async fn sign_out(&self) -> Result<(), ClientError> {
        if let Err(e) = self.auth.sign_out().await {
            tracing::error!(error = %e, "sign-out failed");
            return Err(e.into());
        }

        {
            let mut state = self.write();
            state.user = None;
            state.presence.exit();
        }
        self.session.clear()?;

        tracing::info!("signed out");
        self.notify(Notice::info("Signed out"));
        Ok(())
    }

    /// Merge `patch` into the user's record, then mirror it locally and in
    /// the saved session
    pub async fn update_profile(&self, patch: Patch) -> Result<(), ClientError> {
        let user = self.current_user()?;
        self.commit_profile(&user, patch, "Could not save your profile")
            .await
    }

    async fn commit_profile(&self, user: &User, patch: Patch, failure: &str) -> Result<(), ClientError> {
        let path = DocPath::user(user.id.clone());
        tracing::debug!(user_id = %user.id, fields = patch.len(), "updating profile");

        if let Err(e) = self.store.merge(&path, patch.clone()).await {
            return Err(self.fail(failure, e));
        }

        let updated = {
            let mut state = self.write();
            state.echo_user(&patch, Utc::now().timestamp_millis())?;
            state.user.clone()
        };
        if let Some(updated) = updated {
            self.session.save(&updated)?;
        }
        Ok(())
    }

    // === Economy ===

    pub async fn buy_item(&self, item_id: &str) -> Result<(), ClientError> {
        let user = self.current_user()?;
        let item = self
            .read()
            .settings
            .store_item(item_id)
            .cloned()
            .ok_or_else(|| ClientError::Validation(format!("unknown item {item_id}")))?;

        let patch = economy::purchase_item(&user, &item).map_err(|e| self.fail("Purchase failed", e))?;
        self.commit_profile(&user, patch, "Purchase failed").await?;

        self.notify(Notice::success(format!("Purchased {}", item.name)));
        Ok(())
    }

    pub async fn buy_vip(&self, level: u32) -> Result<(), ClientError> {
        let user = self.current_user()?;
        let package = self
            .read()
            .settings
            .vip_level(level)
            .cloned()
            .ok_or_else(|| ClientError::Validation(format!("unknown VIP level {level}")))?;

        let patch = economy::purchase_vip(&user, &package).map_err(|e| self.fail("Purchase failed", e))?;
        self.commit_profile(&user, patch, "Purchase failed").await?;

        self.notify(Notice::success(format!("Welcome to {}", package.name)));
        Ok(())
    }

    pub async fn equip(&self, item_id: &str) -> Result<(), ClientError> {
        let user = self.current_user()?;
        let item = self
            .read()
            .settings
            .store_item(item_id)
            .cloned()
            .ok_or_else(|| ClientError::Validation(format!("unknown item {item_id}")))?;

        let patch = economy::equip(&user, &item)?;
        self.commit_profile(&user, patch, "Could not equip the item")
            .await
    }

    // === Account deletion ===

    /// Delete the user's record and then their identity, after `confirm`
    /// agrees.
    ///
    /// The record goes first. If the provider then refuses to delete the
    /// identity, typically because the sign-in is too old, the record is
    /// already gone while the credential still works; this is reported and
    /// left as is.
    pub async fn delete_account(&self, confirm: impl FnOnce() -> bool) -> Result<Deletion, ClientError> {
        let user = self.current_user()?;
        if !confirm() {
            return Ok(Deletion::Cancelled);
        }
        if self.auth.current().is_none() {
            return Err(ClientError::NotSignedIn);
        }

        if let Err(e) = self.store.delete(&DocPath::user(user.id.clone())).await {
            tracing::error!(user_id = %user.id, error = %e, "account deletion failed");
            self.notify(Notice::error("Could not delete the account"));
            return Err(e.into());
        }

        if let Err(e) = self.auth.delete_identity().await {
            tracing::error!(
                user_id = %user.id,
                error = %e,
                "profile deleted but identity remains"
            );
            let message = match e {
                AuthError::RequiresRecentLogin => e.user_message(),
                _ => "Could not delete the account",
            };
            self.notify(Notice::error(message));
            return Err(e.into());
        }

        {
            let mut state = self.write();
            state.user = None;
            state.presence.exit();
        }
        self.session.clear()?;

        tracing::info!(user_id = %user.id, "account deleted");
        self.notify(Notice::success("Account deleted"));
        Ok(Deletion::Deleted)
    }

    // === Moderation ===

    fn require_admin(&self) -> Result<User, ClientError> {
        let user = self.current_user()?;
        if !user.is_admin {
            self.notify(Notice::error("Admin rights required"));
            return Err(ClientError::NotAdmin);
        }
        Ok(user)
    }

    pub async fn set_banned(&self, user_id: &str, banned: bool) -> Result<(), ClientError> {
        let admin = self.require_admin()?;
        tracing::info!(admin_id = %admin.id, user_id, banned, "changing ban");

        let patch = Patch::new().set("isBanned", banned);
        if let Err(e) = self.store.merge(&DocPath::user(user_id), patch).await {
            return Err(self.fail("Could not update the user", e));
        }

        let message = if banned { "User banned" } else { "User unbanned" };
        self.notify(Notice::success(message));
        Ok(())
    }

    /// Delete a room. Clients inside it drop out on their next rooms snapshot.
    pub async fn close_room(&self, room_id: &str) -> Result<(), ClientError> {
        let admin = self.require_admin()?;
        tracing::info!(admin_id = %admin.id, room_id, "closing room");

        if let Err(e) = self.store.delete(&DocPath::room(room_id)).await {
            return Err(self.fail("Could not close the room", e));
        }
        self.notify(Notice::success("Room closed"));
        Ok(())
    }

    // === Install prompt ===

    /// Hold the platform's install prompt. Returns false if one was already
    /// offered during this client's lifetime.
    pub fn offer_install(&self, prompt: Box<dyn InstallPrompt>) -> bool {
        self.write().install.offer(prompt)
    }

    pub fn install_available(&self) -> bool {
        self.read().install.is_available()
    }

    /// Show the held prompt. The prompt is used up whatever the answer.
    pub async fn install(&self) -> Option<InstallOutcome> {
        let prompt = self.write().install.take()?;
        let outcome = prompt.prompt().await;
        tracing::info!(?outcome, "install prompt answered");
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(email: &str) -> AuthSession {
        AuthSession {
            uid: "uid-9".to_string(),
            email: email.to_string(),
            id_token: None,
        }
    }

    fn admin_config() -> ClientConfig {
        ClientConfig {
            admin_email: Some("boss@chorus.live".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_new_user_starter_profile() {
        let user = new_user(&session("mira@example.com"), "Mira", &admin_config());

        assert_eq!(user.id, "uid-9");
        assert_eq!(user.coins, STARTER_COINS);
        assert!((10_000..100_000).contains(&user.custom_id.unwrap()));
        assert!(!user.is_admin);
        assert_eq!(user.level, UserLevel::New);
    }

    #[test]
    fn test_new_user_owner_profile() {
        let user = new_user(&session("Boss@Chorus.live"), "Boss", &admin_config());

        assert!(user.is_admin);
        assert_eq!(user.custom_id, Some(OWNER_CUSTOM_ID));
        assert_eq!(user.level, UserLevel::Vip);
        assert_eq!(user.status.as_deref(), Some("owner"));
        assert_eq!(user.name, "Boss");
    }

    #[test]
    fn test_fallback_user_from_email() {
        let user = fallback_user(&session("kai.lee@example.com"), &ClientConfig::default());

        assert_eq!(user.name, "kai.lee");
        assert_eq!(user.coins, FALLBACK_COINS);
        assert_eq!(user.level, UserLevel::Silver);
        assert!(user.custom_id.is_some());
    }
}
