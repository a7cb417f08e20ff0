use chorus_model::{AppSettings, Document, ModelError, Patch, Room, User};
use chorus_presence::{Broadcasts, PresenceState};
use serde_json::Value;

use crate::install::InstallState;

/// Everything the client holds locally. All of it is a cache of the remote
/// store except the presence flags and the install prompt.
#[derive(Default)]
pub(crate) struct ClientState {
    pub user: Option<User>,
    pub users: Vec<User>,
    pub rooms: Vec<Room>,
    pub settings: AppSettings,
    pub presence: PresenceState,
    pub broadcasts: Broadcasts,
    pub install: InstallState,
}

impl ClientState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a profile patch to the local user as the store would
    pub fn echo_user(&mut self, patch: &Patch, now_millis: i64) -> Result<(), ModelError> {
        let Some(user) = &self.user else {
            return Ok(());
        };

        let Value::Object(mut data) = serde_json::to_value(user)? else {
            return Err(ModelError::NotAnObject);
        };
        patch.apply(&mut data, now_millis);

        let updated = Document::new(user.id.clone(), data).decode()?;
        self.user = Some(updated);
        Ok(())
    }
}
