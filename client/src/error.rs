use chorus_model::ModelError;
use chorus_presence::PresenceError;
use thiserror::Error;

use crate::auth::AuthError;
use crate::config::ConfigError;
use crate::session::SessionError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum ClientError {
    /// Missing or malformed input, rejected before any remote call
    #[error("{0}")]
    Validation(String),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Room {0} no longer exists")]
    RoomNotFound(String),

    #[error("Room {0} is hosted by someone else")]
    RoomIdTaken(String),

    #[error("Admin rights required")]
    NotAdmin,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Presence(#[from] PresenceError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
