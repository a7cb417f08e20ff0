//! Async client for Chorus voice rooms.
//!
//! [`Client::connect`] subscribes to the room, user, settings and lucky bag
//! feeds of a [`RemoteStore`] and returns a cloneable [`Client`] for actions
//! plus a [`Receiver`] that folds every incoming snapshot into local state
//! and calls a [`Handler`].
//!
//! ```ignore
//! let (client, mut receiver) = Client::connect(config, store, auth, session)?;
//! client.resume().await?;
//!
//! tokio::spawn(async move { receiver.run(&mut MyView::default()).await });
//!
//! client.join_by_id("48213").await?;
//! client.toggle_mute();
//! client.leave().await?;
//! ```

mod account;
pub mod auth;
pub mod config;
mod error;
mod handle;
mod handler;
pub mod install;
pub mod memory;
mod notice;
mod receiver;
pub mod session;
mod state;
pub mod store;


pub use account::Deletion;
pub use auth::{AuthError, AuthService, AuthSession, IdentityToolkit, MemoryAuth};
pub use config::{ClientConfig, ConfigError, RoomKeys};
pub use error::ClientError;
pub use handle::{Client, TOP_CONTRIBUTORS};
pub use handler::Handler;
pub use install::{InstallOutcome, InstallPrompt};
pub use memory::MemoryStore;
pub use notice::{Notice, NoticeKind};
pub use receiver::Receiver;
pub use session::{FileSession, MemorySession, SessionError, SessionStore};
pub use store::{RemoteStore, StoreError, Subscription};

pub use chorus_model as model;
pub use chorus_presence::View;
