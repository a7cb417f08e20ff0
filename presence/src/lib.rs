//! Room presence tracking for the Chorus client.
//!
//! This crate holds the pure part of the client: which room the user is in,
//! how that view is shown, and how each user action turns into a store write.
//! Nothing here performs I/O.
//!
//! # Overview
//!
//! ```text
//! chorus-model (documents, patches)
//!        │
//!        ▼
//! chorus-presence (state + mutation planning) ← THIS CRATE
//!        │
//!        ▼
//! chorus-client (store/auth collaborators, event loop)
//! ```
//!
//! # Main Types
//!
//! - [`PresenceState`] - the active room plus minimized/muted flags, changed
//!   only through named transitions
//! - [`Reconciliation`] - outcome of folding a room-list snapshot into the state
//! - [`FollowPlan`] - the two independent writes behind a follow toggle
//! - [`Broadcasts`] - lucky bag and announcement display windows
//!
//! Mutations are planned by the functions in [`mutation`], [`social`] and
//! [`economy`], each returning the [`Patch`](chorus_model::Patch) to send.
//!
//! # Example Usage
//!
//! ```ignore
//! use chorus_presence::{PresenceState, Reconciliation, mutation};
//!
//! let mut presence = PresenceState::new();
//! presence.enter(mutation::joined_echo(&room));
//! let write = mutation::join_patch();
//!
//! // later, with a fresh room list
//! if let Reconciliation::Evicted(room) = presence.reconcile(&rooms, &snapshot.ids()) {
//!     println!("{} is gone", room.title);
//! }
//! ```

use chorus_model::ModelError;
use thiserror::Error;

pub mod broadcast;
pub mod economy;
pub mod mutation;
pub mod ranking;
pub mod social;
pub mod state;

pub use broadcast::Broadcasts;
pub use ranking::top_contributors;
pub use social::FollowPlan;
pub use state::{PresenceState, Reconciliation, View};

/// Rejections raised before anything is sent to the store
#[derive(Error, Debug)]
pub enum PresenceError {
    #[error("Account is banned")]
    Banned,

    #[error("Not in a room")]
    NotInRoom,

    #[error("Seat {index} is outside the room's {capacity} seats")]
    SeatOutOfRange { index: usize, capacity: usize },

    #[error("Seat {0} is already taken")]
    SeatTaken(usize),

    #[error("Not seated")]
    NotSeated,

    #[error("Cannot follow yourself")]
    SelfFollow,

    #[error("Not enough coins: need {needed}, have {available}")]
    InsufficientCoins { needed: i64, available: i64 },

    #[error("Item already owned: {0}")]
    AlreadyOwned(String),

    #[error("Item not owned: {0}")]
    NotOwned(String),

    #[error(transparent)]
    Model(#[from] ModelError),
}
