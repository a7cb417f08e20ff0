use thiserror::Error;

pub mod broadcast;
pub mod document;
pub mod room;
pub mod settings;
pub mod user;
pub mod write;

pub use broadcast::{GlobalAnnouncement, LuckyBag};
pub use document::{Collection, DocPath, Document, Direction, Query, Snapshot, Watch};
pub use room::{Room, RoomDraft, SEAT_CAPACITY, Seat};
pub use settings::{AppSettings, GameSettings, Gift, LuckyMultiplier, StoreItem, StoreItemKind, VipPackage};
pub use user::{User, UserLevel, UserStats, follow_marker};
pub use write::{FieldOp, Patch};

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Invalid document {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode value: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Invalid document path: {0}")]
    InvalidPath(String),

    #[error("Expected an object document")]
    NotAnObject,
}
