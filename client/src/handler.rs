use async_trait::async_trait;
use chorus_model::{AppSettings, LuckyBag, Room, User};

use crate::notice::Notice;

/// Trait for reacting to store snapshots and client notices.
///
/// Implement this trait to drive a view from the [`Receiver`](crate::Receiver).
/// All methods have default no-op implementations, so you only need to
/// implement the events you care about. Local state has already been updated
/// when a method is called.
///
/// # Example
///
/// ```ignore
/// struct Toasts;
///
/// #[async_trait]
/// impl Handler for Toasts {
///     async fn on_notice(&mut self, notice: &Notice) {
///         println!("{notice}");
///     }
/// }
/// ```
#[async_trait]
pub trait Handler: Send {
    /// Called for every user-facing outcome, in the order produced
    async fn on_notice(&mut self, notice: &Notice) {
        let _ = notice;
    }

    /// Called with the full room list after every rooms snapshot
    async fn on_rooms(&mut self, rooms: &[Room]) {
        let _ = rooms;
    }

    /// Called when the active room was replaced by its latest copy
    async fn on_room_update(&mut self, room: &Room) {
        let _ = room;
    }

    /// Called when the active room disappeared from the room list and the
    /// client left it
    async fn on_evicted(&mut self, room: &Room) {
        let _ = room;
    }

    async fn on_users(&mut self, users: &[User]) {
        let _ = users;
    }

    /// Called when the signed-in user's record changed
    async fn on_user(&mut self, user: &User) {
        let _ = user;
    }

    /// Called after the signed-in user was found banned and signed out
    async fn on_banned(&mut self, user: &User) {
        let _ = user;
    }

    async fn on_settings(&mut self, settings: &AppSettings) {
        let _ = settings;
    }

    /// Called when a fresh lucky bag starts showing
    async fn on_lucky_bag(&mut self, bag: &LuckyBag) {
        let _ = bag;
    }
}
