use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chorus_model::{
    AppSettings, Collection, DocPath, GlobalAnnouncement, LuckyBag, Room, RoomDraft, Seat, User,
};
use chorus_presence::{PresenceError, View, mutation, social, top_contributors};
use chrono::Utc;
use tokio::sync::{mpsc, watch};

use crate::auth::AuthService;
use crate::config::{ClientConfig, RoomKeys};
use crate::error::ClientError;
use crate::notice::Notice;
use crate::receiver::{Feeds, Receiver};
use crate::session::SessionStore;
use crate::state::ClientState;
use crate::store::RemoteStore;

/// Number of users shown in the contributor ranking
pub const TOP_CONTRIBUTORS: usize = 10;

/// Cloneable handle for user actions against the store.
///
/// Every action updates local state first where the outcome is echoed,
/// then issues its write. Failures are both returned and reported as an
/// error [`Notice`] through the [`Receiver`].
#[derive(Clone)]
pub struct Client {
    pub(crate) store: Arc<dyn RemoteStore>,
    pub(crate) auth: Arc<dyn AuthService>,
    pub(crate) session: Arc<dyn SessionStore>,
    pub(crate) config: Arc<ClientConfig>,
    state: Arc<RwLock<ClientState>>,
    notices: mpsc::UnboundedSender<Notice>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl Client {
    /// Subscribe to every feed and return the action handle together with
    /// the receiver that applies incoming snapshots.
    pub fn connect(
        config: ClientConfig,
        store: Arc<dyn RemoteStore>,
        auth: Arc<dyn AuthService>,
        session: Arc<dyn SessionStore>,
    ) -> Result<(Client, Receiver), ClientError> {
        let feeds = Feeds::subscribe(store.as_ref())?;
        let (notices_tx, notices_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let client = Client {
            store,
            auth,
            session,
            config: Arc::new(config),
            state: Arc::new(RwLock::new(ClientState::new())),
            notices: notices_tx,
            shutdown: Arc::new(shutdown_tx),
        };

        tracing::debug!("client connected to store feeds");
        let receiver = Receiver::new(client.clone(), feeds, notices_rx, shutdown_rx);
        Ok((client, receiver))
    }

    /// Stop the receiver loop. Subscriptions are released when the receiver
    /// is dropped.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, ClientState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, ClientState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn notify(&self, notice: Notice) {
        let _ = self.notices.send(notice);
    }

    /// Report a failed action to the user and hand the error back
    pub(crate) fn fail(&self, message: &str, err: impl Into<ClientError>) -> ClientError {
        let err = err.into();
        tracing::warn!(error = %err, "{}", message);
        self.notify(Notice::error(message));
        err
    }

    pub(crate) fn current_user(&self) -> Result<User, ClientError> {
        self.read().user.clone().ok_or(ClientError::NotSignedIn)
    }

    // === Getters ===

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn user(&self) -> Option<User> {
        self.read().user.clone()
    }

    pub fn users(&self) -> Vec<User> {
        self.read().users.clone()
    }

    pub fn rooms(&self) -> Vec<Room> {
        self.read().rooms.clone()
    }

    pub fn active_room(&self) -> Option<Room> {
        self.read().presence.active().cloned()
    }

    pub fn view(&self) -> View {
        self.read().presence.view()
    }

    pub fn is_muted(&self) -> bool {
        self.read().presence.is_muted()
    }

    pub fn is_minimized(&self) -> bool {
        self.read().presence.is_minimized()
    }

    pub fn settings(&self) -> AppSettings {
        self.read().settings.clone()
    }

    /// Lucky bag currently on display
    pub fn lucky_bag(&self) -> Option<LuckyBag> {
        self.read().broadcasts.lucky_bag(Utc::now()).cloned()
    }

    pub fn announcement(&self) -> Option<GlobalAnnouncement> {
        self.read().broadcasts.announcement(Utc::now()).cloned()
    }

    /// Richest users by wealth
    pub fn top_contributors(&self) -> Vec<User> {
        let state = self.read();
        top_contributors(&state.users, TOP_CONTRIBUTORS)
            .into_iter()
            .cloned()
            .collect()
    }

    // === Presence ===

    /// Enter `room` and count this client as a listener.
    ///
    /// The room becomes active and muted locally before the increment is
    /// sent, and stays active if the increment fails.
    pub async fn join(&self, room: &Room) -> Result<(), ClientError> {
        let user = self.current_user()?;
        if let Err(e) = mutation::ensure_can_join(&user) {
            return Err(self.fail("Your account has been banned", e));
        }

        self.write().presence.enter(mutation::joined_echo(room));
        tracing::debug!(room_id = %room.id, user_id = %user.id, "joining room");

        let path = DocPath::room(room.id.clone());
        if let Err(e) = self.store.merge(&path, mutation::join_patch()).await {
            return Err(self.fail("Could not join the room", e));
        }
        Ok(())
    }

    /// Look a room up by id with a point read and join it
    pub async fn join_by_id(&self, room_id: &str) -> Result<(), ClientError> {
        let path = DocPath::room(room_id);
        let doc = match self.store.get(&path).await {
            Ok(doc) => doc,
            Err(e) => return Err(self.fail("Could not load the room", e)),
        };

        let Some(doc) = doc else {
            tracing::debug!(room_id, "room lookup found nothing");
            self.notify(Notice::error("This room no longer exists"));
            return Err(ClientError::RoomNotFound(room_id.to_string()));
        };

        let room: Room = doc
            .decode()
            .map_err(|e| self.fail("Could not load the room", e))?;
        self.join(&room).await?;
        self.write().broadcasts.dismiss_lucky_bag();
        Ok(())
    }

    /// Give up the active room: the user's seat is dropped and the listener
    /// count decremented in one write.
    ///
    /// Local presence is cleared before the write and stays cleared if the
    /// write fails.
    pub async fn leave(&self) -> Result<(), ClientError> {
        let user = self.current_user()?;
        let exited = self.write().presence.exit();
        let Some(room) = exited else {
            return Err(PresenceError::NotInRoom.into());
        };

        let patch = mutation::leave_patch(&room, &user.id)?;
        tracing::debug!(room_id = %room.id, user_id = %user.id, "leaving room");

        if let Err(e) = self.store.merge(&DocPath::room(room.id.clone()), patch).await {
            return Err(self.fail("Could not leave the room", e));
        }
        Ok(())
    }

    pub fn minimize(&self) -> bool {
        self.write().presence.minimize()
    }

    pub fn expand(&self) -> bool {
        self.write().presence.expand()
    }

    /// Flip the microphone and return whether it is now muted
    pub fn toggle_mute(&self) -> bool {
        self.write().presence.toggle_mute()
    }

    // === Seats ===

    pub async fn take_seat(&self, index: usize) -> Result<(), ClientError> {
        let user = self.current_user()?;
        let room = self.active()?;
        let seats = mutation::take_seat(&room, &user, index)?;
        self.write_seats(&room, seats).await
    }

    pub async fn leave_seat(&self) -> Result<(), ClientError> {
        let user = self.current_user()?;
        let room = self.active()?;
        let seats = mutation::leave_seat(&room, &user.id)?;
        self.write_seats(&room, seats).await
    }

    fn active(&self) -> Result<Room, ClientError> {
        let active = self.read().presence.active().cloned();
        active.ok_or(ClientError::Presence(PresenceError::NotInRoom))
    }

    async fn write_seats(&self, room: &Room, seats: Vec<Seat>) -> Result<(), ClientError> {
        let patch = mutation::seats_patch(&seats)?;
        self.write()
            .presence
            .echo(mutation::seated_echo(room, seats));

        if let Err(e) = self.store.merge(&DocPath::room(room.id.clone()), patch).await {
            return Err(self.fail("Could not update the seats", e));
        }
        Ok(())
    }

    // === Social ===

    /// Follow `target_id`, or unfollow if already following. Returns whether
    /// the user follows the target afterwards.
    ///
    /// The actor and target records are written one after the other; the
    /// target write is skipped if the actor write fails, and a failed target
    /// write is not undone.
    pub async fn toggle_follow(&self, target_id: &str) -> Result<bool, ClientError> {
        let user = self.current_user()?;
        let plan = social::follow_toggle(&user, target_id)?;
        let (actor_path, actor_patch) = &plan.actor;
        let (target_path, target_patch) = &plan.target;

        if let Err(e) = self.store.merge(actor_path, actor_patch.clone()).await {
            return Err(self.fail("Could not update follow", e));
        }
        self.write()
            .echo_user(actor_patch, Utc::now().timestamp_millis())?;

        if let Err(e) = self.store.merge(target_path, target_patch.clone()).await {
            tracing::warn!(
                user_id = %user.id,
                target_id,
                "follower count not updated after follow marker changed"
            );
            return Err(self.fail("Could not update follow", e));
        }

        if plan.now_following {
            self.notify(Notice::success("Followed"));
        } else {
            self.notify(Notice::info("Unfollowed"));
        }
        Ok(plan.now_following)
    }

    // === Rooms ===

    /// Open a new room hosted by the signed-in user and return its id
    pub async fn create_room(&self, draft: &RoomDraft) -> Result<String, ClientError> {
        let user = self.current_user()?;
        if draft.title.trim().is_empty() {
            self.notify(Notice::error("Please give the room a title"));
            return Err(ClientError::Validation("room title is required".to_string()));
        }

        let room_id = match self.config.room_keys {
            RoomKeys::CustomId => self.create_keyed_room(draft, &user).await?,
            RoomKeys::Generated => {
                let doc = mutation::new_room(draft, &user, None)?;
                match self.store.add(Collection::Rooms, doc).await {
                    Ok(id) => id,
                    Err(e) => return Err(self.fail("Could not create the room", e)),
                }
            }
        };

        tracing::info!(room_id = %room_id, host_id = %user.id, "room created");
        self.notify(Notice::success(format!("Your room is live with ID {room_id}")));
        Ok(room_id)
    }

    /// Rooms keyed by the host's custom id. A key held by another host's
    /// room is refused instead of overwritten.
    async fn create_keyed_room(&self, draft: &RoomDraft, host: &User) -> Result<String, ClientError> {
        let Some(custom_id) = host.custom_id else {
            self.notify(Notice::error("You need a custom ID to open a room"));
            return Err(ClientError::Validation("host has no custom ID".to_string()));
        };

        let room_id = custom_id.to_string();
        let path = DocPath::room(room_id.clone());

        let existing = match self.store.get(&path).await {
            Ok(existing) => existing,
            Err(e) => return Err(self.fail("Could not create the room", e)),
        };
        if let Some(doc) = existing
            && doc.field("hostId").and_then(|v| v.as_str()) != Some(host.id.as_str())
        {
            tracing::warn!(room_id = %room_id, host_id = %host.id, "room key held by another host");
            self.notify(Notice::error("That room ID is already in use"));
            return Err(ClientError::RoomIdTaken(room_id));
        }

        let doc = mutation::new_room(draft, host, Some(&room_id))?;
        if let Err(e) = self.store.set(&path, doc).await {
            return Err(self.fail("Could not create the room", e));
        }
        Ok(room_id)
    }

    /// Show a banner for a moment on this client
    pub fn announce(&self, message: impl Into<String>) -> Result<(), ClientError> {
        let user = self.current_user()?;
        let now = Utc::now();

        let mut state = self.write();
        let room_id = state.presence.active_id().map(str::to_string);
        state.broadcasts.announce(
            GlobalAnnouncement {
                id: format!("ann-{}", now.timestamp_millis()),
                sender_name: user.display_name().to_string(),
                message: message.into(),
                room_id,
                created_at: Some(now.timestamp_millis()),
            },
            now,
        );
        Ok(())
    }
}
