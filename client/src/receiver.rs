use chorus_model::{
    Collection, DocPath, Direction, LuckyBag, Query, Room, Snapshot, User, Watch,
};
use chorus_presence::Reconciliation;
use chrono::Utc;
use tokio::sync::{mpsc, watch};

use crate::handle::Client;
use crate::handler::Handler;
use crate::notice::Notice;
use crate::store::{RemoteStore, StoreError, Subscription};

/// Settings documents the client caches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SettingsDoc {
    Global,
    Gifts,
    Store,
    Vip,
}

impl SettingsDoc {
    const ALL: [SettingsDoc; 4] = [
        SettingsDoc::Global,
        SettingsDoc::Gifts,
        SettingsDoc::Store,
        SettingsDoc::Vip,
    ];

    fn name(self) -> &'static str {
        match self {
            SettingsDoc::Global => "global",
            SettingsDoc::Gifts => "gifts",
            SettingsDoc::Store => "store",
            SettingsDoc::Vip => "vip",
        }
    }
}

/// The live subscriptions a client keeps open
pub(crate) struct Feeds {
    rooms: Subscription,
    users: Subscription,
    settings: Vec<(SettingsDoc, Subscription)>,
    lucky_bags: Subscription,
}

impl Feeds {
    pub(crate) fn subscribe(store: &dyn RemoteStore) -> Result<Self, StoreError> {
        let rooms = Query::collection(Collection::Rooms).order_by("listeners", Direction::Descending);
        let lucky_bags = Query::collection(Collection::LuckyBags)
            .order_by("createdAt", Direction::Descending)
            .limit(1);

        let settings = SettingsDoc::ALL
            .into_iter()
            .map(|doc| {
                let watch = Watch::Doc(DocPath::settings(doc.name()));
                store.subscribe(watch).map(|sub| (doc, sub))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            rooms: store.subscribe(Watch::Query(rooms))?,
            users: store.subscribe(Watch::Query(Query::collection(Collection::Users)))?,
            settings,
            lucky_bags: store.subscribe(Watch::Query(lucky_bags))?,
        })
    }
}

/// One unit of work for the dispatcher
enum Event {
    Rooms(Snapshot),
    Users(Snapshot),
    Settings(SettingsDoc, Snapshot),
    LuckyBag(Snapshot),
    Notice(Notice),
}

/// Applies store snapshots to the client's state and dispatches the
/// results, along with client notices, to a handler.
pub struct Receiver {
    client: Client,
    feeds: Feeds,
    notices: mpsc::UnboundedReceiver<Notice>,
    shutdown: watch::Receiver<bool>,
}

/// Next snapshot from any of the settings subscriptions
async fn next_settings(settings: &mut [(SettingsDoc, Subscription)]) -> Option<(SettingsDoc, Snapshot)> {
    let [
        (global_doc, global),
        (gifts_doc, gifts),
        (store_doc, store),
        (vip_doc, vip),
    ] = settings
    else {
        return None;
    };

    tokio::select! {
        Some(snapshot) = global.next() => Some((*global_doc, snapshot)),
        Some(snapshot) = gifts.next() => Some((*gifts_doc, snapshot)),
        Some(snapshot) = store.next() => Some((*store_doc, snapshot)),
        Some(snapshot) = vip.next() => Some((*vip_doc, snapshot)),
        else => None,
    }
}

impl Receiver {
    pub(crate) fn new(
        client: Client,
        feeds: Feeds,
        notices: mpsc::UnboundedReceiver<Notice>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            client,
            feeds,
            notices,
            shutdown,
        }
    }

    /// Handle for issuing actions alongside this receiver
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Run the event loop, dispatching events to the handler.
    ///
    /// This will run until [`Client::shutdown`] is called or every feed has
    /// closed.
    pub async fn run<H: Handler>(&mut self, handler: &mut H) {
        loop {
            if *self.shutdown.borrow() {
                break;
            }

            let event = tokio::select! {
                biased;
                _ = self.shutdown.changed() => break,
                Some(notice) = self.notices.recv() => Event::Notice(notice),
                Some(snapshot) = self.feeds.rooms.next() => Event::Rooms(snapshot),
                Some(snapshot) = self.feeds.users.next() => Event::Users(snapshot),
                Some((doc, snapshot)) = next_settings(&mut self.feeds.settings) => {
                    Event::Settings(doc, snapshot)
                }
                Some(snapshot) = self.feeds.lucky_bags.next() => Event::LuckyBag(snapshot),
                else => break,
            };

            self.dispatch(handler, event).await;
        }

        tracing::debug!("receiver stopped");
    }

    /// Process everything already queued without waiting, and return the
    /// number of events dispatched.
    ///
    /// Only the newest snapshot of each feed is applied since each one fully
    /// replaces the last. Notices raised while dispatching are included.
    pub async fn drain<H: Handler>(&mut self, handler: &mut H) -> usize {
        let mut events = Vec::new();

        if let Some(snapshot) = self.feeds.rooms.latest() {
            events.push(Event::Rooms(snapshot));
        }
        if let Some(snapshot) = self.feeds.users.latest() {
            events.push(Event::Users(snapshot));
        }
        for (doc, sub) in &mut self.feeds.settings {
            if let Some(snapshot) = sub.latest() {
                events.push(Event::Settings(*doc, snapshot));
            }
        }
        if let Some(snapshot) = self.feeds.lucky_bags.latest() {
            events.push(Event::LuckyBag(snapshot));
        }

        let mut count = events.len();
        for event in events {
            self.dispatch(handler, event).await;
        }

        while let Ok(notice) = self.notices.try_recv() {
            handler.on_notice(&notice).await;
            count += 1;
        }
        count
    }

    async fn dispatch<H: Handler>(&self, handler: &mut H, event: Event) {
        match event {
            Event::Rooms(snapshot) => self.apply_rooms(handler, snapshot).await,
            Event::Users(snapshot) => self.apply_users(handler, snapshot).await,
            Event::Settings(doc, snapshot) => {
                let settings = {
                    let mut state = self.client.write();
                    let latest = snapshot.first();
                    match doc {
                        SettingsDoc::Global => state.settings.apply_global(latest),
                        SettingsDoc::Gifts => state.settings.apply_gifts(latest),
                        SettingsDoc::Store => state.settings.apply_store(latest),
                        SettingsDoc::Vip => state.settings.apply_vip(latest),
                    }
                    state.settings.clone()
                };
                handler.on_settings(&settings).await;
            }
            Event::LuckyBag(snapshot) => self.apply_lucky_bag(handler, snapshot).await,
            Event::Notice(notice) => handler.on_notice(&notice).await,
        }
    }

    /// Replace the room list and reconcile the active room against it.
    /// Whether the active room still exists is decided from the snapshot's
    /// document ids, not from what decoded.
    async fn apply_rooms<H: Handler>(&self, handler: &mut H, snapshot: Snapshot) {
        let rooms: Vec<Room> = decode_valid(&snapshot);
        let listed = snapshot.ids();

        let (outcome, active) = {
            let mut state = self.client.write();
            state.rooms = rooms.clone();
            let outcome = state.presence.reconcile(&rooms, &listed);
            (outcome, state.presence.active().cloned())
        };

        match outcome {
            Reconciliation::Evicted(room) => {
                tracing::info!(room_id = %room.id, "active room is gone");
                handler.on_evicted(&room).await;
            }
            Reconciliation::Refreshed => {
                if let Some(room) = active {
                    handler.on_room_update(&room).await;
                }
            }
            Reconciliation::Unreadable => {
                if let Some(room) = active {
                    tracing::warn!(room_id = %room.id, "active room unreadable, keeping last copy");
                }
            }
            Reconciliation::Idle => {}
        }

        handler.on_rooms(&rooms).await;
    }

    /// Replace the user list. The signed-in user's record replaces the local
    /// copy, unless it is now banned, in which case the user is signed out.
    async fn apply_users<H: Handler>(&self, handler: &mut H, snapshot: Snapshot) {
        let users: Vec<User> = decode_valid(&snapshot);

        let current = {
            let mut state = self.client.write();
            state.users = users.clone();
            let current_id = state.user.as_ref().map(|user| user.id.clone());
            let current = current_id.and_then(|id| users.iter().find(|user| user.id == id).cloned());

            if let Some(user) = &current
                && !user.is_banned
            {
                state.user = Some(user.clone());
            }
            current
        };

        handler.on_users(&users).await;

        let Some(user) = current else { return };
        if !user.is_banned {
            handler.on_user(&user).await;
            return;
        }

        tracing::warn!(user_id = %user.id, "signed-in user is banned");
        self.client
            .notify(Notice::error("Your account has been banned by the administrators"));
        if let Err(e) = self.client.sign_out().await {
            tracing::error!(user_id = %user.id, error = %e, "could not sign out banned user");
        }
        handler.on_banned(&user).await;
    }

    async fn apply_lucky_bag<H: Handler>(&self, handler: &mut H, snapshot: Snapshot) {
        let Some(doc) = snapshot.first() else { return };
        let bag: LuckyBag = match doc.decode() {
            Ok(bag) => bag,
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed lucky bag");
                return;
            }
        };

        let shown = self
            .client
            .write()
            .broadcasts
            .offer_lucky_bag(bag.clone(), Utc::now());
        if shown {
            tracing::debug!(bag_id = %bag.id, room_id = %bag.room_id, "showing lucky bag");
            handler.on_lucky_bag(&bag).await;
        }
    }
}

/// Decode every document, skipping malformed ones
fn decode_valid<T: serde::de::DeserializeOwned>(snapshot: &Snapshot) -> Vec<T> {
    snapshot
        .decode_each()
        .filter_map(|result| match result {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed document");
                None
            }
        })
        .collect()
}
