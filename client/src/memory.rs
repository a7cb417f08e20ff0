//! In-process [`RemoteStore`] with push subscriptions.
//!
//! Used by tests and demos. Records every write request and can be told to
//! fail writes to chosen documents.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chorus_model::{Collection, DocPath, Document, Patch, Snapshot, Watch};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::store::{RemoteStore, StoreError, Subscription};

const GENERATED_ID_LEN: usize = 20;

/// Kind of write request sent to the store
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Set(Patch),
    Merge(Patch),
    Delete,
}

/// One write request as received, whether or not it was applied
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRecord {
    pub path: DocPath,
    pub op: WriteOp,
    pub failed: bool,
}

impl WriteRecord {
    /// The patch carried by a set or merge
    pub fn patch(&self) -> Option<&Patch> {
        match &self.op {
            WriteOp::Set(patch) | WriteOp::Merge(patch) => Some(patch),
            WriteOp::Delete => None,
        }
    }
}

struct Listener {
    watch: Watch,
    tx: mpsc::UnboundedSender<Snapshot>,
}

#[derive(Default)]
struct Inner {
    docs: BTreeMap<Collection, BTreeMap<String, Map<String, Value>>>,
    listeners: HashMap<u64, Listener>,
    next_listener: u64,
    writes: Vec<WriteRecord>,
    failing: HashSet<DocPath>,
    offline: bool,
    clock: Option<i64>,
}

impl Inner {
    fn now_millis(&self) -> i64 {
        self.clock
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis())
    }

    fn document(&self, path: &DocPath) -> Option<Document> {
        self.docs
            .get(&path.collection)?
            .get(&path.id)
            .map(|data| Document::new(path.id.clone(), data.clone()))
    }

    fn snapshot(&self, watch: &Watch) -> Snapshot {
        match watch {
            Watch::Doc(path) => Snapshot::new(self.document(path).into_iter().collect()),
            Watch::Query(query) => {
                let docs = self
                    .docs
                    .get(&query.collection)
                    .into_iter()
                    .flatten()
                    .map(|(id, data)| Document::new(id.clone(), data.clone()));
                Snapshot::new(query.evaluate(docs))
            }
        }
    }

    /// Record a write request and decide whether it goes through
    fn admit(&mut self, path: &DocPath, op: WriteOp) -> Result<(), StoreError> {
        let failed = self.offline || self.failing.contains(path);
        self.writes.push(WriteRecord {
            path: path.clone(),
            op,
            failed,
        });

        if self.offline {
            return Err(StoreError::Unavailable("store is offline".to_string()));
        }
        if failed {
            return Err(StoreError::PermissionDenied(path.clone()));
        }
        Ok(())
    }

    fn notify(&mut self, path: &DocPath) {
        let mut closed = Vec::new();
        for (id, listener) in &self.listeners {
            if !listener.watch.covers(path) {
                continue;
            }
            if listener.tx.send(self.snapshot(&listener.watch)).is_err() {
                closed.push(*id);
            }
        }
        for id in closed {
            self.listeners.remove(&id);
        }
    }
}

/// Shared in-memory document store. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pin the clock used for server timestamps
    pub fn set_clock(&self, millis: Option<i64>) {
        self.lock().clock = millis;
    }

    /// Insert a document directly, bypassing the write log. Subscribers
    /// are notified.
    pub fn seed(&self, path: &DocPath, data: Value) {
        let mut inner = self.lock();
        let data = match data {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        inner
            .docs
            .entry(path.collection)
            .or_default()
            .insert(path.id.clone(), data);
        inner.notify(path);
    }

    /// Current contents of a document
    pub fn document(&self, path: &DocPath) -> Option<Value> {
        self.lock()
            .document(path)
            .map(|doc| Value::Object(doc.data))
    }

    /// Make every write to `path` fail until restored
    pub fn fail_writes_to(&self, path: &DocPath) {
        self.lock().failing.insert(path.clone());
    }

    pub fn restore_writes_to(&self, path: &DocPath) {
        self.lock().failing.remove(path);
    }

    /// Fail every read and write
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Every write request received so far
    pub fn writes(&self) -> Vec<WriteRecord> {
        self.lock().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.lock().writes.clear();
    }

    /// Number of live subscriptions
    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    fn generate_id() -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(GENERATED_ID_LEN)
            .map(char::from)
            .collect()
    }

    fn write_document(&self, path: &DocPath, op: WriteOp) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.admit(path, op.clone())?;

        let now = inner.now_millis();
        let collection = inner.docs.entry(path.collection).or_default();
        match op {
            WriteOp::Set(patch) => {
                let mut doc = Map::new();
                patch.apply(&mut doc, now);
                collection.insert(path.id.clone(), doc);
            }
            WriteOp::Merge(patch) => {
                let doc = collection.entry(path.id.clone()).or_default();
                patch.apply(doc, now);
            }
            WriteOp::Delete => {
                collection.remove(&path.id);
            }
        }

        inner.notify(path);
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        let inner = self.lock();
        if inner.offline {
            return Err(StoreError::Unavailable("store is offline".to_string()));
        }
        Ok(inner.document(path))
    }

    async fn set(&self, path: &DocPath, doc: Patch) -> Result<(), StoreError> {
        self.write_document(path, WriteOp::Set(doc))
    }

    async fn merge(&self, path: &DocPath, patch: Patch) -> Result<(), StoreError> {
        self.write_document(path, WriteOp::Merge(patch))
    }

    async fn delete(&self, path: &DocPath) -> Result<(), StoreError> {
        self.write_document(path, WriteOp::Delete)
    }

    async fn add(&self, collection: Collection, doc: Patch) -> Result<String, StoreError> {
        let id = Self::generate_id();
        self.write_document(&DocPath::new(collection, id.clone()), WriteOp::Set(doc))?;
        Ok(id)
    }

    fn subscribe(&self, watch: Watch) -> Result<Subscription, StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();

        let id = {
            let mut inner = self.lock();
            let id = inner.next_listener;
            inner.next_listener += 1;

            // Initial result goes out before any later change can
            let _ = tx.send(inner.snapshot(&watch));
            inner.listeners.insert(
                id,
                Listener {
                    watch: watch.clone(),
                    tx,
                },
            );
            id
        };

        let registry = Arc::downgrade(&self.inner);
        Ok(Subscription::new(watch, rx, move || {
            if let Some(inner) = registry.upgrade() {
                inner
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .listeners
                    .remove(&id);
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chorus_model::{Direction, Query};
    use serde_json::json;

    fn rooms_by_listeners() -> Watch {
        Watch::Query(Query::collection(Collection::Rooms).order_by("listeners", Direction::Descending))
    }

    #[tokio::test]
    async fn test_merge_creates_and_patches() {
        let store = MemoryStore::new();
        let path = DocPath::room("r1");

        store.merge(&path, Patch::new().set("title", "Night")).await.unwrap();
        store.merge(&path, Patch::new().increment("listeners", 2)).await.unwrap();

        assert_eq!(store.document(&path), Some(json!({ "title": "Night", "listeners": 2 })));
    }

    #[tokio::test]
    async fn test_set_replaces_document() {
        let store = MemoryStore::new();
        let path = DocPath::user("u1");
        store.seed(&path, json!({ "name": "Old", "coins": 5 }));

        store.set(&path, Patch::new().set("name", "New")).await.unwrap();

        assert_eq!(store.document(&path), Some(json!({ "name": "New" })));
    }

    #[tokio::test]
    async fn test_server_timestamp_uses_clock() {
        let store = MemoryStore::new();
        store.set_clock(Some(42));
        let path = DocPath::room("r1");

        store.set(&path, Patch::new().server_timestamp("createdAt")).await.unwrap();

        assert_eq!(store.document(&path), Some(json!({ "createdAt": 42 })));
    }

    #[tokio::test]
    async fn test_add_generates_id() {
        let store = MemoryStore::new();
        let id = store.add(Collection::Rooms, Patch::new().set("listeners", 1)).await.unwrap();

        assert_eq!(id.len(), GENERATED_ID_LEN);
        assert!(store.document(&DocPath::room(&id)).is_some());
    }

    #[tokio::test]
    async fn test_failed_write_is_recorded_but_not_applied() {
        let store = MemoryStore::new();
        let path = DocPath::room("r1");
        store.seed(&path, json!({ "listeners": 3 }));
        store.fail_writes_to(&path);

        let result = store.merge(&path, Patch::new().set("listeners", 2)).await;

        assert!(matches!(result, Err(StoreError::PermissionDenied(_))));
        assert_eq!(store.document(&path), Some(json!({ "listeners": 3 })));
        let writes = store.writes();
        assert_eq!(writes.len(), 1);
        assert!(writes[0].failed);
    }

    #[tokio::test]
    async fn test_subscription_delivers_initial_and_updates() {
        let store = MemoryStore::new();
        store.seed(&DocPath::room("a"), json!({ "listeners": 1 }));

        let mut sub = store.subscribe(rooms_by_listeners()).unwrap();
        let initial = sub.next().await.unwrap();
        assert_eq!(initial.docs.len(), 1);

        store
            .merge(&DocPath::room("b"), Patch::new().set("listeners", 5))
            .await
            .unwrap();
        let update = sub.next().await.unwrap();
        let ids: Vec<&str> = update.docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_unrelated_writes_do_not_notify() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe(Watch::Doc(DocPath::settings("gifts"))).unwrap();
        assert!(sub.latest().is_some());

        store.merge(&DocPath::user("u1"), Patch::new().set("name", "x")).await.unwrap();
        assert!(sub.latest().is_none());
    }

    #[tokio::test]
    async fn test_latest_skips_intermediate_snapshots() {
        let store = MemoryStore::new();
        let path = DocPath::settings("global");
        let mut sub = store.subscribe(Watch::Doc(path.clone())).unwrap();

        for banner in ["a", "b", "c"] {
            store.merge(&path, Patch::new().set("appBanner", banner)).await.unwrap();
        }

        let latest = sub.latest().unwrap();
        assert_eq!(latest.first().and_then(|d| d.field("appBanner")), Some(&json!("c")));
        assert!(sub.latest().is_none());
    }

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let store = MemoryStore::new();
        let sub = store.subscribe(rooms_by_listeners()).unwrap();
        let other = store.subscribe(rooms_by_listeners()).unwrap();
        assert_eq!(store.listener_count(), 2);

        drop(sub);
        assert_eq!(store.listener_count(), 1);

        other.cancel();
        assert_eq!(store.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_offline_store_rejects() {
        let store = MemoryStore::new();
        store.set_offline(true);

        assert!(store.get(&DocPath::room("a")).await.is_err());
        assert!(store.delete(&DocPath::room("a")).await.is_err());
        assert!(store.writes()[0].failed);
    }
}
