//! The remote document store the client talks to.

use async_trait::async_trait;
use chorus_model::{Collection, DocPath, Document, ModelError, Patch, Snapshot, Watch};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Permission denied for {0}")]
    PermissionDenied(DocPath),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Point reads, merge-writes and push subscriptions against a shared
/// document database.
///
/// Every client writes directly with no locking; concurrent writes to the
/// same document are last-write-wins except for the atomic field
/// operations inside a [`Patch`].
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Read one document
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError>;

    /// Replace a document with the result of applying `doc` to an empty one
    async fn set(&self, path: &DocPath, doc: Patch) -> Result<(), StoreError>;

    /// Apply `patch` to a document, creating it if missing
    async fn merge(&self, path: &DocPath, patch: Patch) -> Result<(), StoreError>;

    async fn delete(&self, path: &DocPath) -> Result<(), StoreError>;

    /// Create a document under a store-generated id and return the id
    async fn add(&self, collection: Collection, doc: Patch) -> Result<String, StoreError>;

    /// Watch a document or query. The current result is delivered first,
    /// then a full snapshot after every change.
    fn subscribe(&self, watch: Watch) -> Result<Subscription, StoreError>;
}

/// Handle to a live subscription. Dropping it unsubscribes.
pub struct Subscription {
    watch: Watch,
    snapshots: mpsc::UnboundedReceiver<Snapshot>,
    on_cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new(
        watch: Watch,
        snapshots: mpsc::UnboundedReceiver<Snapshot>,
        on_cancel: impl FnOnce() + Send + Sync + 'static,
    ) -> Self {
        Self {
            watch,
            snapshots,
            on_cancel: Some(Box::new(on_cancel)),
        }
    }

    pub fn watch(&self) -> &Watch {
        &self.watch
    }

    /// Wait for the next snapshot. `None` once the store stops delivering.
    pub async fn next(&mut self) -> Option<Snapshot> {
        self.snapshots.recv().await
    }

    /// Most recent queued snapshot, skipping older ones. Each snapshot
    /// fully replaces the last, so intermediate ones carry nothing extra.
    pub fn latest(&mut self) -> Option<Snapshot> {
        let mut latest = None;
        while let Ok(snapshot) = self.snapshots.try_recv() {
            latest = Some(snapshot);
        }
        latest
    }

    /// Stop receiving snapshots
    pub fn cancel(mut self) {
        self.unsubscribe();
    }

    fn unsubscribe(&mut self) {
        if let Some(on_cancel) = self.on_cancel.take() {
            on_cancel();
        }
        self.snapshots.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("watch", &self.watch)
            .field("active", &self.on_cancel.is_some())
            .finish()
    }
}
