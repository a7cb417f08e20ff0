//! Document-store vocabulary: paths, documents, snapshots and watches.

use std::cmp::Ordering;
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::ModelError;

/// Collections the client reads and writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Users,
    Rooms,
    LuckyBags,
    AppSettings,
}

impl Collection {
    /// Parse from the store's collection name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "users" => Some(Collection::Users),
            "rooms" => Some(Collection::Rooms),
            "lucky_bags" => Some(Collection::LuckyBags),
            "appSettings" => Some(Collection::AppSettings),
            _ => None,
        }
    }

    /// Name used by the store
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Rooms => "rooms",
            Collection::LuckyBags => "lucky_bags",
            Collection::AppSettings => "appSettings",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Path of a single document: `collection/id`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocPath {
    pub collection: Collection,
    pub id: String,
}

impl DocPath {
    pub fn new(collection: Collection, id: impl Into<String>) -> Self {
        Self {
            collection,
            id: id.into(),
        }
    }

    pub fn user(id: impl Into<String>) -> Self {
        Self::new(Collection::Users, id)
    }

    pub fn room(id: impl Into<String>) -> Self {
        Self::new(Collection::Rooms, id)
    }

    /// One of the singleton `appSettings` documents (`global`, `gifts`, `store`, `vip`)
    pub fn settings(name: &str) -> Self {
        Self::new(Collection::AppSettings, name)
    }

    /// Parse `collection/id`
    pub fn parse(path: &str) -> Result<Self, ModelError> {
        let (collection, id) = path
            .split_once('/')
            .ok_or_else(|| ModelError::InvalidPath(path.to_string()))?;

        let collection =
            Collection::from_name(collection).ok_or_else(|| ModelError::InvalidPath(path.to_string()))?;

        if id.is_empty() || id.contains('/') {
            return Err(ModelError::InvalidPath(path.to_string()));
        }

        Ok(Self::new(collection, id))
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// A document as returned by the store
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    /// Look up a possibly nested field by dotted path (`stats.followers`)
    pub fn field(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.data.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Decode into a typed record. The document id is injected as `id`,
    /// overriding any stored `id` field.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ModelError> {
        let mut data = self.data.clone();
        data.insert("id".to_string(), Value::String(self.id.clone()));

        serde_json::from_value(Value::Object(data)).map_err(|source| ModelError::Decode {
            path: self.id.clone(),
            source,
        })
    }
}

/// Full result set delivered by a subscription. Always a complete
/// replacement for the watched target, never a diff.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub docs: Vec<Document>,
}

impl Snapshot {
    pub fn new(docs: Vec<Document>) -> Self {
        Self { docs }
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn first(&self) -> Option<&Document> {
        self.docs.first()
    }

    /// Ids of every document in the result, readable or not
    pub fn ids(&self) -> Vec<&str> {
        self.docs.iter().map(|doc| doc.id.as_str()).collect()
    }

    /// Decode each document independently so a single malformed record
    /// doesn't hide the rest
    pub fn decode_each<'a, T: DeserializeOwned + 'a>(
        &'a self,
    ) -> impl Iterator<Item = Result<T, ModelError>> + 'a {
        self.docs.iter().map(Document::decode)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Collection query with optional ordering and limit
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: Collection,
    pub order_by: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn collection(collection: Collection) -> Self {
        Self {
            collection,
            order_by: None,
            limit: None,
        }
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Evaluate against every document of the collection.
    ///
    /// Documents without the ordering field are excluded, as a store index
    /// would. Ties are broken by document id.
    pub fn evaluate(&self, docs: impl IntoIterator<Item = Document>) -> Vec<Document> {
        let mut docs: Vec<Document> = docs.into_iter().collect();

        if let Some((field, direction)) = &self.order_by {
            docs.retain(|doc| doc.field(field).is_some_and(|v| !v.is_null()));
            docs.sort_by(|a, b| {
                let ordering = compare_values(a.field(field), b.field(field));
                let ordering = match direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                };
                ordering.then_with(|| a.id.cmp(&b.id))
            });
        } else {
            docs.sort_by(|a, b| a.id.cmp(&b.id));
        }

        if let Some(limit) = self.limit {
            docs.truncate(limit);
        }

        docs
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            let a = a.as_f64().unwrap_or_default();
            let b = b.as_f64().unwrap_or_default();
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

/// What a subscription is attached to
#[derive(Debug, Clone, PartialEq)]
pub enum Watch {
    Doc(DocPath),
    Query(Query),
}

impl Watch {
    /// Whether a write to `path` can change this watch's result
    pub fn covers(&self, path: &DocPath) -> bool {
        match self {
            Watch::Doc(watched) => watched == path,
            Watch::Query(query) => query.collection == path.collection,
        }
    }
}
