//! In-memory storage implementation for the record layer.
//!
//! Records are kept per collection in insertion order behind an async-aware read-write lock.
//! Optional per-collection required fields emulate the schema validation a real store would
//! perform, so batch writes can fail for individual records.

use async_trait::async_trait;
use bson::{Bson, Document};
use mea::rwlock::RwLock;
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, info};

use docrest_core::{
    backend::{Change, FindOptions, RecordBackend, RecordBackendBuilder, WriteStatus},
    error::{RecordError, RecordResult},
    predicate::Predicate,
    projection::Projection,
};

use crate::evaluator::{Comparable, DocumentEvaluator, compare_documents, lookup};

type StoreMap = HashMap<String, Vec<Document>>;

/// Thread-safe in-memory record storage backend.
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state. Multiple clones of
/// the same instance share the same underlying data.
///
/// Queries scan every record of a collection; there is no indexing.
///
/// # Example
///
/// ```ignore
/// use docrest_memory::InMemoryStore;
/// use docrest::backend::RecordBackendBuilder;
///
/// let store = InMemoryStore::builder()
///     .with_required_fields("users", ["name"])
///     .build()
///     .await?;
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryStore {
    /// collection name -> records in insertion order
    store: Arc<RwLock<StoreMap>>,
    /// collection name -> fields every record must carry
    required: Arc<HashMap<String, Vec<String>>>,
    id_field: String,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Creates a new empty store without required fields, keyed on `_id`.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
            required: Arc::new(HashMap::new()),
            id_field: "_id".to_string(),
        }
    }

    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    /// Checks a record against the required fields of its collection.
    fn validate(&self, collection: &str, record: &Document) -> Result<(), String> {
        let Some(fields) = self.required.get(collection) else {
            return Ok(());
        };

        for field in fields {
            match lookup(record, field) {
                None | Some(Bson::Null) => {
                    return Err(format!(
                        "Document failed validation: missing required field '{field}'"
                    ));
                }
                Some(_) => {}
            }
        }

        Ok(())
    }

    fn same_id(left: &Document, right: &Bson, id_field: &str) -> bool {
        left.get(id_field)
            .is_some_and(|id| Comparable::from(id) == Comparable::from(right))
    }

    /// Places a generated identifier first when the record has none.
    fn identified(&self, record: Document) -> Document {
        if record.contains_key(&self.id_field) {
            return record;
        }

        let mut identified = Document::new();
        identified.insert(self.id_field.clone(), self.generate_id());
        identified.extend(record);
        identified
    }

    /// Keeps `previous`'s identifier on a replacement body.
    fn replacement(&self, previous: &Document, body: Document) -> Document {
        let mut replacement = Document::new();
        if let Some(id) = previous.get(&self.id_field) {
            replacement.insert(self.id_field.clone(), id.clone());
        }
        replacement.extend(
            body.into_iter()
                .filter(|(key, _)| *key != self.id_field),
        );
        replacement
    }
}

/// Indexes of the records matching `filter`, in storage order.
fn matching(records: &[Document], filter: &Predicate) -> RecordResult<Vec<usize>> {
    let mut evaluator = DocumentEvaluator::new();
    let mut indexes = Vec::new();

    for (index, record) in records.iter().enumerate() {
        if evaluator.matches(record, filter)? {
            indexes.push(index);
        }
    }

    Ok(indexes)
}

/// Sets a possibly dotted field path, creating intermediate documents as needed.
fn set_path(record: &mut Document, path: &str, value: Bson) {
    match path.split_once('.') {
        None => {
            record.insert(path, value);
        }
        Some((head, rest)) => {
            if !matches!(record.get(head), Some(Bson::Document(_))) {
                record.insert(head, Document::new());
            }
            if let Some(Bson::Document(nested)) = record.get_mut(head) {
                set_path(nested, rest, value);
            }
        }
    }
}

fn merge(record: &mut Document, patch: Document) {
    for (path, value) in patch {
        set_path(record, &path, value);
    }
}

#[async_trait]
impl RecordBackend for InMemoryStore {
    fn id_field(&self) -> &str {
        &self.id_field
    }

    async fn insert_records(
        &self,
        collection: &str,
        records: Vec<Document>,
        ordered: bool,
    ) -> RecordResult<Vec<WriteStatus>> {
        let mut store = self.store.write().await;
        let stored = store.entry(collection.to_string()).or_default();

        let mut statuses = Vec::with_capacity(records.len());
        let mut failed = false;

        for record in records {
            if ordered && failed {
                statuses.push(WriteStatus::NotAttempted);
                continue;
            }

            let record = self.identified(record);
            let status = match self.validate(collection, &record) {
                Err(message) => WriteStatus::Failed(message),
                Ok(()) => {
                    let id = record.get(&self.id_field).cloned().unwrap_or(Bson::Null);
                    if stored.iter().any(|existing| Self::same_id(existing, &id, &self.id_field)) {
                        WriteStatus::Failed(format!(
                            "Duplicate key: {} {id} already exists",
                            self.id_field
                        ))
                    } else {
                        stored.push(record);
                        WriteStatus::Written
                    }
                }
            };

            failed |= matches!(status, WriteStatus::Failed(_));
            statuses.push(status);
        }

        debug!(collection, count = statuses.len(), "inserted records");
        Ok(statuses)
    }

    async fn replace_record(
        &self,
        collection: &str,
        filter: &Predicate,
        record: Document,
        upsert: bool,
    ) -> RecordResult<u64> {
        let mut store = self.store.write().await;
        let stored = store.entry(collection.to_string()).or_default();

        match matching(stored, filter)?.first() {
            Some(&index) => {
                let replacement = self.replacement(&stored[index], record);
                self.validate(collection, &replacement)
                    .map_err(RecordError::Store)?;
                stored[index] = replacement;
                Ok(1)
            }
            None if upsert => {
                let record = self.identified(record);
                self.validate(collection, &record)
                    .map_err(RecordError::Store)?;
                stored.push(record);
                Ok(0)
            }
            None => Ok(0),
        }
    }

    async fn update_records(
        &self,
        collection: &str,
        filter: &Predicate,
        change: Change,
    ) -> RecordResult<u64> {
        let mut store = self.store.write().await;
        let Some(stored) = store.get_mut(collection) else {
            return Ok(0);
        };

        let indexes = matching(stored, filter)?;
        let mut updated = Vec::with_capacity(indexes.len());

        for &index in &indexes {
            let record = match &change {
                Change::Replace(body) => self.replacement(&stored[index], body.clone()),
                Change::Merge(patch) => {
                    let mut record = stored[index].clone();
                    merge(&mut record, patch.clone());
                    record
                }
            };
            self.validate(collection, &record)
                .map_err(RecordError::Store)?;
            updated.push(record);
        }

        for (index, record) in indexes.iter().zip(updated) {
            stored[*index] = record;
        }

        Ok(indexes.len() as u64)
    }

    async fn find_records(
        &self,
        collection: &str,
        filter: &Predicate,
        options: &FindOptions,
    ) -> RecordResult<Vec<Document>> {
        let store = self.store.read().await;
        let Some(stored) = store.get(collection) else {
            return Ok(vec![]);
        };

        let mut found = DocumentEvaluator::filter_documents(stored.iter(), filter)?;

        if !options.sort.is_empty() {
            found.sort_by(|left, right| compare_documents(left, right, &options.sort));
        }

        Ok(found
            .into_iter()
            .skip(options.skip.unwrap_or(0) as usize)
            .take(options.limit.map_or(usize::MAX, |limit| limit as usize))
            .map(|record| options.projection.apply(record.clone()))
            .collect())
    }

    async fn count_records(&self, collection: &str, filter: &Predicate) -> RecordResult<u64> {
        let store = self.store.read().await;

        match store.get(collection) {
            Some(stored) => Ok(matching(stored, filter)?.len() as u64),
            None => Ok(0),
        }
    }

    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Predicate,
        patch: Document,
        projection: &Projection,
    ) -> RecordResult<Option<Document>> {
        let mut store = self.store.write().await;
        let Some(stored) = store.get_mut(collection) else {
            return Ok(None);
        };

        let Some(&index) = matching(stored, filter)?.first() else {
            return Ok(None);
        };

        let mut record = stored[index].clone();
        merge(&mut record, patch);
        self.validate(collection, &record)
            .map_err(RecordError::Store)?;
        stored[index] = record.clone();

        Ok(Some(projection.apply(record)))
    }

    async fn find_one_and_delete(
        &self,
        collection: &str,
        filter: &Predicate,
        projection: &Projection,
    ) -> RecordResult<Option<Document>> {
        let mut store = self.store.write().await;
        let Some(stored) = store.get_mut(collection) else {
            return Ok(None);
        };

        Ok(matching(stored, filter)?
            .first()
            .map(|&index| projection.apply(stored.remove(index))))
    }

    async fn delete_records(&self, collection: &str, filter: &Predicate) -> RecordResult<u64> {
        let mut store = self.store.write().await;
        let Some(stored) = store.get_mut(collection) else {
            return Ok(0);
        };

        let indexes = matching(stored, filter)?;
        for index in indexes.iter().rev() {
            stored.remove(*index);
        }

        Ok(indexes.len() as u64)
    }

    async fn create_collection(&self, name: &str) -> RecordResult<()> {
        let mut store = self.store.write().await;

        if store.contains_key(name) {
            return Err(RecordError::Store(format!("collection '{name}' already exists")));
        }
        store.insert(name.to_string(), Vec::new());

        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> RecordResult<()> {
        let mut store = self.store.write().await;

        if store.remove(name).is_none() {
            return Err(RecordError::Store(format!("collection '{name}' not found")));
        }

        Ok(())
    }

    async fn list_collections(&self) -> RecordResult<Vec<String>> {
        let mut names: Vec<String> = self.store.read().await.keys().cloned().collect();
        names.sort();

        Ok(names)
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
///
/// # Example
///
/// ```ignore
/// use docrest_memory::InMemoryStore;
/// use docrest::backend::RecordBackendBuilder;
///
/// let store = InMemoryStore::builder()
///     .with_id_field("key")
///     .with_required_fields("users", ["name", "email"])
///     .build()
///     .await?;
/// ```
#[derive(Debug)]
pub struct InMemoryStoreBuilder {
    id_field: String,
    required: HashMap<String, Vec<String>>,
}

impl Default for InMemoryStoreBuilder {
    fn default() -> Self {
        Self {
            id_field: "_id".to_string(),
            required: HashMap::new(),
        }
    }
}

impl InMemoryStoreBuilder {
    /// Sets the field records are keyed on. Must match the service's id field.
    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    /// Requires every record written to `collection` to carry non-null `fields`.
    pub fn with_required_fields<I, F>(mut self, collection: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        self.required
            .entry(collection.into())
            .or_default()
            .extend(fields.into_iter().map(Into::into));
        self
    }
}

#[async_trait]
impl RecordBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(self) -> RecordResult<Self::Backend> {
        info!(
            id_field = %self.id_field,
            validated_collections = self.required.len(),
            "initialized in-memory store"
        );

        Ok(InMemoryStore {
            store: Arc::new(RwLock::new(StoreMap::new())),
            required: Arc::new(self.required),
            id_field: self.id_field,
        })
    }
}
