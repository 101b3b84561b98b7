//! Storage backend abstraction for the record layer.
//!
//! A [`RecordBackend`] executes native operations against one document store. It receives
//! compiled [`Predicate`] trees, projections and sort specifications, and knows nothing about
//! filter strings, id normalization or batch outcome aggregation; those live in the
//! orchestrator ([`crate::collection`]).
//!
//! # Traits
//!
//! - [`RecordBackend`]: The core trait for storage backends
//! - [`RecordBackendBuilder`]: Factory trait for creating backend instances
//!
//! # Example
//!
//! ```ignore
//! use docrest::backend::RecordBackend;
//! use docrest::predicate::Predicate;
//! use bson::doc;
//!
//! let statuses = backend
//!     .insert_records("users", vec![doc! { "_id": 1, "name": "Alice" }], true)
//!     .await?;
//! let everyone = backend
//!     .find_records("users", &Predicate::MatchAll, &FindOptions::default())
//!     .await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use bson::{Bson, Document, oid::ObjectId};
use std::fmt::Debug;

use crate::{error::RecordResult, predicate::Predicate, projection::Projection, sort::SortSpec};

/// Per-record result of a batch insert.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteStatus {
    Written,
    Failed(String),
    /// Skipped because an earlier record of an ordered insert failed.
    NotAttempted,
}

/// Modification applied to every record matched by a filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Replace the record body, keeping its identifier.
    Replace(Document),
    /// Set the given fields, leaving the others untouched.
    Merge(Document),
}

/// Options for [`RecordBackend::find_records`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FindOptions {
    pub projection: Projection,
    pub sort: SortSpec,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

impl FindOptions {
    pub fn projected(projection: Projection) -> Self {
        Self {
            projection,
            ..Self::default()
        }
    }
}

/// Abstract interface for document storage backends.
///
/// # Thread Safety
///
/// Implementations are shared between concurrent requests and must be `Send + Sync`. The
/// locking or pooling strategy is implementation-specific.
///
/// # Error Handling
///
/// Implementations report store failures as [`RecordError::Store`](crate::error::RecordError)
/// and unsupported predicates as [`RecordError::Request`](crate::error::RecordError). The
/// orchestrator attaches the operation and collection.
#[async_trait]
pub trait RecordBackend: Send + Sync + Debug {
    /// A fresh identifier for a record created without one.
    fn generate_id(&self) -> Bson {
        Bson::ObjectId(ObjectId::new())
    }

    /// The field records are keyed by.
    fn id_field(&self) -> &str {
        "_id"
    }

    /// Whether independent per-record calls may run concurrently.
    fn supports_concurrency(&self) -> bool {
        true
    }

    /// Inserts records into a collection, creating it when missing.
    ///
    /// Returns one status per input record, in input order. When `ordered` is true the
    /// backend stops at the first failure and reports the rest as
    /// [`WriteStatus::NotAttempted`].
    async fn insert_records(
        &self,
        collection: &str,
        records: Vec<Document>,
        ordered: bool,
    ) -> RecordResult<Vec<WriteStatus>>;

    /// Replaces the first record matching `filter` with `record`.
    ///
    /// With `upsert`, inserts `record` when nothing matches. Returns the number of records
    /// matched.
    async fn replace_record(
        &self,
        collection: &str,
        filter: &Predicate,
        record: Document,
        upsert: bool,
    ) -> RecordResult<u64>;

    /// Applies `change` to every record matching `filter`. Returns the number matched.
    async fn update_records(
        &self,
        collection: &str,
        filter: &Predicate,
        change: Change,
    ) -> RecordResult<u64>;

    /// Finds records matching `filter`.
    async fn find_records(
        &self,
        collection: &str,
        filter: &Predicate,
        options: &FindOptions,
    ) -> RecordResult<Vec<Document>>;

    /// Counts records matching `filter`.
    async fn count_records(&self, collection: &str, filter: &Predicate) -> RecordResult<u64>;

    /// Atomically sets the fields of `patch` on the first record matching `filter`.
    ///
    /// Returns the modified record, or `None` when nothing matched.
    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Predicate,
        patch: Document,
        projection: &Projection,
    ) -> RecordResult<Option<Document>>;

    /// Atomically removes the first record matching `filter` and returns it.
    async fn find_one_and_delete(
        &self,
        collection: &str,
        filter: &Predicate,
        projection: &Projection,
    ) -> RecordResult<Option<Document>>;

    /// Deletes every record matching `filter`. Returns the number deleted.
    async fn delete_records(&self, collection: &str, filter: &Predicate) -> RecordResult<u64>;

    async fn create_collection(&self, name: &str) -> RecordResult<()>;

    /// Drops a collection and all its records.
    async fn drop_collection(&self, name: &str) -> RecordResult<()>;

    async fn list_collections(&self) -> RecordResult<Vec<String>>;

    /// Releases backend resources. The default implementation is a no-op.
    async fn shutdown(&self) -> RecordResult<()> {
        Ok(())
    }
}

#[async_trait]
impl<B> RecordBackend for &B
where
    B: RecordBackend + ?Sized,
{
    fn generate_id(&self) -> Bson {
        (**self).generate_id()
    }

    fn id_field(&self) -> &str {
        (**self).id_field()
    }

    fn supports_concurrency(&self) -> bool {
        (**self).supports_concurrency()
    }

    async fn insert_records(
        &self,
        collection: &str,
        records: Vec<Document>,
        ordered: bool,
    ) -> RecordResult<Vec<WriteStatus>> {
        (**self)
            .insert_records(collection, records, ordered)
            .await
    }

    async fn replace_record(
        &self,
        collection: &str,
        filter: &Predicate,
        record: Document,
        upsert: bool,
    ) -> RecordResult<u64> {
        (**self)
            .replace_record(collection, filter, record, upsert)
            .await
    }

    async fn update_records(
        &self,
        collection: &str,
        filter: &Predicate,
        change: Change,
    ) -> RecordResult<u64> {
        (**self)
            .update_records(collection, filter, change)
            .await
    }

    async fn find_records(
        &self,
        collection: &str,
        filter: &Predicate,
        options: &FindOptions,
    ) -> RecordResult<Vec<Document>> {
        (**self)
            .find_records(collection, filter, options)
            .await
    }

    async fn count_records(&self, collection: &str, filter: &Predicate) -> RecordResult<u64> {
        (**self).count_records(collection, filter).await
    }

    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Predicate,
        patch: Document,
        projection: &Projection,
    ) -> RecordResult<Option<Document>> {
        (**self)
            .find_one_and_update(collection, filter, patch, projection)
            .await
    }

    async fn find_one_and_delete(
        &self,
        collection: &str,
        filter: &Predicate,
        projection: &Projection,
    ) -> RecordResult<Option<Document>> {
        (**self)
            .find_one_and_delete(collection, filter, projection)
            .await
    }

    async fn delete_records(&self, collection: &str, filter: &Predicate) -> RecordResult<u64> {
        (**self).delete_records(collection, filter).await
    }

    async fn create_collection(&self, name: &str) -> RecordResult<()> {
        (**self).create_collection(name).await
    }

    async fn drop_collection(&self, name: &str) -> RecordResult<()> {
        (**self).drop_collection(name).await
    }

    async fn list_collections(&self) -> RecordResult<Vec<String>> {
        (**self).list_collections().await
    }

    async fn shutdown(&self) -> RecordResult<()> {
        (**self).shutdown().await
    }
}

#[async_trait]
impl<B> RecordBackend for Box<B>
where
    B: RecordBackend + ?Sized,
{
    fn generate_id(&self) -> Bson {
        (**self).generate_id()
    }

    fn id_field(&self) -> &str {
        (**self).id_field()
    }

    fn supports_concurrency(&self) -> bool {
        (**self).supports_concurrency()
    }

    async fn insert_records(
        &self,
        collection: &str,
        records: Vec<Document>,
        ordered: bool,
    ) -> RecordResult<Vec<WriteStatus>> {
        (**self)
            .insert_records(collection, records, ordered)
            .await
    }

    async fn replace_record(
        &self,
        collection: &str,
        filter: &Predicate,
        record: Document,
        upsert: bool,
    ) -> RecordResult<u64> {
        (**self)
            .replace_record(collection, filter, record, upsert)
            .await
    }

    async fn update_records(
        &self,
        collection: &str,
        filter: &Predicate,
        change: Change,
    ) -> RecordResult<u64> {
        (**self)
            .update_records(collection, filter, change)
            .await
    }

    async fn find_records(
        &self,
        collection: &str,
        filter: &Predicate,
        options: &FindOptions,
    ) -> RecordResult<Vec<Document>> {
        (**self)
            .find_records(collection, filter, options)
            .await
    }

    async fn count_records(&self, collection: &str, filter: &Predicate) -> RecordResult<u64> {
        (**self).count_records(collection, filter).await
    }

    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Predicate,
        patch: Document,
        projection: &Projection,
    ) -> RecordResult<Option<Document>> {
        (**self)
            .find_one_and_update(collection, filter, patch, projection)
            .await
    }

    async fn find_one_and_delete(
        &self,
        collection: &str,
        filter: &Predicate,
        projection: &Projection,
    ) -> RecordResult<Option<Document>> {
        (**self)
            .find_one_and_delete(collection, filter, projection)
            .await
    }

    async fn delete_records(&self, collection: &str, filter: &Predicate) -> RecordResult<u64> {
        (**self).delete_records(collection, filter).await
    }

    async fn create_collection(&self, name: &str) -> RecordResult<()> {
        (**self).create_collection(name).await
    }

    async fn drop_collection(&self, name: &str) -> RecordResult<()> {
        (**self).drop_collection(name).await
    }

    async fn list_collections(&self) -> RecordResult<Vec<String>> {
        (**self).list_collections().await
    }

    async fn shutdown(&self) -> RecordResult<()> {
        (**self).shutdown().await
    }
}

/// Factory trait for constructing backend instances.
#[async_trait]
pub trait RecordBackendBuilder {
    type Backend: RecordBackend;

    /// Builds and initializes a new backend instance.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Initialization`](crate::error::RecordError) when the backend
    /// cannot be set up, for example on connection failure.
    async fn build(self) -> RecordResult<Self::Backend>;
}
