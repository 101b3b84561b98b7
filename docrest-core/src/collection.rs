//! Record operations on a single collection.
//!
//! A [`RecordCollection`] is obtained from a [`RecordService`](crate::service::RecordService)
//! and exposes the full create/update/merge/delete/retrieve surface. Each operation accepts
//! raw request inputs (filter strings, field lists, id lists, record payloads), validates
//! them before touching the backend, and returns records with their identifiers in
//! external form.
//!
//! Operations come in three addressing modes:
//!
//! - by the ids embedded in the records themselves (`update_records`, `merge_record`, ...)
//! - by an explicit id or id list (`*_by_id`, `*_by_ids`)
//! - by filter (`*_by_filter`)
//!
//! Multi-record operations report one [`Outcome`] per input, in input order. Input
//! validation is all-or-nothing; execution is best-effort per record.
//!
//! # Example
//!
//! ```ignore
//! use bson::doc;
//! use docrest::prelude::*;
//!
//! let users = service.collection("users");
//!
//! let created = users
//!     .create_records(vec![doc! { "name": "Alice", "age": 31 }], "*", CreateOptions::default())
//!     .await?;
//! let adults = users
//!     .retrieve_records_by_filter("age >= 21", "name", RetrieveOptions::new().with_count())
//!     .await?;
//! # Ok::<(), docrest::error::RecordError>(())
//! ```

use bson::{Bson, Document, doc};
use futures::{StreamExt, stream};
use tracing::{debug, warn};

use crate::{
    backend::{Change, FindOptions, RecordBackend, WriteStatus},
    config::ServiceConfig,
    error::{Operation, RecordError, RecordResult},
    filter::{FilterSource, compile},
    id::{self, IdList, RecordId},
    options::{CreateOptions, RetrieveOptions},
    predicate::{CompareOp, Predicate},
    projection::{FieldList, Projection},
    record::RecordSet,
    response::{Outcome, OutcomeError, RecordList},
};

/// A handle to one collection of a record service.
#[derive(Debug)]
pub struct RecordCollection<'a, B: RecordBackend> {
    name: String,
    backend: &'a B,
    config: &'a ServiceConfig,
}

impl<'a, B: RecordBackend> RecordCollection<'a, B> {
    pub(crate) fn new(name: String, backend: &'a B, config: &'a ServiceConfig) -> Self {
        Self {
            name,
            backend,
            config,
        }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn id_field(&self) -> &str {
        &self.config.id_field
    }

    /// Creates records in one batch insert.
    ///
    /// Records without an identifier receive a backend-generated one. With
    /// [`CreateOptions::rollback`], writing stops at the first failure and the remaining
    /// records are reported as [`OutcomeError::NotAttempted`]; records already written stay.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Request`] for an empty payload, and [`RecordError::Backend`]
    /// when the batch insert itself fails.
    pub async fn create_records(
        &self,
        records: impl Into<RecordSet>,
        fields: impl Into<FieldList>,
        options: CreateOptions,
    ) -> RecordResult<Vec<Outcome>> {
        let records = records.into();
        records.validate()?;
        let projection = self.projection(fields);

        debug!(
            collection = %self.name,
            count = records.len(),
            rollback = options.rollback,
            "creating records"
        );

        let records: Vec<Document> = records
            .into_iter()
            .map(|record| self.with_identifier(record))
            .collect();

        let statuses = self
            .backend
            .insert_records(&self.name, records.clone(), options.rollback)
            .await
            .map_err(|err| err.during(Operation::Create, &self.name))?;

        if statuses.len() != records.len() {
            return Err(RecordError::Backend {
                operation: Operation::Create,
                collection: self.name.clone(),
                message: format!(
                    "backend reported {} results for {} records",
                    statuses.len(),
                    records.len()
                ),
            });
        }

        Ok(records
            .into_iter()
            .zip(statuses)
            .enumerate()
            .map(|(index, (record, status))| match status {
                WriteStatus::Written => Outcome::Record(self.finish(record, &projection)),
                WriteStatus::Failed(message) => {
                    let err = RecordError::Store(message).during(Operation::Create, &self.name);
                    warn!(collection = %self.name, index, error = %err, "record was not created");
                    Outcome::failed(err)
                }
                WriteStatus::NotAttempted => Outcome::Error(OutcomeError::NotAttempted),
            })
            .collect())
    }

    /// Creates a single record.
    ///
    /// A record that already carries an identifier is saved: it replaces any existing record
    /// with that id.
    pub async fn create_record(
        &self,
        record: Document,
        fields: impl Into<FieldList>,
    ) -> RecordResult<Document> {
        if record.is_empty() {
            return Err(RecordError::request("There are no record fields in the request."));
        }
        let projection = self.projection(fields);

        debug!(collection = %self.name, "creating record");

        let record = id::to_native_record(record, self.id_field());
        if let Some(id) = id::record_id(&record, self.id_field()) {
            self.backend
                .replace_record(&self.name, &self.by_id(&id), record.clone(), true)
                .await
                .map_err(|err| err.during(Operation::Create, &self.name))?;

            return Ok(self.finish(record, &projection));
        }

        let record = self.with_identifier(record);
        let statuses = self
            .backend
            .insert_records(&self.name, vec![record.clone()], true)
            .await
            .map_err(|err| err.during(Operation::Create, &self.name))?;

        match statuses.into_iter().next() {
            Some(WriteStatus::Written) => Ok(self.finish(record, &projection)),
            Some(WriteStatus::Failed(message)) => {
                Err(RecordError::Store(message).during(Operation::Create, &self.name))
            }
            _ => Err(RecordError::Store("record was not written".into())
                .during(Operation::Create, &self.name)),
        }
    }

    /// Replaces each record by its embedded identifier.
    ///
    /// A record whose identifier matches nothing is reported as
    /// [`RecordError::NotFound`].
    pub async fn update_records(
        &self,
        records: impl Into<RecordSet>,
        fields: impl Into<FieldList>,
    ) -> RecordResult<Vec<Outcome>> {
        let records = self.identified_records(records, Operation::Update)?;
        let projection = self.projection(fields);

        debug!(collection = %self.name, count = records.len(), "updating records");

        let projection = &projection;
        let outcomes = stream::iter(records)
            .map(|(id, record)| async move {
                Outcome::from(self.replace_by_id(&id, record, projection).await)
            })
            .buffered(self.concurrency())
            .collect::<Vec<Outcome>>()
            .await;

        Ok(self.report(outcomes, Operation::Update))
    }

    /// Replaces a single record by its embedded identifier.
    pub async fn update_record(
        &self,
        record: Document,
        fields: impl Into<FieldList>,
    ) -> RecordResult<Document> {
        let (id, record) = self.identified_record(record, Operation::Update)?;
        let projection = self.projection(fields);

        debug!(collection = %self.name, id = %id, "updating record");

        self.replace_by_id(&id, record, &projection).await
    }

    /// Replaces the record with the given identifier.
    ///
    /// Any identifier inside `record` is ignored.
    pub async fn update_record_by_id(
        &self,
        record: Document,
        id: impl Into<Bson>,
        fields: impl Into<FieldList>,
    ) -> RecordResult<Document> {
        let patch = self.patch(record)?;
        let id = self.required_id(id.into())?;
        let projection = self.projection(fields);

        debug!(collection = %self.name, id = %id, "updating record by id");

        self.replace_by_id(&id, patch, &projection).await
    }

    /// Replaces every record matching `filter` with `record`, keeping their identifiers.
    pub async fn update_records_by_filter(
        &self,
        record: Document,
        filter: impl Into<FilterSource>,
        fields: impl Into<FieldList>,
    ) -> RecordResult<Vec<Document>> {
        let patch = self.patch(record)?;
        let predicate = self.predicate(filter)?;
        let projection = self.projection(fields);

        debug!(collection = %self.name, filter = ?predicate, "updating records by filter");

        self.change_matching(&predicate, Change::Replace(patch), &projection, Operation::Update)
            .await
    }

    /// Replaces every listed record with `record`.
    ///
    /// Any identifier inside `record` is ignored; identifiers cannot be reassigned.
    pub async fn update_records_by_ids(
        &self,
        record: Document,
        ids: impl Into<IdList>,
        fields: impl Into<FieldList>,
    ) -> RecordResult<Vec<Outcome>> {
        let patch = self.patch(record)?;
        let ids = self.required_ids(ids, Operation::Update)?;
        let projection = self.projection(fields);

        debug!(collection = %self.name, count = ids.len(), "updating records by ids");

        self.change_listed(&ids, Change::Replace(patch), &projection, Operation::Update)
            .await
    }

    /// Sets the fields of each record on the stored record with the same identifier.
    pub async fn merge_records(
        &self,
        records: impl Into<RecordSet>,
        fields: impl Into<FieldList>,
    ) -> RecordResult<Vec<Outcome>> {
        let records = self
            .identified_records(records, Operation::Merge)?
            .into_iter()
            .map(|(id, record)| self.patch(record).map(|patch| (id, patch)))
            .collect::<RecordResult<Vec<_>>>()?;
        let projection = self.projection(fields);

        debug!(collection = %self.name, count = records.len(), "merging records");

        let projection = &projection;
        let outcomes = stream::iter(records)
            .map(|(id, patch)| async move {
                Outcome::from(self.merge_by_id(&id, patch, projection).await)
            })
            .buffered(self.concurrency())
            .collect::<Vec<Outcome>>()
            .await;

        Ok(self.report(outcomes, Operation::Merge))
    }

    /// Sets the fields of `record` on the stored record with its embedded identifier.
    pub async fn merge_record(
        &self,
        record: Document,
        fields: impl Into<FieldList>,
    ) -> RecordResult<Document> {
        let (id, record) = self.identified_record(record, Operation::Merge)?;
        let patch = self.patch(record)?;
        let projection = self.projection(fields);

        debug!(collection = %self.name, id = %id, "merging record");

        self.merge_by_id(&id, patch, &projection).await
    }

    /// Sets the fields of `record` on the record with the given identifier.
    pub async fn merge_record_by_id(
        &self,
        record: Document,
        id: impl Into<Bson>,
        fields: impl Into<FieldList>,
    ) -> RecordResult<Document> {
        let patch = self.patch(record)?;
        let id = self.required_id(id.into())?;
        let projection = self.projection(fields);

        debug!(collection = %self.name, id = %id, "merging record by id");

        self.merge_by_id(&id, patch, &projection).await
    }

    /// Sets the fields of `record` on every record matching `filter`.
    pub async fn merge_records_by_filter(
        &self,
        record: Document,
        filter: impl Into<FilterSource>,
        fields: impl Into<FieldList>,
    ) -> RecordResult<Vec<Document>> {
        let patch = self.patch(record)?;
        let predicate = self.predicate(filter)?;
        let projection = self.projection(fields);

        debug!(collection = %self.name, filter = ?predicate, "merging records by filter");

        self.change_matching(&predicate, Change::Merge(patch), &projection, Operation::Merge)
            .await
    }

    /// Sets the fields of `record` on every listed record.
    pub async fn merge_records_by_ids(
        &self,
        record: Document,
        ids: impl Into<IdList>,
        fields: impl Into<FieldList>,
    ) -> RecordResult<Vec<Outcome>> {
        let patch = self.patch(record)?;
        let ids = self.required_ids(ids, Operation::Merge)?;
        let projection = self.projection(fields);

        debug!(collection = %self.name, count = ids.len(), "merging records by ids");

        self.change_listed(&ids, Change::Merge(patch), &projection, Operation::Merge)
            .await
    }

    /// Deletes the records identified by the ids embedded in `records`.
    pub async fn delete_records(
        &self,
        records: impl Into<RecordSet>,
        fields: impl Into<FieldList>,
    ) -> RecordResult<Vec<Outcome>> {
        let ids: Vec<RecordId> = self
            .identified_records(records, Operation::Delete)?
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        let projection = self.projection(fields);

        debug!(collection = %self.name, count = ids.len(), "deleting records");

        self.delete_listed(&ids, &projection).await
    }

    /// Deletes the record identified by the id embedded in `record` and returns it.
    pub async fn delete_record(
        &self,
        record: Document,
        fields: impl Into<FieldList>,
    ) -> RecordResult<Document> {
        let (id, _) = self.identified_record(record, Operation::Delete)?;
        let projection = self.projection(fields);

        debug!(collection = %self.name, id = %id, "deleting record");

        self.delete_by_id(&id, &projection).await
    }

    /// Deletes every record matching `filter` and returns the deleted records.
    ///
    /// An empty filter is rejected rather than deleting the whole collection.
    pub async fn delete_records_by_filter(
        &self,
        filter: impl Into<FilterSource>,
        fields: impl Into<FieldList>,
    ) -> RecordResult<Vec<Document>> {
        let predicate = self.predicate(filter)?;
        if predicate.is_match_all() {
            return Err(RecordError::request(
                "Filter for delete request can not be empty.",
            ));
        }
        let projection = self.projection(fields);

        debug!(collection = %self.name, filter = ?predicate, "deleting records by filter");

        let records = self
            .backend
            .find_records(&self.name, &predicate, &FindOptions::projected(projection.clone()))
            .await
            .map_err(|err| err.during(Operation::Delete, &self.name))?;

        let ids: Vec<Bson> = records
            .iter()
            .filter_map(|record| record.get(self.id_field()).cloned())
            .collect();

        if !ids.is_empty() {
            self.backend
                .delete_records(&self.name, &Predicate::one_of(self.id_field(), ids))
                .await
                .map_err(|err| err.during(Operation::Delete, &self.name))?;
        }

        Ok(records
            .into_iter()
            .map(|record| self.finish(record, &projection))
            .collect())
    }

    /// Deletes every listed record.
    pub async fn delete_records_by_ids(
        &self,
        ids: impl Into<IdList>,
        fields: impl Into<FieldList>,
    ) -> RecordResult<Vec<Outcome>> {
        let ids = self.required_ids(ids, Operation::Delete)?;
        let projection = self.projection(fields);

        debug!(collection = %self.name, count = ids.len(), "deleting records by ids");

        self.delete_listed(&ids, &projection).await
    }

    /// Deletes the record with the given identifier and returns it.
    pub async fn delete_record_by_id(
        &self,
        id: impl Into<Bson>,
        fields: impl Into<FieldList>,
    ) -> RecordResult<Document> {
        let id = self.required_id(id.into())?;
        let projection = self.projection(fields);

        debug!(collection = %self.name, id = %id, "deleting record by id");

        self.delete_by_id(&id, &projection).await
    }

    /// Retrieves the records matching `filter`.
    ///
    /// With [`RetrieveOptions::include_count`], the total number of matches, ignoring
    /// offset and limit, is reported in the list metadata. A limit or offset of zero is
    /// treated as absent.
    pub async fn retrieve_records_by_filter(
        &self,
        filter: impl Into<FilterSource>,
        fields: impl Into<FieldList>,
        options: RetrieveOptions,
    ) -> RecordResult<RecordList> {
        let predicate = self.predicate(filter)?;
        let projection = self.projection(fields);

        debug!(
            collection = %self.name,
            filter = ?predicate,
            limit = ?options.limit,
            offset = ?options.offset,
            "retrieving records by filter"
        );

        let find = FindOptions {
            projection: projection.clone(),
            sort: options.sort.unwrap_or_default(),
            // Zero is "unset" for both.
            skip: options.offset.filter(|&offset| offset > 0),
            limit: options.limit.filter(|&limit| limit > 0),
        };

        let records = self
            .backend
            .find_records(&self.name, &predicate, &find)
            .await
            .map_err(|err| err.during(Operation::Retrieve, &self.name))?
            .into_iter()
            .map(|record| self.finish(record, &projection))
            .collect();

        let list = RecordList::new(records);
        if !options.include_count {
            return Ok(list);
        }

        let count = self
            .backend
            .count_records(&self.name, &predicate)
            .await
            .map_err(|err| err.during(Operation::Count, &self.name))?;

        Ok(list.with_count(count))
    }

    /// Retrieves the records identified by the ids embedded in `records`.
    pub async fn retrieve_records(
        &self,
        records: impl Into<RecordSet>,
        fields: impl Into<FieldList>,
    ) -> RecordResult<Vec<Outcome>> {
        let ids: Vec<RecordId> = self
            .identified_records(records, Operation::Retrieve)?
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        let projection = self.projection(fields);

        debug!(collection = %self.name, count = ids.len(), "retrieving records");

        self.retrieve_listed(&ids, &projection).await
    }

    /// Retrieves the record identified by the id embedded in `record`.
    pub async fn retrieve_record(
        &self,
        record: Document,
        fields: impl Into<FieldList>,
    ) -> RecordResult<Document> {
        let (id, _) = self.identified_record(record, Operation::Retrieve)?;
        let projection = self.projection(fields);

        debug!(collection = %self.name, id = %id, "retrieving record");

        self.find_by_id(&id, &projection)
            .await?
            .ok_or_else(|| RecordError::not_found(&id, &self.name))
    }

    /// Retrieves every listed record. Missing ids are reported as not found.
    pub async fn retrieve_records_by_ids(
        &self,
        ids: impl Into<IdList>,
        fields: impl Into<FieldList>,
    ) -> RecordResult<Vec<Outcome>> {
        let ids = self.required_ids(ids, Operation::Retrieve)?;
        let projection = self.projection(fields);

        debug!(collection = %self.name, count = ids.len(), "retrieving records by ids");

        self.retrieve_listed(&ids, &projection).await
    }

    /// Retrieves the record with the given identifier.
    ///
    /// When a decimal string id matches nothing, the lookup is retried with its numeric
    /// value.
    pub async fn retrieve_record_by_id(
        &self,
        id: impl Into<Bson>,
        fields: impl Into<FieldList>,
    ) -> RecordResult<Document> {
        let id = self.required_id(id.into())?;
        let projection = self.projection(fields);

        debug!(collection = %self.name, id = %id, "retrieving record by id");

        if let Some(record) = self.find_by_id(&id, &projection).await? {
            return Ok(record);
        }
        if let Some(numeric) = id.numeric_alternative() {
            if let Some(record) = self.find_by_id(&numeric, &projection).await? {
                return Ok(record);
            }
        }

        Err(RecordError::not_found(&id, &self.name))
    }

    fn projection(&self, fields: impl Into<FieldList>) -> Projection {
        Projection::new(fields, self.id_field())
    }

    fn predicate(&self, filter: impl Into<FilterSource>) -> RecordResult<Predicate> {
        let predicate = compile(filter);
        if let Some(text) = predicate.find_opaque() {
            return Err(RecordError::request(format!(
                "Invalid or unparsable filter segment '{text}'"
            )));
        }
        Ok(predicate)
    }

    fn by_id(&self, id: &RecordId) -> Predicate {
        Predicate::compare(self.id_field(), CompareOp::Eq, id.to_bson())
    }

    fn by_ids(&self, ids: &[RecordId]) -> Predicate {
        Predicate::one_of(self.id_field(), ids.iter().map(RecordId::to_bson))
    }

    fn concurrency(&self) -> usize {
        if self.backend.supports_concurrency() {
            self.config.max_concurrency.max(1)
        } else {
            1
        }
    }

    /// Normalizes the identifier of a new record, generating one when absent.
    fn with_identifier(&self, record: Document) -> Document {
        let record = id::to_native_record(record, self.id_field());
        if record.contains_key(self.id_field()) {
            return record;
        }

        let mut identified = doc! { self.id_field(): self.backend.generate_id() };
        identified.extend(record);
        identified
    }

    /// Projects a stored record and converts its identifier to external form.
    fn finish(&self, record: Document, projection: &Projection) -> Document {
        id::to_external_record(projection.apply(record), self.id_field())
    }

    /// Removes identifier fields from an update payload.
    fn patch(&self, mut record: Document) -> RecordResult<Document> {
        record.remove(self.id_field());
        record.remove(id::ID_ALIAS);
        if record.is_empty() {
            return Err(RecordError::request("There are no fields in the record."));
        }
        Ok(record)
    }

    fn required_id(&self, value: Bson) -> RecordResult<RecordId> {
        match &value {
            Bson::Null => Err(RecordError::request("No identifier exist in record.")),
            Bson::String(text) if text.trim().is_empty() => {
                Err(RecordError::request("No identifier exist in record."))
            }
            _ => Ok(id::to_native_id(&value, false)),
        }
    }

    fn required_ids(
        &self,
        ids: impl Into<IdList>,
        operation: Operation,
    ) -> RecordResult<Vec<RecordId>> {
        let ids = id::to_native_ids(ids);
        if ids.is_empty() {
            return Err(RecordError::request(format!(
                "Identifying values for '{}' can not be empty for {operation} request.",
                self.id_field()
            )));
        }
        Ok(ids)
    }

    fn identified_record(
        &self,
        record: Document,
        operation: Operation,
    ) -> RecordResult<(RecordId, Document)> {
        if record.is_empty() {
            return Err(RecordError::request("There are no record fields in the request."));
        }
        let record = id::to_native_record(record, self.id_field());
        let value = record.get(self.id_field()).cloned().unwrap_or(Bson::Null);
        let id = self.required_id(value).map_err(|_| {
            RecordError::request(format!(
                "Identifying field '{}' can not be empty for {operation} request.",
                self.id_field()
            ))
        })?;
        Ok((id, record))
    }

    fn identified_records(
        &self,
        records: impl Into<RecordSet>,
        operation: Operation,
    ) -> RecordResult<Vec<(RecordId, Document)>> {
        let records = records.into();
        records.validate()?;
        records
            .into_iter()
            .map(|record| self.identified_record(record, operation))
            .collect()
    }

    async fn replace_by_id(
        &self,
        id: &RecordId,
        mut record: Document,
        projection: &Projection,
    ) -> RecordResult<Document> {
        record.insert(self.id_field(), id.to_bson());

        let matched = self
            .backend
            .replace_record(&self.name, &self.by_id(id), record.clone(), false)
            .await
            .map_err(|err| err.during(Operation::Update, &self.name))?;

        if matched == 0 {
            return Err(RecordError::not_found(id, &self.name));
        }
        Ok(self.finish(record, projection))
    }

    async fn merge_by_id(
        &self,
        id: &RecordId,
        patch: Document,
        projection: &Projection,
    ) -> RecordResult<Document> {
        self.backend
            .find_one_and_update(&self.name, &self.by_id(id), patch, projection)
            .await
            .map_err(|err| err.during(Operation::Merge, &self.name))?
            .map(|record| self.finish(record, projection))
            .ok_or_else(|| RecordError::not_found(id, &self.name))
    }

    async fn delete_by_id(&self, id: &RecordId, projection: &Projection) -> RecordResult<Document> {
        self.backend
            .find_one_and_delete(&self.name, &self.by_id(id), projection)
            .await
            .map_err(|err| err.during(Operation::Delete, &self.name))?
            .map(|record| self.finish(record, projection))
            .ok_or_else(|| RecordError::not_found(id, &self.name))
    }

    async fn find_by_id(
        &self,
        id: &RecordId,
        projection: &Projection,
    ) -> RecordResult<Option<Document>> {
        let options = FindOptions {
            limit: Some(1),
            ..FindOptions::projected(projection.clone())
        };

        Ok(self
            .backend
            .find_records(&self.name, &self.by_id(id), &options)
            .await
            .map_err(|err| err.during(Operation::Retrieve, &self.name))?
            .into_iter()
            .next()
            .map(|record| self.finish(record, projection)))
    }

    /// Reads the listed records and pairs each requested id with its record.
    async fn find_listed(
        &self,
        ids: &[RecordId],
        projection: &Projection,
        operation: Operation,
    ) -> RecordResult<Vec<Outcome>> {
        let records = self
            .backend
            .find_records(&self.name, &self.by_ids(ids), &FindOptions::projected(projection.clone()))
            .await
            .map_err(|err| err.during(operation, &self.name))?;

        Ok(ids
            .iter()
            .map(|id| {
                let wanted = id.to_bson();
                records
                    .iter()
                    .find(|record| {
                        record
                            .get(self.id_field())
                            .is_some_and(|stored| same_id(stored, &wanted))
                    })
                    .map(|record| Outcome::Record(self.finish(record.clone(), projection)))
                    .unwrap_or_else(|| Outcome::failed(RecordError::not_found(id, &self.name)))
            })
            .collect())
    }

    /// Builds responses for an id-only projection without reading the store.
    fn synthesized(&self, ids: &[RecordId]) -> Vec<Outcome> {
        ids.iter()
            .map(|id| Outcome::Record(doc! { self.id_field(): id.to_external() }))
            .collect()
    }

    async fn retrieve_listed(
        &self,
        ids: &[RecordId],
        projection: &Projection,
    ) -> RecordResult<Vec<Outcome>> {
        let outcomes = self.find_listed(ids, projection, Operation::Retrieve).await?;
        Ok(self.report(outcomes, Operation::Retrieve))
    }

    async fn delete_listed(
        &self,
        ids: &[RecordId],
        projection: &Projection,
    ) -> RecordResult<Vec<Outcome>> {
        let outcomes = if projection.is_id_only(self.id_field()) {
            self.synthesized(ids)
        } else {
            self.find_listed(ids, projection, Operation::Delete).await?
        };

        self.backend
            .delete_records(&self.name, &self.by_ids(ids))
            .await
            .map_err(|err| err.during(Operation::Delete, &self.name))?;

        Ok(self.report(outcomes, Operation::Delete))
    }

    async fn change_listed(
        &self,
        ids: &[RecordId],
        change: Change,
        projection: &Projection,
        operation: Operation,
    ) -> RecordResult<Vec<Outcome>> {
        self.backend
            .update_records(&self.name, &self.by_ids(ids), change)
            .await
            .map_err(|err| err.during(operation, &self.name))?;

        let outcomes = if projection.is_id_only(self.id_field()) {
            self.synthesized(ids)
        } else {
            self.find_listed(ids, projection, operation).await?
        };

        Ok(self.report(outcomes, operation))
    }

    /// Applies a change to the records matching `predicate` and re-reads exactly those.
    ///
    /// An id-only projection is answered from the pre-selected ids.
    async fn change_matching(
        &self,
        predicate: &Predicate,
        change: Change,
        projection: &Projection,
        operation: Operation,
    ) -> RecordResult<Vec<Document>> {
        let id_only = Projection::new(self.id_field(), self.id_field());
        let ids: Vec<Bson> = self
            .backend
            .find_records(&self.name, predicate, &FindOptions::projected(id_only))
            .await
            .map_err(|err| err.during(operation, &self.name))?
            .into_iter()
            .filter_map(|mut record| record.remove(self.id_field()))
            .collect();

        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let targets = Predicate::one_of(self.id_field(), ids.clone());

        self.backend
            .update_records(&self.name, &targets, change)
            .await
            .map_err(|err| err.during(operation, &self.name))?;

        if projection.is_id_only(self.id_field()) {
            return Ok(ids
                .iter()
                .map(|id| doc! { self.id_field(): id::to_external_id(id) })
                .collect());
        }

        Ok(self
            .backend
            .find_records(&self.name, &targets, &FindOptions::projected(projection.clone()))
            .await
            .map_err(|err| err.during(operation, &self.name))?
            .into_iter()
            .map(|record| self.finish(record, projection))
            .collect())
    }

    fn report(&self, outcomes: Vec<Outcome>, operation: Operation) -> Vec<Outcome> {
        for (index, outcome) in outcomes.iter().enumerate() {
            if let Some(err) = outcome.error() {
                warn!(
                    collection = %self.name,
                    index,
                    operation = %operation,
                    error = %err,
                    "record operation failed"
                );
            }
        }
        outcomes
    }
}

/// Identifier equality that treats numerically equal integers and floats as the same id.
///
/// Integers compare exactly; f64 only enters when one side is a float.
fn same_id(stored: &Bson, wanted: &Bson) -> bool {
    match (as_integer(stored), as_integer(wanted)) {
        (Some(left), Some(right)) => left == right,
        (Some(integer), None) => matches!(wanted, Bson::Double(float) if integer as f64 == *float),
        (None, Some(integer)) => matches!(stored, Bson::Double(float) if integer as f64 == *float),
        (None, None) => stored == wanted,
    }
}

fn as_integer(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(value) => Some(i64::from(*value)),
        Bson::Int64(value) => Some(*value),
        _ => None,
    }
}
