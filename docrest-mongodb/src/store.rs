use async_trait::async_trait;
use bson::{Document, doc};
use futures::{StreamExt, TryStreamExt, stream::iter};
use mongodb::{
    Client, Collection as MongoCollection,
    error::{Error as MongoError, ErrorKind},
    options::{ClientOptions, Credential, FindOptions as MongoFindOptions, ReturnDocument},
};
use tracing::{debug, info};

use docrest_core::{
    backend::{Change, FindOptions, RecordBackend, RecordBackendBuilder, WriteStatus},
    error::{RecordError, RecordResult},
    predicate::{Predicate, PredicateVisitor},
    projection::Projection,
};

use crate::{
    config::MongoDbConfig,
    query::{MongoQueryTranslator, projection_document, sort_document},
};

const OBJECT_ID: &str = "_id";

fn store_error(err: MongoError) -> RecordError {
    RecordError::Store(err.to_string())
}

/// A replacement body that keeps the `_id` and `id_field` values of `found`.
fn replacement(found: &Document, body: &Document, id_field: &str) -> Document {
    let mut replacement = Document::new();
    for field in [OBJECT_ID, id_field] {
        if let Some(value) = found.get(field) {
            replacement.insert(field, value.clone());
        }
    }
    for (key, value) in body {
        if !replacement.contains_key(key) {
            replacement.insert(key.clone(), value.clone());
        }
    }
    replacement
}

#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
    id_field: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self {
            client,
            database,
            id_field: OBJECT_ID.to_string(),
        }
    }

    /// Keys records by `id_field` instead of `_id`. Documents keep their server `_id`.
    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }

    fn query(&self, filter: &Predicate) -> RecordResult<Document> {
        MongoQueryTranslator.visit(filter)
    }

    /// Per-record statuses from a failed `insert_many`.
    fn insert_statuses(err: MongoError, count: usize, ordered: bool) -> RecordResult<Vec<WriteStatus>> {
        let failure = match err.kind.as_ref() {
            ErrorKind::InsertMany(failure) => failure,
            _ => return Err(store_error(err)),
        };
        let Some(write_errors) = &failure.write_errors else {
            return Err(RecordError::Store(
                failure
                    .write_concern_error
                    .as_ref()
                    .map(|concern| concern.message.clone())
                    .unwrap_or_else(|| err.to_string()),
            ));
        };

        let mut statuses = vec![WriteStatus::Written; count];
        let mut first_failure = count;

        for write_error in write_errors {
            if let Some(status) = statuses.get_mut(write_error.index) {
                *status = WriteStatus::Failed(write_error.message.clone());
                first_failure = first_failure.min(write_error.index);
            }
        }

        if ordered {
            for status in statuses.iter_mut().skip(first_failure + 1) {
                *status = WriteStatus::NotAttempted;
            }
        }

        Ok(statuses)
    }
}

#[async_trait]
impl RecordBackend for MongoDbStore {
    fn id_field(&self) -> &str {
        &self.id_field
    }

    async fn insert_records(
        &self,
        collection: &str,
        records: Vec<Document>,
        ordered: bool,
    ) -> RecordResult<Vec<WriteStatus>> {
        let count = records.len();
        if count == 0 {
            return Ok(vec![]);
        }

        match self
            .get_collection(collection)
            .insert_many(records)
            .ordered(ordered)
            .await
        {
            Ok(_) => Ok(vec![WriteStatus::Written; count]),
            Err(err) => Self::insert_statuses(err, count, ordered),
        }
    }

    async fn replace_record(
        &self,
        collection: &str,
        filter: &Predicate,
        record: Document,
        upsert: bool,
    ) -> RecordResult<u64> {
        Ok(self
            .get_collection(collection)
            .replace_one(self.query(filter)?, record)
            .upsert(upsert)
            .await
            .map_err(store_error)?
            .matched_count)
    }

    async fn update_records(
        &self,
        collection: &str,
        filter: &Predicate,
        change: Change,
    ) -> RecordResult<u64> {
        let query = self.query(filter)?;

        match change {
            Change::Merge(patch) => Ok(self
                .get_collection(collection)
                .update_many(query, doc! { "$set": patch })
                .await
                .map_err(store_error)?
                .matched_count),
            Change::Replace(body) => {
                let mut keys = doc! { OBJECT_ID: 1 };
                keys.insert(self.id_field.clone(), 1);

                let replacements = self
                    .get_collection(collection)
                    .find(query)
                    .projection(keys)
                    .await
                    .map_err(store_error)?
                    .try_collect::<Vec<Document>>()
                    .await
                    .map_err(store_error)?
                    .iter()
                    .filter_map(|found| {
                        let id = found.get(OBJECT_ID)?.clone();
                        Some((doc! { OBJECT_ID: id }, replacement(found, &body, &self.id_field)))
                    })
                    .collect::<Vec<_>>();

                let matched = iter(replacements)
                    .then(|(target, replacement)| async move {
                        self.get_collection(collection)
                            .replace_one(target, replacement)
                            .await
                            .map_err(store_error)
                    })
                    .try_collect::<Vec<_>>()
                    .await?
                    .iter()
                    .map(|result| result.matched_count)
                    .sum();

                Ok(matched)
            }
        }
    }

    async fn find_records(
        &self,
        collection: &str,
        filter: &Predicate,
        options: &FindOptions,
    ) -> RecordResult<Vec<Document>> {
        let mut find_options = MongoFindOptions::default();
        find_options.projection = projection_document(&options.projection);
        find_options.sort = sort_document(&options.sort);
        find_options.skip = options.skip;
        find_options.limit = options.limit.map(|limit| limit as i64);

        self.get_collection(collection)
            .find(self.query(filter)?)
            .with_options(find_options)
            .await
            .map_err(store_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(store_error)
    }

    async fn count_records(&self, collection: &str, filter: &Predicate) -> RecordResult<u64> {
        self.get_collection(collection)
            .count_documents(self.query(filter)?)
            .await
            .map_err(store_error)
    }

    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Predicate,
        patch: Document,
        projection: &Projection,
    ) -> RecordResult<Option<Document>> {
        let coll = self.get_collection(collection);
        let mut action = coll
            .find_one_and_update(self.query(filter)?, doc! { "$set": patch })
            .return_document(ReturnDocument::After);
        if let Some(fields) = projection_document(projection) {
            action = action.projection(fields);
        }

        action.await.map_err(store_error)
    }

    async fn find_one_and_delete(
        &self,
        collection: &str,
        filter: &Predicate,
        projection: &Projection,
    ) -> RecordResult<Option<Document>> {
        let coll = self.get_collection(collection);
        let mut action = coll
            .find_one_and_delete(self.query(filter)?);
        if let Some(fields) = projection_document(projection) {
            action = action.projection(fields);
        }

        action.await.map_err(store_error)
    }

    async fn delete_records(&self, collection: &str, filter: &Predicate) -> RecordResult<u64> {
        Ok(self
            .get_collection(collection)
            .delete_many(self.query(filter)?)
            .await
            .map_err(store_error)?
            .deleted_count)
    }

    async fn create_collection(&self, name: &str) -> RecordResult<()> {
        self.client
            .database(&self.database)
            .create_collection(name)
            .await
            .map_err(store_error)
    }

    async fn drop_collection(&self, name: &str) -> RecordResult<()> {
        self.get_collection(name)
            .drop()
            .await
            .map_err(store_error)
    }

    async fn list_collections(&self) -> RecordResult<Vec<String>> {
        self.client
            .database(&self.database)
            .list_collection_names()
            .await
            .map_err(store_error)
    }

    async fn shutdown(&self) -> RecordResult<()> {
        debug!(database = %self.database, "shutting down mongodb client");
        self.client.clone().shutdown().await;

        Ok(())
    }
}

pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
    credentials: Option<(String, String)>,
    id_field: String,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
            credentials: None,
            id_field: OBJECT_ID.to_string(),
        }
    }

    /// Resolves connection string, database and credentials from a configuration block.
    pub fn from_config(config: MongoDbConfig) -> RecordResult<Self> {
        Ok(Self {
            dsn: config.connection_string(),
            database: config.database()?,
            credentials: config.credentials(),
            id_field: config.id_field(),
        })
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((user.into(), password.into()));
        self
    }

    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }
}

#[async_trait]
impl RecordBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> RecordResult<Self::Backend> {
        let mut options = ClientOptions::parse(&self.dsn)
            .await
            .map_err(|e| RecordError::Initialization(e.to_string()))?;

        if let Some((user, password)) = self.credentials {
            let mut credential = Credential::default();
            credential.username = Some(user);
            credential.password = Some(password);
            options.credential = Some(credential);
        }

        let client = Client::with_options(options)
            .map_err(|e| RecordError::Initialization(e.to_string()))?;

        info!(database = %self.database, id_field = %self.id_field, "connected mongodb store");
        Ok(MongoDbStore::new(client, self.database).with_id_field(self.id_field))
    }
}

#[cfg(test)]
mod tests {
    use bson::oid::ObjectId;

    use super::*;

    #[test]
    fn replacements_keep_both_identifiers() {
        let oid = ObjectId::new();
        let found = doc! { "_id": oid, "key": "k-1" };

        assert_eq!(
            replacement(&found, &doc! { "name": "x", "key": "other" }, "key"),
            doc! { "_id": oid, "key": "k-1", "name": "x" }
        );
        assert_eq!(
            replacement(&doc! { "_id": 7 }, &doc! { "name": "x" }, "_id"),
            doc! { "_id": 7, "name": "x" }
        );
    }
}
