use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bson::{Document, doc};
use docrest::{memory::InMemoryStore, prelude::*};

/// Memory store that counts how often records are read back.
#[derive(Debug, Default)]
struct CountingStore {
    inner: InMemoryStore,
    finds: AtomicUsize,
}

impl CountingStore {
    fn finds(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordBackend for CountingStore {
    async fn insert_records(
        &self,
        collection: &str,
        records: Vec<Document>,
        ordered: bool,
    ) -> RecordResult<Vec<WriteStatus>> {
        self.inner.insert_records(collection, records, ordered).await
    }

    async fn replace_record(
        &self,
        collection: &str,
        filter: &Predicate,
        record: Document,
        upsert: bool,
    ) -> RecordResult<u64> {
        self.inner.replace_record(collection, filter, record, upsert).await
    }

    async fn update_records(
        &self,
        collection: &str,
        filter: &Predicate,
        change: Change,
    ) -> RecordResult<u64> {
        self.inner.update_records(collection, filter, change).await
    }

    async fn find_records(
        &self,
        collection: &str,
        filter: &Predicate,
        options: &FindOptions,
    ) -> RecordResult<Vec<Document>> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        self.inner.find_records(collection, filter, options).await
    }

    async fn count_records(&self, collection: &str, filter: &Predicate) -> RecordResult<u64> {
        self.inner.count_records(collection, filter).await
    }

    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Predicate,
        patch: Document,
        projection: &Projection,
    ) -> RecordResult<Option<Document>> {
        self.inner
            .find_one_and_update(collection, filter, patch, projection)
            .await
    }

    async fn find_one_and_delete(
        &self,
        collection: &str,
        filter: &Predicate,
        projection: &Projection,
    ) -> RecordResult<Option<Document>> {
        self.inner.find_one_and_delete(collection, filter, projection).await
    }

    async fn delete_records(&self, collection: &str, filter: &Predicate) -> RecordResult<u64> {
        self.inner.delete_records(collection, filter).await
    }

    async fn create_collection(&self, name: &str) -> RecordResult<()> {
        self.inner.create_collection(name).await
    }

    async fn drop_collection(&self, name: &str) -> RecordResult<()> {
        self.inner.drop_collection(name).await
    }

    async fn list_collections(&self) -> RecordResult<Vec<String>> {
        self.inner.list_collections().await
    }
}

async fn seeded() -> RecordService<CountingStore> {
    let service = RecordService::new(CountingStore::default());
    service
        .collection("tasks")
        .create_records(
            vec![
                doc! { "_id": 1, "state": "open" },
                doc! { "_id": 2, "state": "open" },
                doc! { "_id": 3, "state": "done" },
            ],
            "*",
            CreateOptions::default(),
        )
        .await
        .unwrap();
    service
}

#[tokio::test]
async fn id_only_changes_by_filter_skip_the_reread() {
    let service = seeded().await;
    let tasks = service.collection("tasks");
    let before = service.backend().finds();

    let merged = tasks
        .merge_records_by_filter(doc! { "state": "closed" }, "state = 'open'", "_id")
        .await
        .unwrap();
    assert_eq!(merged, vec![doc! { "_id": 1 }, doc! { "_id": 2 }]);
    assert_eq!(service.backend().finds(), before + 1);

    let updated = tasks
        .update_records_by_filter(doc! { "state": "new" }, "_id = 3", "_id")
        .await
        .unwrap();
    assert_eq!(updated, vec![doc! { "_id": 3 }]);
    assert_eq!(service.backend().finds(), before + 2);

    let list = tasks
        .retrieve_records_by_filter("state = 'closed'", "_id", RetrieveOptions::new())
        .await
        .unwrap();
    assert_eq!(list.records, vec![doc! { "_id": 1 }, doc! { "_id": 2 }]);
}

#[tokio::test]
async fn projected_changes_by_filter_read_the_result() {
    let service = seeded().await;
    let tasks = service.collection("tasks");
    let before = service.backend().finds();

    let merged = tasks
        .merge_records_by_filter(doc! { "state": "closed" }, "_id = 1", "state")
        .await
        .unwrap();
    assert_eq!(merged, vec![doc! { "_id": 1, "state": "closed" }]);
    assert_eq!(service.backend().finds(), before + 2);
}
