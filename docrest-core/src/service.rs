//! Main record service interface.
//!
//! A [`RecordService`] owns a backend and the service configuration, and hands out
//! [`RecordCollection`] handles. [`DynRecordService`] is the same service over a boxed
//! backend, for selecting the store at runtime.
//!
//! # Example
//!
//! ```ignore
//! use docrest::service::RecordService;
//! use docrest::memory::InMemoryStore;
//!
//! let service = RecordService::new(InMemoryStore::new());
//! let users = service.collection("users");
//! let user = users.retrieve_record_by_id("42", "*").await?;
//! ```

use tracing::debug;

use crate::{
    backend::RecordBackend,
    collection::RecordCollection,
    config::ServiceConfig,
    error::{Operation, RecordError, RecordResult},
};

/// A record service bound to a specific backend implementation.
///
/// # Type Parameters
///
/// * `B` - The backend implementation type
#[derive(Debug)]
pub struct RecordService<B: RecordBackend> {
    backend: B,
    config: ServiceConfig,
}

/// A record service over a backend chosen at runtime.
pub type DynRecordService = RecordService<Box<dyn RecordBackend>>;

impl<B: RecordBackend> RecordService<B> {
    /// Creates a new service with the default configuration, keyed by the backend's id field.
    pub fn new(backend: B) -> Self {
        let config = ServiceConfig::default().with_id_field(backend.id_field());
        Self { backend, config }
    }

    /// Creates a service with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Initialization`] when the configured id field differs from the
    /// one the backend keys records by.
    pub fn with_config(backend: B, config: ServiceConfig) -> RecordResult<Self> {
        if config.id_field != backend.id_field() {
            return Err(RecordError::Initialization(format!(
                "id field '{}' does not match the backend id field '{}'",
                config.id_field,
                backend.id_field()
            )));
        }
        Ok(Self { backend, config })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Gets a handle to the collection with the given name.
    ///
    /// The collection does not need to exist; backends create collections on first write.
    pub fn collection(&self, name: &str) -> RecordCollection<'_, B> {
        RecordCollection::new(name.to_string(), &self.backend, &self.config)
    }

    /// Creates a new collection with the given name.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection already exists or creation fails.
    pub async fn create_collection(&self, name: &str) -> RecordResult<()> {
        debug!(collection = name, "creating collection");

        self.backend
            .create_collection(name)
            .await
            .map_err(|err| err.during(Operation::CreateCollection, name))
    }

    /// Drops a collection and all of its records.
    pub async fn drop_collection(&self, name: &str) -> RecordResult<()> {
        debug!(collection = name, "dropping collection");

        self.backend
            .drop_collection(name)
            .await
            .map_err(|err| err.during(Operation::DropCollection, name))
    }

    /// Lists all collections in the store.
    pub async fn list_collections(&self) -> RecordResult<Vec<String>> {
        self.backend
            .list_collections()
            .await
            .map_err(|err| err.during(Operation::ListCollections, "*"))
    }

    /// Shuts down the service and releases backend resources.
    pub async fn shutdown(self) -> RecordResult<()> {
        self.backend.shutdown().await
    }

    /// Converts into a service over a boxed backend.
    pub fn boxed(self) -> DynRecordService
    where
        B: 'static,
    {
        RecordService {
            backend: Box::new(self.backend),
            config: self.config,
        }
    }
}
