//! Main docrest crate providing a REST-style record interface over document stores.
//!
//! This crate is the primary entry point for users of docrest. It re-exports the core types
//! and functionality from the sub-crates and provides access to the storage backends.
//!
//! # Features
//!
//! - **Record operations** - Create, update, merge, delete and retrieve records by id, by
//!   embedded id or by filter
//! - **Filter strings** - `age >= 21 and name like 'A%'` compiled to backend-neutral predicates
//! - **Batch outcomes** - One success or error per record, in request order
//! - **Multiple backends** - In-memory and MongoDB storage behind one trait
//!
//! # Quick Start
//!
//! ```ignore
//! use docrest::{prelude::*, memory::InMemoryStore};
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> RecordResult<()> {
//!     let service = RecordService::new(InMemoryStore::builder().build().await?);
//!     let users = service.collection("users");
//!
//!     let created = users
//!         .create_records(
//!             vec![doc! { "name": "Alice", "age": 31 }, doc! { "name": "Bob", "age": 17 }],
//!             "*",
//!             CreateOptions::default(),
//!         )
//!         .await?;
//!
//!     let adults = users
//!         .retrieve_records_by_filter(
//!             "age >= 21",
//!             "name",
//!             RetrieveOptions::new().with_sort("name").with_count(),
//!         )
//!         .await?;
//!     println!("{}", serde_json::to_string(&adults)?);
//!
//!     service.shutdown().await
//! }
//! ```
//!
//! # Dynamic Dispatch
//!
//! A service can be converted to one over a boxed backend with
//! [`RecordService::boxed`](service::RecordService::boxed), allowing the store to be chosen
//! at runtime:
//!
//! ```ignore
//! let service: DynRecordService = if use_mongo {
//!     RecordService::new(MongoDbStore::builder(dsn, "shop").build().await?).boxed()
//! } else {
//!     RecordService::new(InMemoryStore::new()).boxed()
//! };
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - `mongodb` - Persistent MongoDB backend (requires the `mongodb` feature)

pub mod prelude;

pub use docrest_core::{
    backend, collection, config, error, filter, id, lexer, literal, options, predicate,
    projection, record, response, service, sort,
};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docrest_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docrest_mongodb::{MongoDbConfig, MongoDbStore, MongoDbStoreBuilder};
}
