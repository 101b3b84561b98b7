//! MongoDB backend implementation for docrest.
//!
//! This crate provides a MongoDB-based implementation of the `RecordBackend` trait. Predicate
//! trees are translated to MongoDB query documents and executed by the server.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docrest = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Features
//!
//! - **Native queries** - Filters, projections, sorting and paging run on the server
//! - **Batch inserts** - Ordered or unordered `insert_many` with per-record write errors
//! - **Atomic single-record changes** - `findOneAndUpdate` / `findOneAndDelete`
//! - **Configuration** - [`MongoDbConfig`] resolves DSN, database and credentials
//!
//! # Example
//!
//! ```ignore
//! use docrest::{backend::RecordBackendBuilder, mongodb::MongoDbStore};
//!
//! let store = MongoDbStore::builder("mongodb://localhost:27017", "shop")
//!     .build()
//!     .await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docrest_mongodb;

pub mod config;
pub mod query;
pub mod store;

pub use config::MongoDbConfig;
pub use store::{MongoDbStore, MongoDbStoreBuilder};
