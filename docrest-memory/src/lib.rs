//! In-memory record storage backend for docrest.
//!
//! This crate provides a thread-safe, in-memory implementation of the `RecordBackend` trait.
//! It uses async-aware read-write locks for concurrent access and suits development, tests
//! and small deployments.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using an async-aware RwLock
//! - **Ordered storage** - Records come back in insertion order unless sorted
//! - **Full predicate support** - Comparisons, membership, patterns and boolean logic
//! - **Required fields** - Optional per-collection validation for exercising write failures
//!
//! # Quick Start
//!
//! ```ignore
//! use docrest::{RecordService, backend::RecordBackendBuilder, memory::InMemoryStore};
//! use bson::doc;
//!
//! let backend = InMemoryStore::builder()
//!     .with_required_fields("users", ["name"])
//!     .build()
//!     .await?;
//! let service = RecordService::new(backend);
//!
//! service
//!     .collection("users")
//!     .create_record(doc! { "name": "Alice" }, "*")
//!     .await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docrest_memory;

pub mod evaluator;
pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
