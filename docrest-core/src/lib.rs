//! A REST-style record CRUD layer over JSON document databases.
//!
//! This crate is the core of the docrest project and provides:
//!
//! - **Literal inference** ([`literal`]) - Typing of unquoted filter values and ids
//! - **Filter compiler** ([`lexer`], [`filter`]) - Filter strings to [`predicate::Predicate`] trees
//! - **Identifier normalization** ([`id`]) - External string/number ids to native ids and back
//! - **Projection and sorting** ([`projection`], [`sort`]) - Field lists and sort specifications
//! - **Store backend abstraction** ([`backend`]) - Traits for implementing storage backends
//! - **Record operations** ([`collection`]) - Create, update, merge, delete and retrieve
//! - **Record service** ([`service`]) - Entry point owning a backend and its configuration
//! - **Error handling** ([`error`]) - Error types and result types
//!
//! # Example
//!
//! ```ignore
//! use bson::doc;
//! use docrest::prelude::*;
//!
//! let service = RecordService::new(InMemoryStore::new());
//! let users = service.collection("users");
//!
//! users.create_record(doc! { "name": "Alice", "age": 31 }, "*").await?;
//!
//! let adults = users
//!     .retrieve_records_by_filter("age >= 21 and name like 'A%'", "name", RetrieveOptions::new())
//!     .await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docrest_core;

pub mod backend;
pub mod collection;
pub mod config;
pub mod error;
pub mod filter;
pub mod id;
pub mod lexer;
pub mod literal;
pub mod options;
pub mod predicate;
pub mod projection;
pub mod record;
pub mod response;
pub mod service;
pub mod sort;
