//! Convenient re-exports of commonly used types from docrest.
//!
//! ```ignore
//! use docrest::prelude::*;
//! ```

pub use docrest_core::{
    backend::{Change, FindOptions, RecordBackend, RecordBackendBuilder, WriteStatus},
    collection::RecordCollection,
    config::ServiceConfig,
    error::{Operation, RecordError, RecordResult},
    filter::{FilterSource, compile},
    id::{IdList, RecordId},
    options::{CreateOptions, RetrieveOptions},
    predicate::{CompareOp, PatternKind, Predicate, PredicateVisitor},
    projection::{FieldList, Projection},
    record::RecordSet,
    response::{ListMeta, Outcome, OutcomeError, RecordList},
    service::{DynRecordService, RecordService},
    sort::{SortDirection, SortKey, SortSpec},
};
