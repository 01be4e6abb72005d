//! Fetching and persistence for the Fable library importer.
//!
//! Responsibilities:
//! - Walk the paginated books API by following each page's `next` cursor.
//! - Persist each page's book records into SQLite inside one transaction.
//!
//! Boundaries:
//! - Record shape and flattening rules live in `fable-core`.
//! - Runtime construction and configuration belong to the CLI.
//!
//! Invariants:
//! - One request in flight at a time; pages are processed in order.
//! - No global mutable state: the database handle is owned by [`store::BookStore`].
#![forbid(unsafe_code)]

pub mod import;
pub mod pages;
pub mod store;

#[doc(hidden)]
pub mod test_support;

pub use import::{ImportError, ImportReport, import_all};
pub use pages::{
    HttpPageSource, HttpPageSourceConfig, Page, PageFetchError, PageFetcher, PageSource, PageUrl,
    SourceBuildError, TransportError,
};
pub use store::{BookStore, PersistBooksError, PersistSummary, StoreSchemaError};
