//! Facade crate for the Fable library importer.
//!
//! This crate re-exports the book record model and the fetch/persist pipeline
//! so callers can drive an import without depending on each member crate.

#![forbid(unsafe_code)]

pub use fable_core::{
    Author, Book, BookRows, BookWrapper, Genre, RecordError, ReviewSummary, Scalar, StorygraphTags,
};

pub use fable_data::{
    BookStore, HttpPageSource, HttpPageSourceConfig, ImportError, ImportReport, Page,
    PageFetchError, PageFetcher, PageSource, PageUrl, PersistBooksError, PersistSummary,
    SourceBuildError, StoreSchemaError, TransportError, import_all,
};
