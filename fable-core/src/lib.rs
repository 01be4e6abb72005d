//! Core record types for the Fable library importer.
//!
//! The [`book`] module mirrors the JSON payload returned by the paginated
//! books API. The [`rows`] module flattens one decoded record into the rows
//! written to the relational store. Nothing here performs I/O; persistence
//! lives in `fable-data`.
#![forbid(unsafe_code)]

pub mod book;
mod json_text;
pub mod rows;

pub use book::{
    Author, Book, BookWrapper, Genre, RecordError, ReviewSummary, Scalar, StorygraphTags,
};
pub use rows::{
    AuthorRow, BookRow, BookRows, GenreRow, ReviewSummaryRow, StorygraphTagRow, SubjectRow,
    UserInteractionRow,
};
