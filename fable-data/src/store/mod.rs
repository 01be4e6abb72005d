//! SQLite store for imported books.
//!
//! The module is split into two focused submodules:
//! - [`schema`] materialises the seven tables backing the library.
//! - [`persistence`] writes decoded pages into those tables.
#![forbid(unsafe_code)]

mod persistence;
mod schema;

pub use persistence::{BookStore, PersistBooksError, PersistSummary};
pub use schema::{SCHEMA_VERSION, StoreSchemaError, initialise_schema};
