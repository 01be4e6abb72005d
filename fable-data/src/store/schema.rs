#![forbid(unsafe_code)]

use rusqlite::{Connection, Error as SqliteError, Transaction};
use thiserror::Error;

/// Version recorded in `PRAGMA user_version` once the schema exists.
pub const SCHEMA_VERSION: i64 = 1;

const CHILD_TABLES: [&str; 6] = [
    "author",
    "subject",
    "genre",
    "storygraph_tag",
    "review_summary",
    "users",
];

/// Initialise the library schema inside an existing SQLite database.
///
/// Foreign keys are enabled, the seven tables and their `book_id` indexes are
/// created if missing, and the schema version is recorded. Databases written
/// before versioning (version `0`) are adopted as-is; any other version is
/// rejected.
///
/// # Examples
/// ```
/// use rusqlite::Connection;
/// use fable_data::store::initialise_schema;
///
/// let mut conn = Connection::open_in_memory().expect("create in-memory database");
/// initialise_schema(&mut conn).expect("create schema");
///
/// let tables: i64 = conn
///     .query_row(
///         "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'",
///         [],
///         |row| row.get(0),
///     )
///     .expect("count tables");
/// assert_eq!(tables, 7);
/// ```
pub fn initialise_schema(connection: &mut Connection) -> Result<(), StoreSchemaError> {
    connection
        .pragma_update(None, "foreign_keys", true)
        .map_err(|source| StoreSchemaError::ForeignKeys { source })?;

    let transaction = connection
        .transaction()
        .map_err(|source| StoreSchemaError::Migration {
            step: "begin schema transaction",
            source,
        })?;

    check_schema_version(&transaction)?;
    create_book_table(&transaction)?;
    create_child_tables(&transaction)?;
    create_indexes(&transaction)?;
    transaction
        .pragma_update(None, "user_version", SCHEMA_VERSION)
        .map_err(|source| StoreSchemaError::Migration {
            step: "record schema version",
            source,
        })?;

    transaction
        .commit()
        .map_err(|source| StoreSchemaError::Migration {
            step: "commit schema transaction",
            source,
        })?;

    Ok(())
}

fn check_schema_version(transaction: &Transaction<'_>) -> Result<(), StoreSchemaError> {
    let found: i64 = transaction
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|source| StoreSchemaError::Migration {
            step: "read schema version",
            source,
        })?;
    if found == 0 || found == SCHEMA_VERSION {
        Ok(())
    } else {
        Err(StoreSchemaError::VersionMismatch {
            expected: SCHEMA_VERSION,
            found,
        })
    }
}

fn create_book_table(transaction: &Transaction<'_>) -> Result<(), StoreSchemaError> {
    run_migration_step(
        transaction,
        "create book",
        "CREATE TABLE IF NOT EXISTS book (
            id TEXT PRIMARY KEY,
            title TEXT,
            subtitle TEXT,
            cover_image TEXT,
            cover_image_small TEXT,
            published_date TEXT,
            embargoed_until TEXT,
            imprint TEXT,
            isbn TEXT,
            source TEXT,
            description TEXT,
            price_usd REAL,
            page_count INTEGER,
            chapter_count INTEGER,
            fable_summary TEXT,
            fable_prompts_document TEXT,
            url TEXT,
            audiobook TEXT,
            type TEXT,
            is_out_of_catalog BOOLEAN,
            iap_identifier TEXT,
            non_fiction BOOLEAN,
            finished_reading_at TEXT,
            finished_reading_date_type TEXT
        )",
    )
}

fn create_child_tables(transaction: &Transaction<'_>) -> Result<(), StoreSchemaError> {
    run_migration_step(
        transaction,
        "create author",
        "CREATE TABLE IF NOT EXISTS author (
            name TEXT,
            biography TEXT,
            slug TEXT,
            book_id TEXT,
            FOREIGN KEY (book_id) REFERENCES book(id)
        )",
    )?;
    run_migration_step(
        transaction,
        "create subject",
        "CREATE TABLE IF NOT EXISTS subject (
            category TEXT,
            book_id TEXT,
            FOREIGN KEY (book_id) REFERENCES book(id)
        )",
    )?;
    run_migration_step(
        transaction,
        "create genre",
        "CREATE TABLE IF NOT EXISTS genre (
            id TEXT,
            name TEXT,
            type TEXT,
            book_id TEXT,
            FOREIGN KEY (book_id) REFERENCES book(id)
        )",
    )?;
    run_migration_step(
        transaction,
        "create storygraph_tag",
        "CREATE TABLE IF NOT EXISTS storygraph_tag (
            moods TEXT,
            genres TEXT,
            content_warnings TEXT,
            book_id TEXT,
            FOREIGN KEY (book_id) REFERENCES book(id)
        )",
    )?;
    run_migration_step(
        transaction,
        "create review_summary",
        "CREATE TABLE IF NOT EXISTS review_summary (
            liked TEXT,
            disliked TEXT,
            disagreed TEXT,
            book_id TEXT,
            FOREIGN KEY (book_id) REFERENCES book(id)
        )",
    )?;
    run_migration_step(
        transaction,
        "create users",
        "CREATE TABLE IF NOT EXISTS users (
            source TEXT,
            favorite TEXT,
            sort_value TEXT,
            book_id TEXT,
            FOREIGN KEY (book_id) REFERENCES book(id)
        )",
    )
}

fn create_indexes(transaction: &Transaction<'_>) -> Result<(), StoreSchemaError> {
    for table in CHILD_TABLES {
        transaction
            .execute(
                &format!("CREATE INDEX IF NOT EXISTS idx_{table}_book_id ON {table}(book_id)"),
                [],
            )
            .map_err(|source| StoreSchemaError::Migration {
                step: "index child table",
                source,
            })?;
    }
    Ok(())
}

fn run_migration_step(
    transaction: &Transaction<'_>,
    step: &'static str,
    sql: &str,
) -> Result<(), StoreSchemaError> {
    transaction
        .execute(sql, [])
        .map(|_| ())
        .map_err(|source| StoreSchemaError::Migration { step, source })
}

/// Errors raised when initialising the library schema.
#[derive(Debug, Error)]
pub enum StoreSchemaError {
    /// `PRAGMA foreign_keys` could not be enabled.
    #[error("failed to enable SQLite foreign keys: {source}")]
    ForeignKeys {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// A schema statement failed.
    #[error("failed to execute migration step '{step}': {source}")]
    Migration {
        /// Short description of the step.
        step: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// The database was created by an incompatible version.
    #[error("expected library schema version {expected} but found {found}")]
    VersionMismatch {
        /// Version this build writes.
        expected: i64,
        /// Version found in the database.
        found: i64,
    },
}
