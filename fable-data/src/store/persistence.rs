#![forbid(unsafe_code)]

use std::{io, ops::AddAssign};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use fable_core::{BookRows, BookWrapper, RecordError, Scalar};
use log::debug;
use rusqlite::{Connection, Error as SqliteError, Transaction, params, types::Value as SqlValue};
use serde_json::Value;
use thiserror::Error;

use super::schema::{StoreSchemaError, initialise_schema};

/// Row counts written by one or more pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistSummary {
    /// Book wrappers persisted.
    pub books: usize,
    /// `author` rows written.
    pub authors: usize,
    /// `subject` rows written.
    pub subjects: usize,
    /// `genre` rows written.
    pub genres: usize,
}

impl PersistSummary {
    fn record(&mut self, rows: &BookRows<'_>) {
        self.books += 1;
        self.authors += rows.authors.len();
        self.subjects += rows.subjects.len();
        self.genres += rows.genres.len();
    }
}

impl AddAssign for PersistSummary {
    fn add_assign(&mut self, other: Self) {
        self.books += other.books;
        self.authors += other.authors;
        self.subjects += other.subjects;
        self.genres += other.genres;
    }
}

/// The single owner of the library database connection for an import run.
///
/// # Examples
/// ```
/// use fable_data::BookStore;
/// use fable_data::test_support::book_wrapper_json;
///
/// let mut store = BookStore::open_in_memory().expect("open store");
/// let summary = store
///     .persist_page(vec![book_wrapper_json("b1")])
///     .expect("persist page");
/// assert_eq!(summary.books, 1);
/// assert_eq!(summary.subjects, 3);
///
/// let authors: i64 = store
///     .connection()
///     .query_row("SELECT COUNT(*) FROM author WHERE book_id = 'b1'", [], |row| row.get(0))
///     .expect("count authors");
/// assert_eq!(authors, 2);
/// ```
#[derive(Debug)]
pub struct BookStore {
    connection: Connection,
    location: Option<Utf8PathBuf>,
}

impl BookStore {
    /// Open (or create) the database at `path`, creating parent directories.
    pub fn open(path: &Utf8Path) -> Result<Self, PersistBooksError> {
        ensure_parent_dir(path)?;
        let connection =
            Connection::open(path.as_std_path()).map_err(|source| PersistBooksError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        Self::initialise(connection, Some(path.to_path_buf()))
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, PersistBooksError> {
        let connection =
            Connection::open_in_memory().map_err(|source| PersistBooksError::Sqlite {
                operation: "open in-memory database",
                source,
            })?;
        Self::initialise(connection, None)
    }

    /// Take ownership of an existing connection.
    pub fn from_connection(connection: Connection) -> Result<Self, PersistBooksError> {
        Self::initialise(connection, None)
    }

    fn initialise(
        mut connection: Connection,
        location: Option<Utf8PathBuf>,
    ) -> Result<Self, PersistBooksError> {
        initialise_schema(&mut connection)?;
        Ok(Self {
            connection,
            location,
        })
    }

    /// Location of the database file, if it lives on disk.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8Path> {
        self.location.as_deref()
    }

    /// Borrow the underlying connection for queries.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Release the underlying connection.
    #[must_use]
    pub fn into_connection(self) -> Connection {
        self.connection
    }

    /// Persist one page of raw book wrappers inside a single transaction.
    ///
    /// Wrappers are decoded and written in order. The first failure aborts the
    /// page: the transaction is rolled back, so no row of this page is kept,
    /// and the error names the offending wrapper.
    ///
    /// Book rows are inserted with `INSERT OR IGNORE`; child rows are always
    /// inserted, so persisting the same page twice duplicates them.
    pub fn persist_page(
        &mut self,
        results: Vec<Value>,
    ) -> Result<PersistSummary, PersistBooksError> {
        let transaction = self
            .connection
            .transaction()
            .map_err(|source| PersistBooksError::Sqlite {
                operation: "begin page transaction",
                source,
            })?;

        let mut summary = PersistSummary::default();
        for (index, raw) in results.into_iter().enumerate() {
            let hint = book_id_hint(&raw);
            let wrapper = BookWrapper::from_value(raw).map_err(|source| {
                PersistBooksError::Record {
                    index,
                    book_id: hint.clone(),
                    source,
                }
            })?;
            let rows = wrapper.rows().map_err(|source| PersistBooksError::Record {
                index,
                book_id: hint,
                source,
            })?;
            insert_rows(&transaction, &rows)?;
            debug!("staged book {} ({} rows)", wrapper.book_id(), rows.row_count());
            summary.record(&rows);
        }

        transaction
            .commit()
            .map_err(|source| PersistBooksError::Sqlite {
                operation: "commit page transaction",
                source,
            })?;
        Ok(summary)
    }
}

fn book_id_hint(raw: &Value) -> Option<String> {
    match raw.get("book")?.get("id")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => id.as_i64().map(|number| number.to_string()),
        _ => None,
    }
}

fn insert_rows(
    transaction: &Transaction<'_>,
    rows: &BookRows<'_>,
) -> Result<(), PersistBooksError> {
    let book_id = rows.book.book.id.as_str();
    insert_book(transaction, rows)?;

    let mut author = prepare(
        transaction,
        "author",
        book_id,
        "INSERT INTO author (name, biography, slug, book_id) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for row in &rows.authors {
        author
            .execute((
                scalar_value(row.name),
                scalar_value(row.biography),
                scalar_value(row.slug),
                row.book_id,
            ))
            .map_err(|source| insert_error("author", book_id, source))?;
    }

    let mut subject = prepare(
        transaction,
        "subject",
        book_id,
        "INSERT INTO subject (category, book_id) VALUES (?1, ?2)",
    )?;
    for row in &rows.subjects {
        subject
            .execute((scalar_value(row.category), row.book_id))
            .map_err(|source| insert_error("subject", book_id, source))?;
    }

    let mut genre = prepare(
        transaction,
        "genre",
        book_id,
        "INSERT INTO genre (id, name, type, book_id) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for row in &rows.genres {
        genre
            .execute((
                scalar_value(row.id),
                scalar_value(row.name),
                scalar_value(row.kind),
                row.book_id,
            ))
            .map_err(|source| insert_error("genre", book_id, source))?;
    }

    let tags = &rows.storygraph_tag;
    prepare(
        transaction,
        "storygraph_tag",
        book_id,
        "INSERT INTO storygraph_tag (moods, genres, content_warnings, book_id)
            VALUES (?1, ?2, ?3, ?4)",
    )?
    .execute((&tags.moods, &tags.genres, &tags.content_warnings, tags.book_id))
    .map_err(|source| insert_error("storygraph_tag", book_id, source))?;

    let summary = &rows.review_summary;
    prepare(
        transaction,
        "review_summary",
        book_id,
        "INSERT INTO review_summary (liked, disliked, disagreed, book_id)
            VALUES (?1, ?2, ?3, ?4)",
    )?
    .execute((
        scalar_value(summary.liked),
        scalar_value(summary.disliked),
        scalar_value(summary.disagreed),
        summary.book_id,
    ))
    .map_err(|source| insert_error("review_summary", book_id, source))?;

    let interaction = &rows.user_interaction;
    prepare(
        transaction,
        "users",
        book_id,
        "INSERT INTO users (source, favorite, sort_value, book_id) VALUES (?1, ?2, ?3, ?4)",
    )?
    .execute((
        scalar_value(interaction.source),
        scalar_value(interaction.favorite),
        scalar_value(interaction.sort_value),
        interaction.book_id,
    ))
    .map_err(|source| insert_error("users", book_id, source))?;

    Ok(())
}

fn insert_book(
    transaction: &Transaction<'_>,
    rows: &BookRows<'_>,
) -> Result<(), PersistBooksError> {
    let row = &rows.book;
    let book = row.book;
    transaction
        .prepare_cached(
            "INSERT OR IGNORE INTO book (
                id, title, subtitle, cover_image, cover_image_small, published_date,
                embargoed_until, imprint, isbn, source, description, price_usd,
                page_count, chapter_count, fable_summary, fable_prompts_document, url,
                audiobook, type, is_out_of_catalog, iap_identifier, non_fiction,
                finished_reading_at, finished_reading_date_type
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24
            )",
        )
        .map_err(|source| insert_error("book", &book.id, source))?
        .execute(params![
            book.id,
            scalar_value(book.title.as_ref()),
            scalar_value(book.subtitle.as_ref()),
            scalar_value(book.cover_image.as_ref()),
            scalar_value(book.cover_image_small.as_ref()),
            scalar_value(book.published_date.as_ref()),
            scalar_value(book.embargoed_until.as_ref()),
            scalar_value(book.imprint.as_ref()),
            scalar_value(book.isbn.as_ref()),
            scalar_value(book.source.as_ref()),
            scalar_value(book.description.as_ref()),
            scalar_value(book.price_usd.as_ref()),
            scalar_value(book.page_count.as_ref()),
            scalar_value(book.chapter_count.as_ref()),
            scalar_value(book.fable_summary.as_ref()),
            scalar_value(book.fable_prompts_document.as_ref()),
            scalar_value(book.url.as_ref()),
            scalar_value(book.audiobook.as_ref()),
            scalar_value(book.kind.as_ref()),
            scalar_value(book.is_out_of_catalog.as_ref()),
            scalar_value(book.iap_identifier.as_ref()),
            scalar_value(book.non_fiction.as_ref()),
            scalar_value(Some(row.finished_reading_at)),
            scalar_value(Some(row.finished_reading_date_type)),
        ])
        .map_err(|source| insert_error("book", &book.id, source))?;
    Ok(())
}

fn prepare<'t>(
    transaction: &'t Transaction<'_>,
    table: &'static str,
    book_id: &str,
    sql: &str,
) -> Result<rusqlite::CachedStatement<'t>, PersistBooksError> {
    transaction
        .prepare_cached(sql)
        .map_err(|source| insert_error(table, book_id, source))
}

fn insert_error(table: &'static str, book_id: &str, source: SqliteError) -> PersistBooksError {
    PersistBooksError::Insert {
        table,
        book_id: book_id.to_owned(),
        source,
    }
}

fn scalar_value(scalar: Option<&Scalar>) -> SqlValue {
    match scalar {
        None => SqlValue::Null,
        Some(Scalar::Flag(flag)) => SqlValue::Integer(i64::from(*flag)),
        Some(Scalar::Integer(value)) => SqlValue::Integer(*value),
        Some(Scalar::Real(value)) => SqlValue::Real(*value),
        Some(Scalar::Text(text)) => SqlValue::Text(text.clone()),
    }
}

fn ensure_parent_dir(path: &Utf8Path) -> Result<(), PersistBooksError> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_str().is_empty() {
        return Ok(());
    }

    let create = |source: io::Error| PersistBooksError::CreateDirectory {
        path: parent.to_path_buf(),
        source,
    };
    let (base, relative) = if parent.is_absolute() {
        let root = parent.ancestors().last().unwrap_or(parent);
        let relative = parent.strip_prefix(root).unwrap_or(parent);
        (root, relative)
    } else {
        (Utf8Path::new("."), parent)
    };
    if relative.as_str().is_empty() {
        return Ok(());
    }
    fs_utf8::Dir::open_ambient_dir(base, ambient_authority())
        .and_then(|dir| dir.create_dir_all(relative))
        .map_err(create)
}

/// Errors raised when persisting books.
#[derive(Debug, Error)]
pub enum PersistBooksError {
    /// The database's parent directory could not be created.
    #[error("failed to create parent directory {path:?}: {source}")]
    CreateDirectory {
        /// Directory that could not be created.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Opening the database failed.
    #[error("failed to open SQLite database at {path:?}: {source}")]
    Open {
        /// Database path.
        path: Utf8PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// The schema could not be initialised.
    #[error(transparent)]
    Schema(#[from] StoreSchemaError),
    /// A result could not be decoded into book rows.
    #[error(
        "result {index} (book {}) is not a valid book record: {source}",
        .book_id.as_deref().unwrap_or("<unknown>")
    )]
    Record {
        /// Position of the wrapper within its page.
        index: usize,
        /// Book id, when the payload carried one.
        book_id: Option<String>,
        /// Decoding error.
        #[source]
        source: RecordError,
    },
    /// Writing a row failed.
    #[error("failed to insert {table} row for book {book_id}: {source}")]
    Insert {
        /// Target table.
        table: &'static str,
        /// Book being written.
        book_id: String,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// A transaction-level operation failed.
    #[error("failed to {operation}: {source}")]
    Sqlite {
        /// Operation being performed.
        operation: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
}
