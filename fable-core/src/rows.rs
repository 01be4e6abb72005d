//! Decomposition of a [`BookWrapper`] into flat relational rows.
//!
//! One wrapper yields a single book row, a row per author, genre and leaf
//! subject, exactly one storygraph tag row, exactly one review summary row and
//! one user interaction row. Every child row carries the book id.
#![forbid(unsafe_code)]

use serde_json::Value;

use crate::{
    book::{Book, BookWrapper, RecordError, ReviewSummary, Scalar, StorygraphTags},
    json_text::to_spaced_ascii,
};

/// Stand-in for optional text that is stored as an empty string.
static EMPTY_TEXT: Scalar = Scalar::Text(String::new());

/// All rows produced for one book wrapper.
#[derive(Debug, Clone, PartialEq)]
pub struct BookRows<'a> {
    /// The parent `book` row.
    pub book: BookRow<'a>,
    /// One row per credited author.
    pub authors: Vec<AuthorRow<'a>>,
    /// One row per leaf subject string, groups flattened in order.
    pub subjects: Vec<SubjectRow<'a>>,
    /// One row per genre.
    pub genres: Vec<GenreRow<'a>>,
    /// Always present, empty strings when the payload had no tags.
    pub storygraph_tag: StorygraphTagRow<'a>,
    /// Always present, empty strings when the payload had no summary.
    pub review_summary: ReviewSummaryRow<'a>,
    /// Relationship between the requesting user and the book.
    pub user_interaction: UserInteractionRow<'a>,
}

impl BookRows<'_> {
    /// Total number of rows, parent included.
    #[must_use]
    pub fn row_count(&self) -> usize {
        // book, storygraph tag, review summary, user interaction
        4 + self.authors.len() + self.subjects.len() + self.genres.len()
    }
}

/// The `book` row.
///
/// Scalar columns are read straight from [`Book`]; only the finished-reading
/// pair is resolved here because absent values become empty strings.
#[derive(Debug, Clone, PartialEq)]
pub struct BookRow<'a> {
    /// The decoded book.
    pub book: &'a Book,
    /// `finished_reading_at`, or `""` when absent or null.
    pub finished_reading_at: &'a Scalar,
    /// `finished_reading_date_type`, or `""` when absent or null.
    pub finished_reading_date_type: &'a Scalar,
}

/// An `author` row.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorRow<'a> {
    /// Foreign key to `book.id`.
    pub book_id: &'a str,
    /// Author name.
    pub name: Option<&'a Scalar>,
    /// Author biography.
    pub biography: Option<&'a Scalar>,
    /// Author slug.
    pub slug: Option<&'a Scalar>,
}

/// A `subject` row.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectRow<'a> {
    /// Foreign key to `book.id`.
    pub book_id: &'a str,
    /// One leaf of a subject group.
    pub category: Option<&'a Scalar>,
}

/// A `genre` row.
#[derive(Debug, Clone, PartialEq)]
pub struct GenreRow<'a> {
    /// Foreign key to `book.id`.
    pub book_id: &'a str,
    /// Genre identifier as sent by the API.
    pub id: Option<&'a Scalar>,
    /// Genre name.
    pub name: Option<&'a Scalar>,
    /// Genre type.
    pub kind: Option<&'a Scalar>,
}

/// A `storygraph_tag` row holding JSON-encoded tag lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorygraphTagRow<'a> {
    /// Foreign key to `book.id`.
    pub book_id: &'a str,
    /// Moods as spaced ASCII JSON text, or `""`.
    pub moods: String,
    /// Genres as JSON text, or `""`.
    pub genres: String,
    /// Content warnings as JSON text, or `""`.
    pub content_warnings: String,
}

impl<'a> StorygraphTagRow<'a> {
    fn empty(book_id: &'a str) -> Self {
        Self {
            book_id,
            moods: String::new(),
            genres: String::new(),
            content_warnings: String::new(),
        }
    }

    fn from_tags(book_id: &'a str, tags: &StorygraphTags) -> Result<Self, RecordError> {
        Ok(Self {
            book_id,
            moods: encode_tags(book_id, "moods", &tags.moods)?,
            genres: encode_tags(book_id, "genres", &tags.genres)?,
            content_warnings: encode_tags(book_id, "content_warnings", &tags.content_warnings)?,
        })
    }
}

/// A `review_summary` row.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewSummaryRow<'a> {
    /// Foreign key to `book.id`.
    pub book_id: &'a str,
    /// What readers liked, `""` when the summary was absent.
    pub liked: Option<&'a Scalar>,
    /// What readers disliked, `""` when the summary was absent.
    pub disliked: Option<&'a Scalar>,
    /// Where readers disagreed, `""` when the summary was absent.
    pub disagreed: Option<&'a Scalar>,
}

impl<'a> ReviewSummaryRow<'a> {
    fn empty(book_id: &'a str) -> Self {
        Self {
            book_id,
            liked: Some(&EMPTY_TEXT),
            disliked: Some(&EMPTY_TEXT),
            disagreed: Some(&EMPTY_TEXT),
        }
    }

    fn from_summary(book_id: &'a str, summary: &'a ReviewSummary) -> Self {
        Self {
            book_id,
            liked: summary.liked.as_ref(),
            disliked: summary.disliked.as_ref(),
            disagreed: summary.disagreed.as_ref(),
        }
    }
}

/// A `users` row describing the requesting user's copy of the book.
#[derive(Debug, Clone, PartialEq)]
pub struct UserInteractionRow<'a> {
    /// Foreign key to `book.id`.
    pub book_id: &'a str,
    /// Wrapper `source`.
    pub source: Option<&'a Scalar>,
    /// Wrapper `favorite`.
    pub favorite: Option<&'a Scalar>,
    /// Wrapper `sort_value`.
    pub sort_value: Option<&'a Scalar>,
}

impl BookWrapper {
    /// Flatten the wrapper into the rows persisted for it.
    ///
    /// # Examples
    /// ```
    /// use fable_core::BookWrapper;
    /// use serde_json::json;
    ///
    /// let wrapper = BookWrapper::from_value(json!({
    ///     "source": "library", "favorite": false, "sort_value": "1",
    ///     "book": {
    ///         "id": "b1", "title": "Middlemarch", "subtitle": null,
    ///         "cover_image": null, "cover_image_small": null,
    ///         "published_date": "1871-12-01", "embargoed_until": null,
    ///         "imprint": null, "isbn": null, "source": null,
    ///         "description": null, "price_usd": null, "page_count": 880,
    ///         "chapter_count": 86, "fable_summary": null,
    ///         "fable_prompts_document": null, "url": null, "audiobook": null,
    ///         "type": "book", "is_out_of_catalog": false,
    ///         "iap_identifier": null, "non_fiction": false,
    ///         "authors": [], "subjects": [["Fiction", "Classics"], ["Drama"]],
    ///         "genres": [], "storygraph_tags": null, "review_summary": null
    ///     }
    /// }))?;
    ///
    /// let rows = wrapper.rows()?;
    /// assert_eq!(rows.subjects.len(), 3);
    /// assert_eq!(rows.storygraph_tag.moods, "");
    /// assert_eq!(rows.book.finished_reading_at.as_text(), Some(""));
    /// # Ok::<(), fable_core::RecordError>(())
    /// ```
    pub fn rows(&self) -> Result<BookRows<'_>, RecordError> {
        let book = &self.book;
        let book_id = book.id.as_str();

        let storygraph_tag = match &book.storygraph_tags {
            Some(tags) => StorygraphTagRow::from_tags(book_id, tags)?,
            None => StorygraphTagRow::empty(book_id),
        };
        let review_summary = book.review_summary.as_ref().map_or_else(
            || ReviewSummaryRow::empty(book_id),
            |summary| ReviewSummaryRow::from_summary(book_id, summary),
        );

        Ok(BookRows {
            book: BookRow {
                book,
                finished_reading_at: book.finished_reading_at.as_ref().unwrap_or(&EMPTY_TEXT),
                finished_reading_date_type: book
                    .finished_reading_date_type
                    .as_ref()
                    .unwrap_or(&EMPTY_TEXT),
            },
            authors: book
                .authors
                .iter()
                .map(|author| AuthorRow {
                    book_id,
                    name: author.name.as_ref(),
                    biography: author.biography.as_ref(),
                    slug: author.slug.as_ref(),
                })
                .collect(),
            subjects: book
                .subjects
                .iter()
                .flatten()
                .map(|category| SubjectRow {
                    book_id,
                    category: category.as_ref(),
                })
                .collect(),
            genres: book
                .genres
                .iter()
                .map(|genre| GenreRow {
                    book_id,
                    id: genre.id.as_ref(),
                    name: genre.name.as_ref(),
                    kind: genre.kind.as_ref(),
                })
                .collect(),
            storygraph_tag,
            review_summary,
            user_interaction: UserInteractionRow {
                book_id,
                source: self.source.as_ref(),
                favorite: self.favorite.as_ref(),
                sort_value: self.sort_value.as_ref(),
            },
        })
    }
}

fn encode_tags(book_id: &str, field: &'static str, value: &Value) -> Result<String, RecordError> {
    to_spaced_ascii(value).map_err(|source| RecordError::Serialise {
        book_id: book_id.to_owned(),
        field,
        source,
    })
}
