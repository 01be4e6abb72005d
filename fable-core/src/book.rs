//! Serde model of a single result returned by the books API.
//!
//! Scalar keys on [`Book`] are required but nullable: a missing key fails
//! decoding, whereas an explicit `null` is kept as `None` and stored as SQL
//! `NULL`. Column values are not type checked; any JSON scalar is accepted
//! and bound as is. The finished-reading pair and the two summary objects are
//! the only keys allowed to be absent.
#![forbid(unsafe_code)]

use serde::{Deserialize, Deserializer, de::Error as _};
use serde_json::Value;
use thiserror::Error;

/// One entry of a page's `results` array.
///
/// The wrapper describes how the requesting user relates to the book; the
/// book itself sits under `book`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BookWrapper {
    /// Where the book entered the user's library.
    #[serde(deserialize_with = "Option::deserialize")]
    pub source: Option<Scalar>,
    /// Favourite flag; the API sends either a boolean or a string.
    #[serde(deserialize_with = "Option::deserialize")]
    pub favorite: Option<Scalar>,
    /// Opaque ordering key supplied by the API.
    #[serde(deserialize_with = "Option::deserialize")]
    pub sort_value: Option<Scalar>,
    /// The nested book record.
    pub book: Book,
}

impl BookWrapper {
    /// Decode a wrapper from an already parsed JSON value.
    ///
    /// # Examples
    /// ```
    /// use fable_core::{BookWrapper, RecordError};
    /// use serde_json::json;
    ///
    /// let err = BookWrapper::from_value(json!({"source": "shelf"}))
    ///     .expect_err("a wrapper without a book is rejected");
    /// assert!(matches!(err, RecordError::Decode { .. }));
    /// ```
    pub fn from_value(value: Value) -> Result<Self, RecordError> {
        serde_json::from_value(value).map_err(|source| RecordError::Decode { source })
    }

    /// Identifier of the wrapped book, used as the foreign key of every row.
    #[must_use]
    pub fn book_id(&self) -> &str {
        &self.book.id
    }
}

/// Book metadata as served by the API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Book {
    /// Primary key of the `book` table; a JSON string or integer.
    #[serde(deserialize_with = "book_id_text")]
    pub id: String,
    /// Title.
    #[serde(deserialize_with = "Option::deserialize")]
    pub title: Option<Scalar>,
    /// Subtitle.
    #[serde(deserialize_with = "Option::deserialize")]
    pub subtitle: Option<Scalar>,
    /// Full size cover URL.
    #[serde(deserialize_with = "Option::deserialize")]
    pub cover_image: Option<Scalar>,
    /// Thumbnail cover URL.
    #[serde(deserialize_with = "Option::deserialize")]
    pub cover_image_small: Option<Scalar>,
    /// Publication date as sent by the API.
    #[serde(deserialize_with = "Option::deserialize")]
    pub published_date: Option<Scalar>,
    /// Embargo end date.
    #[serde(deserialize_with = "Option::deserialize")]
    pub embargoed_until: Option<Scalar>,
    /// Publisher imprint.
    #[serde(deserialize_with = "Option::deserialize")]
    pub imprint: Option<Scalar>,
    /// ISBN.
    #[serde(deserialize_with = "Option::deserialize")]
    pub isbn: Option<Scalar>,
    /// Catalogue the book record came from.
    #[serde(deserialize_with = "Option::deserialize")]
    pub source: Option<Scalar>,
    /// Publisher description.
    #[serde(deserialize_with = "Option::deserialize")]
    pub description: Option<Scalar>,
    /// Price in US dollars.
    #[serde(deserialize_with = "Option::deserialize")]
    pub price_usd: Option<Scalar>,
    /// Number of pages.
    #[serde(deserialize_with = "Option::deserialize")]
    pub page_count: Option<Scalar>,
    /// Number of chapters.
    #[serde(deserialize_with = "Option::deserialize")]
    pub chapter_count: Option<Scalar>,
    /// Editorial summary.
    #[serde(deserialize_with = "Option::deserialize")]
    pub fable_summary: Option<Scalar>,
    /// Discussion prompts document URL.
    #[serde(deserialize_with = "Option::deserialize")]
    pub fable_prompts_document: Option<Scalar>,
    /// Canonical web URL.
    #[serde(deserialize_with = "Option::deserialize")]
    pub url: Option<Scalar>,
    /// Audiobook reference.
    #[serde(deserialize_with = "Option::deserialize")]
    pub audiobook: Option<Scalar>,
    /// Book type (`type` in the payload).
    #[serde(rename = "type", deserialize_with = "Option::deserialize")]
    pub kind: Option<Scalar>,
    /// Whether the book has left the catalogue.
    #[serde(deserialize_with = "Option::deserialize")]
    pub is_out_of_catalog: Option<Scalar>,
    /// In-app purchase identifier.
    #[serde(deserialize_with = "Option::deserialize")]
    pub iap_identifier: Option<Scalar>,
    /// Whether the book is non-fiction.
    #[serde(deserialize_with = "Option::deserialize")]
    pub non_fiction: Option<Scalar>,
    /// When the user finished the book; only present on finished books.
    #[serde(default)]
    pub finished_reading_at: Option<Scalar>,
    /// Precision of [`Book::finished_reading_at`].
    #[serde(default)]
    pub finished_reading_date_type: Option<Scalar>,
    /// Credited authors.
    pub authors: Vec<Author>,
    /// Subject groups; each inner list is one group of categories.
    pub subjects: Vec<Vec<Option<Scalar>>>,
    /// Genres.
    pub genres: Vec<Genre>,
    /// Storygraph tags, when the API has them.
    #[serde(default)]
    pub storygraph_tags: Option<StorygraphTags>,
    /// Review summary, when the API has one.
    #[serde(default)]
    pub review_summary: Option<ReviewSummary>,
}

/// An author credited on a book.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Author {
    /// Display name.
    #[serde(deserialize_with = "Option::deserialize")]
    pub name: Option<Scalar>,
    /// Biography.
    #[serde(deserialize_with = "Option::deserialize")]
    pub biography: Option<Scalar>,
    /// URL slug.
    #[serde(deserialize_with = "Option::deserialize")]
    pub slug: Option<Scalar>,
}

/// A genre attached to a book.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Genre {
    /// Genre identifier.
    #[serde(deserialize_with = "Option::deserialize")]
    pub id: Option<Scalar>,
    /// Genre name.
    #[serde(deserialize_with = "Option::deserialize")]
    pub name: Option<Scalar>,
    /// Genre type (`type` in the payload).
    #[serde(rename = "type", deserialize_with = "Option::deserialize")]
    pub kind: Option<Scalar>,
}

/// Storygraph community tags. Each field is kept as raw JSON.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StorygraphTags {
    /// Mood tags.
    pub moods: Value,
    /// Genre tags.
    pub genres: Value,
    /// Content warnings.
    pub content_warnings: Value,
}

/// Aggregated reader sentiment.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReviewSummary {
    /// What readers liked.
    #[serde(deserialize_with = "Option::deserialize")]
    pub liked: Option<Scalar>,
    /// What readers disliked.
    #[serde(deserialize_with = "Option::deserialize")]
    pub disliked: Option<Scalar>,
    /// Where readers disagreed.
    #[serde(deserialize_with = "Option::deserialize")]
    pub disagreed: Option<Scalar>,
}

/// A loosely typed JSON scalar.
///
/// Used for fields whose type varies between records, such as `favorite`.
///
/// # Examples
/// ```
/// use fable_core::Scalar;
///
/// let flag: Scalar = serde_json::from_str("true").expect("boolean scalar");
/// assert_eq!(flag, Scalar::Flag(true));
/// let text: Scalar = serde_json::from_str("\"yes\"").expect("text scalar");
/// assert_eq!(text, Scalar::Text("yes".into()));
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// A JSON boolean.
    Flag(bool),
    /// A JSON number without a fractional part.
    Integer(i64),
    /// Any other JSON number.
    Real(f64),
    /// A JSON string.
    Text(String),
}

impl Scalar {
    /// The text payload, if this is a JSON string.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Flag(_) | Self::Integer(_) | Self::Real(_) => None,
        }
    }
}

impl From<&str> for Scalar {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

fn book_id_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Scalar::deserialize(deserializer)? {
        Scalar::Text(text) => Ok(text),
        Scalar::Integer(id) => Ok(id.to_string()),
        other => Err(D::Error::custom(format!(
            "book id must be a string or an integer, found {other:?}"
        ))),
    }
}

/// Errors raised while decoding or flattening a book record.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The record is missing a required key or has a key of the wrong type.
    #[error("failed to decode book record: {source}")]
    Decode {
        /// Error reported by `serde_json`.
        #[source]
        source: serde_json::Error,
    },
    /// A storygraph tag list could not be rendered as JSON text.
    #[error("failed to serialise storygraph {field} for book {book_id}")]
    Serialise {
        /// Book the tags belong to.
        book_id: String,
        /// Name of the tag list.
        field: &'static str,
        /// Error reported by `serde_json`.
        #[source]
        source: serde_json::Error,
    },
}
