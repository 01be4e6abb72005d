//! Page envelope and cursor types.

use std::{fmt, str::FromStr};

use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::PageFetchError;

/// Absolute URL of one page of results.
///
/// # Examples
/// ```
/// use fable_data::PageUrl;
///
/// let first = PageUrl::parse("https://api.fable.test/books/?page=1").expect("valid URL");
/// let second = first.resolve_next("?page=2").expect("relative cursor");
/// assert_eq!(second.as_str(), "https://api.fable.test/books/?page=2");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageUrl(Url);

impl PageUrl {
    /// Parse an absolute URL.
    pub fn parse(raw: &str) -> Result<Self, url::ParseError> {
        Url::parse(raw.trim()).map(Self)
    }

    /// Resolve a `next` cursor against this page.
    ///
    /// Absolute cursors are returned unchanged; relative ones are joined onto
    /// the current URL.
    pub fn resolve_next(&self, cursor: &str) -> Result<Self, url::ParseError> {
        self.0.join(cursor.trim()).map(Self)
    }

    /// The URL as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for PageUrl {
    type Err = url::ParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse(raw)
    }
}

impl AsRef<str> for PageUrl {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for PageUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// URL the page was fetched from.
    pub url: PageUrl,
    /// Raw book wrappers; decoding happens during persistence.
    pub results: Vec<Value>,
    /// Resolved cursor of the following page, `None` on the last page.
    pub next: Option<PageUrl>,
}

impl Page {
    /// Decode a response body fetched from `url`.
    ///
    /// Both `results` and `next` must be present; `next` may be `null`.
    pub fn decode(url: PageUrl, body: &[u8]) -> Result<Self, PageFetchError> {
        let envelope: Envelope =
            serde_json::from_slice(body).map_err(|source| PageFetchError::Decode {
                url: url.to_string(),
                source,
            })?;
        let next = envelope
            .next
            .map(|cursor| resolve_cursor(&url, cursor))
            .transpose()?;
        Ok(Self {
            url,
            results: envelope.results,
            next,
        })
    }
}

fn resolve_cursor(current: &PageUrl, cursor: String) -> Result<PageUrl, PageFetchError> {
    let invalid = |reason: String| PageFetchError::InvalidCursor {
        url: current.to_string(),
        cursor: cursor.clone(),
        reason,
    };
    if cursor.trim().is_empty() {
        return Err(invalid("cursor is blank".to_owned()));
    }
    let next = current
        .resolve_next(&cursor)
        .map_err(|err| invalid(err.to_string()))?;
    if &next == current {
        return Err(invalid("cursor points back at the same page".to_owned()));
    }
    Ok(next)
}

#[derive(Debug, Deserialize)]
struct Envelope {
    results: Vec<Value>,
    #[serde(deserialize_with = "Option::deserialize")]
    next: Option<String>,
}
