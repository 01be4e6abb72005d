//! In-memory page source and payload builders shared by tests.
use std::{cell::RefCell, collections::HashMap, future::Future};

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::pages::{PageSource, PageUrl, TransportError};

/// Stub [`PageSource`] serving canned bodies keyed by URL.
///
/// Every request is recorded so tests can assert how many pages were fetched.
/// Unknown URLs answer with an HTTP 404 transport error.
#[derive(Debug, Default)]
pub struct StubPageSource {
    pages: HashMap<String, Vec<u8>>,
    requests: RefCell<Vec<String>>,
}

impl StubPageSource {
    /// Construct an empty stub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` verbatim for `url`.
    #[must_use]
    pub fn with_page(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.pages.insert(normalise(url), body.into());
        self
    }

    /// Serve the JSON rendering of `body` for `url`.
    #[must_use]
    pub fn with_json_page(self, url: &str, body: &Value) -> Self {
        let rendered = body.to_string();
        self.with_page(url, rendered)
    }

    /// URLs requested so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

#[async_trait(?Send)]
impl PageSource for StubPageSource {
    async fn fetch(&self, url: &PageUrl) -> Result<Vec<u8>, TransportError> {
        self.requests.borrow_mut().push(url.to_string());
        self.pages
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| TransportError::Http {
                url: url.to_string(),
                status: 404,
                message: "no stub page registered".to_owned(),
            })
    }
}

fn normalise(url: &str) -> String {
    PageUrl::parse(url).map_or_else(|_| url.to_owned(), |parsed| parsed.as_str().to_owned())
}

/// Drive a future to completion on a single-threaded runtime.
///
/// # Panics
/// Panics when the Tokio runtime cannot be built.
pub fn block_on_for_tests<F>(future: F) -> F::Output
where
    F: Future,
{
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|err| panic!("failed to build Tokio runtime: {err}"))
        .block_on(future)
}

/// A page envelope with the given results and cursor.
#[must_use]
pub fn page_json(results: Vec<Value>, next: Option<&str>) -> Value {
    let count = results.len();
    json!({
        "count": count,
        "previous": null,
        "results": results,
        "next": next,
    })
}

/// A wrapper whose book has two authors, subjects
/// `[["Fiction", "Drama"], ["Classics"]]`, one genre, no storygraph tags and
/// a populated review summary.
#[must_use]
pub fn book_wrapper_json(book_id: &str) -> Value {
    json!({
        "source": "library",
        "favorite": true,
        "sort_value": format!("sort-{book_id}"),
        "book": {
            "id": book_id,
            "title": format!("Title {book_id}"),
            "subtitle": null,
            "cover_image": "https://cdn.fable.test/cover.jpg",
            "cover_image_small": "https://cdn.fable.test/cover-small.jpg",
            "published_date": "2001-02-03",
            "embargoed_until": null,
            "imprint": "Vintage",
            "isbn": "9780000000000",
            "source": "catalog",
            "description": "A novel.",
            "price_usd": 12.5,
            "page_count": 320,
            "chapter_count": 24,
            "fable_summary": null,
            "fable_prompts_document": null,
            "url": format!("https://fable.test/book/{book_id}"),
            "audiobook": null,
            "type": "book",
            "is_out_of_catalog": false,
            "iap_identifier": null,
            "non_fiction": false,
            "authors": [
                {"name": "Ann Author", "biography": "Writes.", "slug": "ann-author"},
                {"name": "Bob Writer", "biography": null, "slug": "bob-writer"}
            ],
            "subjects": [["Fiction", "Drama"], ["Classics"]],
            "genres": [{"id": "g-1", "name": "Literary", "type": "fiction"}],
            "storygraph_tags": null,
            "review_summary": {
                "liked": "Prose",
                "disliked": "Pacing",
                "disagreed": "Ending"
            }
        }
    })
}

/// [`book_wrapper_json`] with `key` removed from the book object.
#[must_use]
pub fn book_wrapper_without(book_id: &str, key: &str) -> Value {
    let mut wrapper = book_wrapper_json(book_id);
    if let Some(book) = wrapper.get_mut("book").and_then(Value::as_object_mut) {
        book.remove(key);
    }
    wrapper
}
