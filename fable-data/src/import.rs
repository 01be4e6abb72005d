//! The import pipeline: fetch every page and persist it.
#![forbid(unsafe_code)]

use log::info;
use thiserror::Error;

use crate::{
    pages::{PageFetchError, PageFetcher, PageSource, PageUrl},
    store::{BookStore, PersistBooksError, PersistSummary},
};

/// Outcome of a completed import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Pages persisted.
    pub pages: usize,
    /// HTTP requests issued.
    pub requests: usize,
    /// Rows written across all pages.
    pub summary: PersistSummary,
}

/// Errors that abort an import run.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Fetching or decoding a page failed.
    #[error("failed to fetch page {page}: {source}")]
    Fetch {
        /// One-based page number.
        page: usize,
        /// Underlying fetch error.
        #[source]
        source: PageFetchError,
    },
    /// Persisting a page failed; nothing of that page was committed.
    #[error("failed to persist page {page} from {url}: {source}")]
    Persist {
        /// One-based page number.
        page: usize,
        /// Page URL.
        url: String,
        /// Underlying persistence error.
        #[source]
        source: PersistBooksError,
    },
}

/// Walk the API from `start` until it reports no further page, committing
/// each page to `store` in its own transaction.
///
/// The first error ends the run. Pages committed before it stay in the store.
///
/// # Examples
/// ```
/// use fable_data::{BookStore, PageUrl, import_all};
/// use fable_data::test_support::{
///     StubPageSource, block_on_for_tests, book_wrapper_json, page_json,
/// };
///
/// let source = StubPageSource::new().with_json_page(
///     "https://api.fable.test/books",
///     &page_json(vec![book_wrapper_json("b1")], None),
/// );
/// let start = PageUrl::parse("https://api.fable.test/books").expect("valid URL");
/// let mut store = BookStore::open_in_memory().expect("open store");
///
/// let report = block_on_for_tests(import_all(&source, start, &mut store))?;
/// assert_eq!(report.pages, 1);
/// assert_eq!(report.summary.books, 1);
/// # Ok::<(), fable_data::ImportError>(())
/// ```
pub async fn import_all<S>(
    source: &S,
    start: PageUrl,
    store: &mut BookStore,
) -> Result<ImportReport, ImportError>
where
    S: PageSource + ?Sized,
{
    let mut fetcher = PageFetcher::new(source, start);
    let mut report = ImportReport::default();

    loop {
        let page_number = report.pages + 1;
        let fetched = fetcher
            .next_page()
            .await
            .map_err(|source| ImportError::Fetch {
                page: page_number,
                source,
            })?;
        let Some(page) = fetched else {
            break;
        };

        let url = page.url.to_string();
        let results = page.results.len();
        let summary = store
            .persist_page(page.results)
            .map_err(|source| ImportError::Persist {
                page: page_number,
                url: url.clone(),
                source,
            })?;
        info!(
            "imported page {page_number} from {url}: {} of {results} results, {} authors, {} subjects, {} genres",
            summary.books, summary.authors, summary.subjects, summary.genres
        );

        report.pages = page_number;
        report.summary += summary;
    }

    report.requests = fetcher.requests();
    Ok(report)
}
