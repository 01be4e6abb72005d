use log::debug;

use super::{Page, PageFetchError, PageSource, PageUrl};

/// Pull-based cursor over the pages of the books API.
///
/// Each call to [`PageFetcher::next_page`] issues exactly one request while a
/// cursor remains. The fetcher is not restartable: once the last page has been
/// returned, or a request has failed, it yields `None`.
///
/// # Examples
/// ```
/// use fable_data::{PageFetcher, PageUrl};
/// use fable_data::test_support::{StubPageSource, block_on_for_tests};
/// use serde_json::json;
///
/// let source = StubPageSource::new()
///     .with_json_page("https://api.fable.test/books", &json!({"results": [], "next": null}));
/// let start = PageUrl::parse("https://api.fable.test/books").expect("valid URL");
/// let mut fetcher = PageFetcher::new(&source, start);
///
/// let page = block_on_for_tests(fetcher.next_page())?.expect("first page");
/// assert!(page.results.is_empty());
/// assert!(block_on_for_tests(fetcher.next_page())?.is_none());
/// assert_eq!(fetcher.requests(), 1);
/// # Ok::<(), fable_data::PageFetchError>(())
/// ```
#[derive(Debug)]
pub struct PageFetcher<'s, S: ?Sized> {
    source: &'s S,
    next: Option<PageUrl>,
    requests: usize,
}

impl<'s, S> PageFetcher<'s, S>
where
    S: PageSource + ?Sized,
{
    /// Start a walk at `start`.
    pub const fn new(source: &'s S, start: PageUrl) -> Self {
        Self {
            source,
            next: Some(start),
            requests: 0,
        }
    }

    /// Fetch and decode the next page, or return `None` when exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Page>, PageFetchError> {
        let Some(url) = self.next.take() else {
            return Ok(None);
        };
        self.requests += 1;
        debug!("requesting page {} from {url}", self.requests);
        let body = self.source.fetch(&url).await?;
        let page = Page::decode(url, &body)?;
        self.next.clone_from(&page.next);
        Ok(Some(page))
    }

    /// Number of requests issued so far.
    #[must_use]
    pub const fn requests(&self) -> usize {
        self.requests
    }

    /// Whether the walk has finished.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.next.is_none()
    }
}
