//! Page Fetcher for the paginated books API.
//!
//! A [`PageSource`] performs one GET per call and returns the raw body. The
//! [`PageFetcher`] decodes each body into a [`Page`] and follows its `next`
//! cursor until the API reports the end of the collection.
#![forbid(unsafe_code)]

mod error;
mod fetcher;
mod source;
mod types;

pub use error::{PageFetchError, SourceBuildError, TransportError};
pub use fetcher::PageFetcher;
pub use source::{
    DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, HttpPageSource, HttpPageSourceConfig, PageSource,
};
pub use types::{Page, PageUrl};
