use std::{io, time::Duration};

use async_trait::async_trait;
use reqwest::{
    Client,
    header::{ACCEPT, HeaderValue},
};

use super::{PageUrl, SourceBuildError, TransportError};

/// Default user agent sent with every page request.
pub const DEFAULT_USER_AGENT: &str = "fable-import/0.1";

/// Default connect and request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Something that can return the body of a page.
#[async_trait(?Send)]
pub trait PageSource {
    /// Issue one GET for `url` and return the response body.
    async fn fetch(&self, url: &PageUrl) -> Result<Vec<u8>, TransportError>;
}

/// Configuration for [`HttpPageSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpPageSourceConfig {
    /// Connect and total request timeout.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for HttpPageSourceConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl HttpPageSourceConfig {
    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// HTTP implementation of [`PageSource`] backed by `reqwest`.
#[derive(Debug)]
pub struct HttpPageSource {
    client: Client,
    config: HttpPageSourceConfig,
}

impl HttpPageSource {
    /// Construct a source with the default configuration.
    pub fn new() -> Result<Self, SourceBuildError> {
        Self::with_config(HttpPageSourceConfig::default())
    }

    /// Construct a source with explicit configuration.
    pub fn with_config(config: HttpPageSourceConfig) -> Result<Self, SourceBuildError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(SourceBuildError::new)?;
        Ok(Self { client, config })
    }

    fn convert_reqwest_error(&self, error: reqwest::Error, url: &PageUrl) -> TransportError {
        if error.is_timeout() {
            return TransportError::Timeout {
                url: url.to_string(),
                timeout_secs: self.config.timeout.as_secs(),
            };
        }
        if let Some(status) = error.status() {
            return TransportError::Http {
                url: url.to_string(),
                status: status.as_u16(),
                message: error.to_string(),
            };
        }
        TransportError::Network {
            url: url.to_string(),
            source: io::Error::other(error),
        }
    }
}

#[async_trait(?Send)]
impl PageSource for HttpPageSource {
    async fn fetch(&self, url: &PageUrl) -> Result<Vec<u8>, TransportError> {
        let response = self
            .client
            .get(url.as_str())
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(err, url))?
            .error_for_status()
            .map_err(|err| self.convert_reqwest_error(err, url))?;
        let body = response
            .bytes()
            .await
            .map_err(|err| self.convert_reqwest_error(err, url))?;
        Ok(body.to_vec())
    }
}
