//! HTTP client abstraction for testability

use std::time::Duration;

use crate::error::FetchError;

/// Trait for the HTTP operations the fetch pipeline needs.
///
/// This abstraction allows for dependency injection and easier testing by
/// enabling mock HTTP clients in tests. Implementations must honor the
/// per-request timeout by aborting the in-flight request, not merely by
/// returning early: under rapid viewport changes, leaked sockets against a
/// rate-limited public upstream add up quickly.
pub trait AsyncHttpClient: Send + Sync {
    /// POSTs an Overpass query as a `data=` form field.
    ///
    /// Returns the response body for 2xx responses; any other outcome is a
    /// [`FetchError`].
    fn post_form(
        &self,
        url: &str,
        query: &str,
        timeout: Duration,
    ) -> impl std::future::Future<Output = Result<Vec<u8>, FetchError>> + Send;

    /// Performs an HTTP GET request (used for the local backend).
    fn get(
        &self,
        url: &str,
        timeout: Duration,
    ) -> impl std::future::Future<Output = Result<Vec<u8>, FetchError>> + Send;
}

impl<C: AsyncHttpClient> AsyncHttpClient for std::sync::Arc<C> {
    async fn post_form(
        &self,
        url: &str,
        query: &str,
        timeout: Duration,
    ) -> Result<Vec<u8>, FetchError> {
        (**self).post_form(url, query, timeout).await
    }

    async fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError> {
        (**self).get(url, timeout).await
    }
}

/// Real HTTP client implementation using reqwest.
///
/// reqwest's per-request timeout aborts the request future and releases the
/// underlying connection on expiry, which satisfies the cancellation
/// contract above.
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a new client with default configuration.
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("playscout/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Http(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    fn map_error(e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Http(e.to_string())
        }
    }

    async fn read_body(response: reqwest::Response) -> Result<Vec<u8>, FetchError> {
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(Self::map_error)
    }
}

impl AsyncHttpClient for ReqwestClient {
    async fn post_form(
        &self,
        url: &str,
        query: &str,
        timeout: Duration,
    ) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .post(url)
            .timeout(timeout)
            .form(&[("data", query)])
            .send()
            .await
            .map_err(Self::map_error)?;
        Self::read_body(response).await
    }

    async fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(Self::map_error)?;
        Self::read_body(response).await
    }
}
