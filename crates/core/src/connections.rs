//! HTTP transport used by the media connector.
//!
//! The connector never talks to `reqwest` directly: it goes through the
//! [`HttpConnection`] trait so tests can substitute a mock and so the
//! process-wide client is an explicit dependency of whoever builds the
//! top-level connector, not ambient global state.
//!
//! No retries happen at this layer. A timed-out or failed fetch fails that
//! one call; retry policy belongs to the caller.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{MediaError, Result};

/// A byte-fetching HTTP client with matching blocking and suspending paths.
///
/// The suspending `async_get_bytes` is the only suspension point in the
/// media resolution subsystem.
#[async_trait]
pub trait HttpConnection: Send + Sync {
    /// Fetch the response body of `url`, blocking the calling thread.
    fn get_bytes(&self, url: &str, timeout: Option<Duration>) -> Result<Vec<u8>>;

    /// Fetch the response body of `url` without blocking the executor.
    async fn async_get_bytes(&self, url: &str, timeout: Option<Duration>) -> Result<Vec<u8>>;
}

/// [`HttpConnection`] backed by `reqwest`.
///
/// Holds both an async and a blocking client so the two fetch paths share
/// identical configuration. The blocking path must not be called from inside
/// an async runtime; that is a `reqwest::blocking` constraint, not ours.
pub struct ReqwestConnection {
    client: reqwest::Client,
    blocking_client: reqwest::blocking::Client,
}

impl ReqwestConnection {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            blocking_client: reqwest::blocking::Client::new(),
        }
    }
}

impl Default for ReqwestConnection {
    fn default() -> Self {
        Self::new()
    }
}

fn map_reqwest_error(err: reqwest::Error, timeout: Option<Duration>) -> MediaError {
    if err.is_timeout() {
        MediaError::Timeout(timeout.unwrap_or(Duration::ZERO))
    } else {
        MediaError::Transport(err.to_string())
    }
}

#[async_trait]
impl HttpConnection for ReqwestConnection {
    fn get_bytes(&self, url: &str, timeout: Option<Duration>) -> Result<Vec<u8>> {
        let mut request = self.blocking_client.get(url);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| map_reqwest_error(e, timeout))?;

        let body = response
            .bytes()
            .map_err(|e| map_reqwest_error(e, timeout))?;
        Ok(body.to_vec())
    }

    async fn async_get_bytes(&self, url: &str, timeout: Option<Duration>) -> Result<Vec<u8>> {
        let mut request = self.client.get(url);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| map_reqwest_error(e, timeout))?;

        let body = response
            .bytes()
            .await
            .map_err(|e| map_reqwest_error(e, timeout))?;
        Ok(body.to_vec())
    }
}
