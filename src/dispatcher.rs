//! An HTTP dispatcher that POSTs JSON bodies to the service, retrying
//! transient failures with exponential backoff.
use std::time::Duration;

use chrono::Utc;
use reqwest::{StatusCode, Url};
use serde::Serialize;

use crate::{Error, Result};

/// Status codes worth retrying. Everything else fails immediately.
const RETRY_CODES: [u16; 8] = [408, 500, 502, 503, 504, 522, 524, 599];

/// Default initial backoff between retries; doubled after every attempt.
pub(crate) const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// Issues authenticated POST requests against the API and logging hosts.
pub(crate) struct RequestDispatcher {
    // Client holds a connection pool internally, so we're reusing the client
    // between requests.
    client: reqwest::Client,
    sdk_key: String,
    api_base: Url,
    logging_api_base: Url,
}

impl RequestDispatcher {
    pub(crate) fn new(
        sdk_key: impl Into<String>,
        api_base: &str,
        logging_api_base: &str,
    ) -> Result<RequestDispatcher> {
        Ok(RequestDispatcher {
            client: reqwest::Client::new(),
            sdk_key: sdk_key.into(),
            api_base: parse_base(api_base)?,
            logging_api_base: parse_base(logging_api_base)?,
        })
    }

    /// POST to `{apiBase}/{endpoint}`.
    pub(crate) async fn post_api<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
        retries: u32,
        backoff: Duration,
    ) -> Result<String> {
        self.post(&self.api_base, endpoint, body, retries, backoff)
            .await
    }

    /// POST to `{loggingApiBase}/{endpoint}`.
    pub(crate) async fn post_logging<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
        retries: u32,
        backoff: Duration,
    ) -> Result<String> {
        self.post(&self.logging_api_base, endpoint, body, retries, backoff)
            .await
    }

    /// On 200/202, returns the response body. A status in the retry set is
    /// retried up to `retries` times, sleeping `backoff` and doubling it
    /// between attempts. Any other status, exhausted retries, or a transport
    /// error is a failure; no error ever escapes as a panic.
    async fn post<B: Serialize + ?Sized>(
        &self,
        base: &Url,
        endpoint: &str,
        body: &B,
        mut retries: u32,
        mut backoff: Duration,
    ) -> Result<String> {
        let url = base.join(endpoint).map_err(Error::InvalidBaseUrl)?;

        loop {
            let response = self
                .client
                .post(url.clone())
                .header("STATSIG-API-KEY", &self.sdk_key)
                .header("STATSIG-CLIENT-TIME", Utc::now().timestamp_millis().to_string())
                .json(body)
                .send()
                .await?;

            let status = response.status();
            if status == StatusCode::OK || status == StatusCode::ACCEPTED {
                return Ok(response.text().await?);
            }

            if retries == 0 || !RETRY_CODES.contains(&status.as_u16()) {
                log::warn!(target: "statsig", "request to {endpoint} failed with status {status}");
                return Err(Error::UnexpectedStatus(status));
            }

            log::debug!(target: "statsig", "retrying {endpoint} in {backoff:?} after status {status}");
            tokio::time::sleep(backoff).await;
            retries -= 1;
            backoff *= 2;
        }
    }
}

fn parse_base(base: &str) -> Result<Url> {
    // A trailing slash keeps Url::join from eating the last path segment.
    let mut base = base.to_owned();
    if !base.ends_with('/') {
        base.push('/');
    }
    Url::parse(&base).map_err(Error::InvalidBaseUrl)
}
