//! HTTP range source.

use crate::error::{Error, Result};
use crate::partition::ByteRange;
use crate::source::{RangeBody, RangeSource};
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header;
use std::time::Duration;
use tracing::debug;

/// Remote file served over HTTP(S) by a server that honors `Range` requests.
#[derive(Clone, Debug)]
pub struct HttpSource {
    client: Client,
    url: String,
}

impl HttpSource {
    /// Source for `url` with a client that never times out.
    ///
    /// A stalled range blocks its phase indefinitely; there is no retry.
    ///
    /// # Errors
    /// If the HTTP client cannot be built (e.g. TLS backend initialization).
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(None::<Duration>).build()?;
        Ok(Self::with_client(url, client))
    }

    /// Source for `url` using a preconfigured client.
    pub fn with_client(url: impl Into<String>, client: Client) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    fn check_status(&self, response: &Response) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Error::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            })
        }
    }
}

fn content_length(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

/// First byte position of a `Content-Range: bytes start-end/total` header.
fn content_range_start(response: &Response) -> Option<u64> {
    let value = response.headers().get(header::CONTENT_RANGE)?.to_str().ok()?;
    let (start, _) = value.trim().strip_prefix("bytes ")?.split_once('-')?;
    start.trim().parse().ok()
}

impl RangeSource for HttpSource {
    fn location(&self) -> &str {
        &self.url
    }

    fn probe_size(&self) -> Result<u64> {
        let response = self.client.head(&self.url).send()?;
        self.check_status(&response)?;
        let size =
            content_length(&response).ok_or_else(|| Error::MissingContentLength(self.url.clone()))?;
        debug!(url = %self.url, size, "probed remote size");
        Ok(size)
    }

    fn open_range(&self, range: ByteRange) -> Result<RangeBody> {
        let response = self
            .client
            .get(&self.url)
            .header(header::RANGE, range.header_value())
            .send()?;
        self.check_status(&response)?;

        // A 206 must start where asked. A plain 200 carries the whole resource, which is only
        // acceptable when that is what was asked for.
        let honored = if response.status() == StatusCode::PARTIAL_CONTENT {
            content_range_start(&response) == Some(range.start)
        } else {
            range.start == 0 && content_length(&response) == Some(range.len())
        };
        if !honored {
            return Err(Error::RangeNotHonored {
                url: self.url.clone(),
                start: range.start,
                end: range.end,
            });
        }
        Ok(Box::new(response))
    }
}
