use crate::domain::ports::{FetchResponse, Fetcher};
use crate::utils::cancellation::CancellationToken;
use crate::utils::error::{ChartError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Fetch access for a single resolution: the caller's fetcher, the source's
/// headers and the cancellation check that runs before every request.
pub struct FetchSession<'a> {
    fetcher: &'a dyn Fetcher,
    headers: Vec<(String, String)>,
    cancel: &'a CancellationToken,
    requests: AtomicUsize,
}

impl<'a> FetchSession<'a> {
    pub fn new(
        fetcher: &'a dyn Fetcher,
        headers: Vec<(String, String)>,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            fetcher,
            headers,
            cancel,
            requests: AtomicUsize::new(0),
        }
    }

    pub async fn get(&self, url: &str) -> Result<FetchResponse> {
        if let Some(reason) = self.cancel.reason() {
            return Err(ChartError::Cancelled {
                reason: reason.to_string(),
            });
        }

        self.requests.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("GET {}", url);
        let response = self.fetcher.fetch(url, &self.headers).await?;
        tracing::debug!(
            "{} -> {} ({} bytes, final {})",
            url,
            response.status,
            response.body.len(),
            response.final_url
        );
        Ok(response)
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }
}
