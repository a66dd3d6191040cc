use crate::utils::error::Result;
use async_trait::async_trait;

/// Raw response handed back by a [`Fetcher`].
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    /// URL after any redirects were followed.
    pub final_url: String,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Network access supplied by the caller.
///
/// Implementations own retries, connection pooling, deadlines and any
/// authentication or rendering a site requires. The engine calls it at most a
/// few times per resolution and never retries on its own. Non-2xx statuses are
/// returned as responses; only transport failures are errors.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, headers: &[(String, String)]) -> Result<FetchResponse>;
}
