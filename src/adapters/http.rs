use crate::domain::ports::{FetchResponse, Fetcher};
use crate::utils::error::{ChartError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

const USER_AGENT: &str = concat!("aerodrome-charts/", env!("CARGO_PKG_VERSION"));

/// reqwest 實作的 Fetcher
///
/// Follows redirects, carries its own deadline and reports the final URL.
/// Non-2xx responses are returned as-is; only transport failures are errors.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, headers: &[(String, String)]) -> Result<FetchResponse> {
        let mut request = self.client.get(url);

        // 添加來源自定義標頭
        for (key, value) in headers {
            request = request.header(key, value);
        }

        let response = request.send().await.map_err(|e| transport(url, e))?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response.bytes().await.map_err(|e| transport(url, e))?;

        Ok(FetchResponse {
            status,
            final_url,
            body: body.to_vec(),
        })
    }
}

fn transport(url: &str, error: reqwest::Error) -> ChartError {
    let reason = if error.is_timeout() {
        "request timed out".to_string()
    } else if error.is_connect() {
        format!("connection failed: {}", error)
    } else {
        error.to_string()
    };
    ChartError::DocumentFetchFailed {
        url: url.to_string(),
        reason,
    }
}
