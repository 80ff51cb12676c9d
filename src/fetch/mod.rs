use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// GET a URL as text. `None` means "skip this unit of work": transport
/// failures, non-2xx statuses and empty bodies are not told apart.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn get(&self, url: &str) -> Option<String>;

    async fn get_with_accept(&self, url: &str, _accept: &str) -> Option<String> {
        self.get(url).await
    }
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(
        user_agent: &str,
        request_timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .gzip(true)
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self { client })
    }

    async fn try_get(&self, url: &str, accept: Option<&str>) -> Result<String> {
        log::debug!("Fetching URL: {}", url);

        let mut request = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT_ENCODING, "gzip, deflate");
        if let Some(accept) = accept {
            request = request.header(reqwest::header::ACCEPT, accept);
        }

        let response = request.send().await?;
        log::debug!("Response status: {}", response.status());

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP request failed with status: {}",
                response.status()
            ));
        }

        let content = response.text().await?;
        log::debug!("Received content length: {}", content.len());

        if content.trim().is_empty() {
            return Err(anyhow!("No content received from the server"));
        }
        Ok(content)
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn get(&self, url: &str) -> Option<String> {
        match self.try_get(url, None).await {
            Ok(body) => Some(body),
            Err(e) => {
                log::warn!("Fetch failed for {}: {}", url, e);
                None
            }
        }
    }

    async fn get_with_accept(&self, url: &str, accept: &str) -> Option<String> {
        match self.try_get(url, Some(accept)).await {
            Ok(body) => Some(body),
            Err(e) => {
                log::warn!("Fetch failed for {}: {}", url, e);
                None
            }
        }
    }
}
