use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};

use crate::images::ConversionError;

/// Source of raw image bytes.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, ConversionError>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: u64, user_agent: &str) -> Result<Self, ConversionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout))
            .user_agent(user_agent)
            .build()?;

        Ok(Self { client })
    }

    async fn fetch_remote(&self, url: &Url) -> Result<Vec<u8>, ConversionError> {
        let response = self
            .client
            .get(url.clone())
            .header("Accept", "image/*,*/*;q=0.8")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            log::error!("Image request to {} failed with status: {}", url, status);
            return Err(ConversionError::Fetch(format!(
                "Image request failed with status: {}",
                status
            )));
        }

        let bytes = response.bytes().await?;
        log::debug!("Fetched {} bytes from {}", bytes.len(), url);

        Ok(bytes.to_vec())
    }

    async fn fetch_local(&self, url: &Url) -> Result<Vec<u8>, ConversionError> {
        let path = url
            .to_file_path()
            .map_err(|_| ConversionError::Fetch(format!("{} is not a valid file path", url)))?;

        tokio::fs::read(&path)
            .await
            .map_err(|e| ConversionError::Fetch(format!("Failed to read {}: {}", path.display(), e)))
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, ConversionError> {
        match url.scheme() {
            "http" | "https" => self.fetch_remote(url).await,
            "file" => self.fetch_local(url).await,
            scheme => Err(ConversionError::Fetch(format!(
                "Unsupported URL scheme: {}",
                scheme
            ))),
        }
    }
}
