//! HTTP document fetcher for prompt assembly.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;

use crate::domain::ports::{DocumentFetchError, DocumentFetcher};

/// [`DocumentFetcher`] downloading document bytes over HTTP.
#[derive(Debug, Clone)]
pub struct HttpDocumentFetcher {
    client: Client,
}

impl HttpDocumentFetcher {
    /// Build a fetcher with an explicit request timeout.
    ///
    /// # Errors
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DocumentFetcher for HttpDocumentFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, DocumentFetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|error| DocumentFetchError::transport(error.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(DocumentFetchError::Status {
                status: status.as_u16(),
            });
        }
        response
            .bytes()
            .await
            .map_err(|error| DocumentFetchError::transport(error.to_string()))
    }
}
