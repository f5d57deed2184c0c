//! Clients the scanning agent uses to reach the ingestion endpoint.
//!
//! [`IngestClient`] is the seam between the agent and the store.
//! [`HttpIngestClient`] talks to a running `mcpm serve` over the JSON API;
//! [`LocalIngestClient`] calls an [`IngestService`] in-process, for
//! single-process setups and tests.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::ingest::{CheckHashesRequest, CheckHashesResponse, IngestService, StoreRequest, StoreResponse};

/// Remote side of the scanning agent.
#[async_trait]
pub trait IngestClient: Send + Sync {
    /// Which of `hashes` the store already holds.
    async fn check_hashes(&self, hashes: &[String]) -> Result<BTreeMap<String, bool>>;

    /// Submit one batch.
    async fn store_batch(&self, request: &StoreRequest) -> Result<StoreResponse>;

    /// Endpoint description for log lines.
    fn describe(&self) -> String;
}

#[async_trait]
impl<T: IngestClient + ?Sized> IngestClient for Box<T> {
    async fn check_hashes(&self, hashes: &[String]) -> Result<BTreeMap<String, bool>> {
        (**self).check_hashes(hashes).await
    }

    async fn store_batch(&self, request: &StoreRequest) -> Result<StoreResponse> {
        (**self).store_batch(request).await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// JSON-over-HTTP client for the ingestion endpoint.
pub struct HttpIngestClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpIngestClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: serde::Serialize + ?Sized + Sync,
        R: serde::de::DeserializeOwned,
    {
        let url = self.url(path);
        let resp = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or(text);
            bail!("{} returned {}: {}", url, status, message);
        }

        resp.json::<R>()
            .await
            .with_context(|| format!("invalid response from {}", url))
    }
}

#[async_trait]
impl IngestClient for HttpIngestClient {
    async fn check_hashes(&self, hashes: &[String]) -> Result<BTreeMap<String, bool>> {
        let body = CheckHashesRequest {
            hashes: hashes.to_vec(),
        };
        let resp: CheckHashesResponse = self.post_json("/check-hashes", &body).await?;
        Ok(resp.hash_status)
    }

    async fn store_batch(&self, request: &StoreRequest) -> Result<StoreResponse> {
        self.post_json("/store", request).await
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}

/// In-process client backed directly by an [`IngestService`].
#[derive(Clone)]
pub struct LocalIngestClient {
    service: IngestService,
}

impl LocalIngestClient {
    pub fn new(service: IngestService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl IngestClient for LocalIngestClient {
    async fn check_hashes(&self, hashes: &[String]) -> Result<BTreeMap<String, bool>> {
        Ok(self.service.check_hashes(hashes).await.hash_status)
    }

    async fn store_batch(&self, request: &StoreRequest) -> Result<StoreResponse> {
        let source = request.metadata.clone().into_source();
        self.service.store_batch(&request.blocks, source).await
    }

    fn describe(&self) -> String {
        "in-process".to_string()
    }
}
