//! HTTP client seam.
//!
//! All outbound traffic goes through the [`HttpClient`] trait so the proxy
//! failover chain, the batched fetcher, and the relay retry loop can be
//! exercised in tests with scripted responses instead of a live network.

use async_trait::async_trait;
use reqwest::{Request, Response};

#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}

/// Production client backed by a shared [`reqwest::Client`].
pub struct BasicClient(reqwest::Client);

impl BasicClient {
    pub fn new() -> Self {
        Self(reqwest::Client::new())
    }
}

impl Default for BasicClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for BasicClient {
    async fn execute(&self, req: Request) -> reqwest::Result<Response> {
        self.0.execute(req).await
    }
}
