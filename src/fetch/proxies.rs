//! CORS proxy registry with sequential failover and a sticky cursor.
//!
//! The upstream API sends no CORS headers, so every request is routed
//! through one of an ordered list of relay proxies. A call scans from the
//! last-known-good proxy forward, never backward; the cursor only moves
//! when a *different* proxy succeeds, so a known-dead proxy is not retried
//! on every call while recovery stays possible if the current one dies.

use std::sync::atomic::{AtomicUsize, Ordering};

use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info, warn};

use super::client::HttpClient;

/// One relay in the fallback chain.
#[derive(Debug, Clone)]
pub struct ProxyDescriptor {
    /// Prefix the percent-encoded target URL is appended to. `None` means
    /// the target is requested directly (no relay).
    pub endpoint_prefix: Option<String>,
    /// Whether the relay wraps the upstream body in an envelope whose
    /// `contents` field holds the real JSON as a string.
    pub unwrap: bool,
    pub label: String,
}

impl ProxyDescriptor {
    /// A pass-through descriptor that requests the target URL directly.
    pub fn direct(label: &str) -> Self {
        Self {
            endpoint_prefix: None,
            unwrap: false,
            label: label.to_string(),
        }
    }

    fn request_url(&self, api_url: &str) -> String {
        match &self.endpoint_prefix {
            Some(prefix) => format!("{prefix}{}", urlencoding::encode(api_url)),
            None => api_url.to_string(),
        }
    }
}

/// Ordered proxy chain plus the process-wide sticky cursor.
pub struct ProxyRegistry {
    proxies: Vec<ProxyDescriptor>,
    cursor: AtomicUsize,
}

impl ProxyRegistry {
    pub fn new(proxies: Vec<ProxyDescriptor>) -> Self {
        Self {
            proxies,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Index of the proxy the next call will try first.
    pub fn current_index(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }

    /// Fetches `api_url` through the proxy chain, starting at the sticky
    /// cursor and falling forward on any failure: request error, non-2xx
    /// status, non-JSON content type, or a broken unwrap envelope.
    ///
    /// Returns `None` when every proxy from the cursor to the end of the
    /// list failed. That is a soft per-request failure, not an error.
    pub async fn fetch_json<C: HttpClient>(
        &self,
        client: &C,
        api_url: &str,
    ) -> Option<serde_json::Value> {
        let start = self.current_index().min(self.proxies.len());

        for idx in start..self.proxies.len() {
            let proxy = &self.proxies[idx];
            let url = proxy.request_url(api_url);

            let Ok(parsed) = url.parse() else {
                debug!(proxy = %proxy.label, url, "Unparseable proxy URL");
                continue;
            };
            let req = reqwest::Request::new(Method::GET, parsed);

            let resp = match client.execute(req).await {
                Ok(resp) => resp,
                Err(e) => {
                    debug!(proxy = %proxy.label, error = %e, "Proxy request failed");
                    continue;
                }
            };

            if !resp.status().is_success() {
                debug!(proxy = %proxy.label, status = %resp.status(), "Proxy returned error status");
                continue;
            }

            let is_json = resp
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.contains("application/json"));
            if !is_json {
                debug!(proxy = %proxy.label, "Proxy returned non-JSON body");
                continue;
            }

            let body: serde_json::Value = match resp.json().await {
                Ok(body) => body,
                Err(e) => {
                    debug!(proxy = %proxy.label, error = %e, "Proxy body parse failed");
                    continue;
                }
            };

            let payload = if proxy.unwrap {
                let Some(contents) = body.get("contents").and_then(|c| c.as_str()) else {
                    debug!(proxy = %proxy.label, "Unwrap envelope missing contents");
                    continue;
                };
                match serde_json::from_str(contents) {
                    Ok(inner) => inner,
                    Err(e) => {
                        debug!(proxy = %proxy.label, error = %e, "Envelope contents parse failed");
                        continue;
                    }
                }
            } else {
                body
            };

            if idx != self.current_index() {
                info!(proxy = %proxy.label, index = idx, "Switched to proxy");
                self.cursor.store(idx, Ordering::Relaxed);
            }

            return Some(payload);
        }

        warn!(api_url, start, "All proxies failed");
        None
    }
}
