//! Resilient fetch layer: HTTP client seam, proxy failover, batched loading.

mod batch;
mod client;
mod proxies;

pub use batch::{FetchProgress, NoProgress, ProgressSink, load_monitors};
pub use client::{BasicClient, HttpClient};
pub use proxies::{ProxyDescriptor, ProxyRegistry};
