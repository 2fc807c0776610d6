//! Batched multi-RBL loading.
//!
//! A station can own many physical platforms (RBLs). Fetching them all at
//! once would hammer the proxy layer, so ids are loaded in fixed-size
//! batches: every member of a batch runs concurrently through the full
//! proxy failover chain, the batch waits for its slowest member, and a
//! short delay separates consecutive batches. A single RBL exhausting all
//! proxies contributes nothing instead of failing the load.

use futures::future::join_all;
use tracing::{debug, info};

use crate::config::{BatchConfig, monitor_url};
use crate::monitor::{Monitor, MonitorEnvelope};

use super::client::HttpClient;
use super::proxies::ProxyRegistry;

/// Progress snapshot emitted after each batch barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchProgress {
    /// RBLs attempted so far (successful or not).
    pub processed: usize,
    /// RBLs that will be attempted in total, after the cap.
    pub total: usize,
    /// RBLs that yielded a payload so far.
    pub succeeded: usize,
}

/// Receiver for batch progress. User-visible loads pass a reporting sink;
/// silent background refreshes pass [`NoProgress`].
pub trait ProgressSink: Send + Sync {
    fn update(&self, progress: FetchProgress);
}

/// Sink for silent refreshes: swallows every update.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn update(&self, _progress: FetchProgress) {}
}

/// Fetches monitor payloads for `rbls` in batches and returns the flat
/// monitor sequence in batch order, then id order within each batch.
///
/// Ids beyond `config.max_rbls` are ignored. Per-RBL failures become gaps,
/// never errors; an empty return means no platform produced data.
pub async fn load_monitors<C: HttpClient>(
    registry: &ProxyRegistry,
    client: &C,
    rbls: &[u32],
    config: &BatchConfig,
    progress: &dyn ProgressSink,
) -> Vec<Monitor> {
    let capped = &rbls[..rbls.len().min(config.max_rbls)];
    let total = capped.len();
    if capped.len() < rbls.len() {
        debug!(requested = rbls.len(), cap = config.max_rbls, "RBL list truncated");
    }

    let mut monitors = Vec::new();
    let mut processed = 0usize;
    let mut succeeded = 0usize;

    let batch_count = capped.len().div_ceil(config.size.max(1));
    for (batch_no, batch) in capped.chunks(config.size.max(1)).enumerate() {
        debug!(batch = batch_no + 1, of = batch_count, rbls = ?batch, "Loading batch");

        let results = join_all(
            batch
                .iter()
                .map(|&rbl| {
                    let url = monitor_url(rbl);
                    async move { registry.fetch_json(client, &url).await }
                }),
        )
        .await;

        processed += batch.len();
        for payload in results {
            if let Some(value) = payload {
                succeeded += 1;
                monitors.extend(MonitorEnvelope::monitors_from_value(value));
            }
        }

        progress.update(FetchProgress {
            processed,
            total,
            succeeded,
        });

        if batch_no + 1 < batch_count {
            tokio::time::sleep(config.delay).await;
        }
    }

    info!(
        rbls = total,
        succeeded,
        monitors = monitors.len(),
        "Monitor fetch finished"
    );
    monitors
}
