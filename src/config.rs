//! Static configuration: API endpoint, fallback proxy chain, batch limits.

use std::time::Duration;

use crate::fetch::ProxyDescriptor;

/// Base URL of the Wiener Linien open data API.
pub const API_BASE: &str = "https://www.wienerlinien.at";

/// Interval between silent background refreshes of the current station.
pub const AUTO_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

/// Builds the monitor request URL for a single RBL (platform id).
pub fn monitor_url(rbl: u32) -> String {
    format!("{API_BASE}/ogd_realtime/monitor?rbl={rbl}")
}

/// Ordered CORS proxy chain: our own relay worker first, public fallbacks after.
pub fn default_proxies() -> Vec<ProxyDescriptor> {
    vec![
        ProxyDescriptor {
            endpoint_prefix: Some("https://wannfahrma-cors-proxy.stefan-radakovits.workers.dev/?url=".to_string()),
            unwrap: false,
            label: "Cloudflare Worker".to_string(),
        },
        ProxyDescriptor {
            endpoint_prefix: Some("https://api.allorigins.win/get?url=".to_string()),
            unwrap: true,
            label: "allorigins.win".to_string(),
        },
        ProxyDescriptor {
            endpoint_prefix: Some("https://corsproxy.io/?".to_string()),
            unwrap: false,
            label: "corsproxy.io".to_string(),
        },
    ]
}

/// Limits for batched multi-RBL loading.
///
/// The hard RBL cap protects the proxy layer from unbounded fan-out when a
/// station lists many platforms; ids past the cap are ignored.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// RBLs fetched concurrently per batch.
    pub size: usize,
    /// Pause between consecutive batches.
    pub delay: Duration,
    /// Maximum RBLs considered for one load.
    pub max_rbls: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            size: 5,
            delay: Duration::from_millis(300),
            max_rbls: 15,
        }
    }
}
