//! Load orchestration.
//!
//! The session is the explicit context object owning everything the
//! pipeline used to reach through globals for: the canonical station list,
//! the proxy registry (and with it the sticky proxy cursor), batch limits,
//! the persisted client state, and the current-station slot that gates
//! background refreshes.

use std::sync::Mutex;

use anyhow::Result;
use tracing::{info, warn};

use crate::config::BatchConfig;
use crate::engine::{DepartureGroup, build_groups};
use crate::fetch::{HttpClient, ProgressSink, ProxyRegistry, load_monitors};
use crate::stations::{self, Station};
use crate::store::ClientStateStore;

/// Result of one departure load. A hard failure (unexpected error below
/// the per-platform recovery boundary) surfaces as `Err` from
/// [`Session::load_departures`] instead.
#[derive(Debug)]
pub enum LoadOutcome {
    Departures {
        station: Station,
        groups: Vec<DepartureGroup>,
    },
    /// Every platform fetch came back empty: user-visible "no data", not
    /// an error.
    NoData { station: Station },
}

/// Current-station slot. The generation counter implements cooperative
/// cancellation: a refresh loop remembers the generation it was started
/// for and stops once the slot has moved on. An in-flight fetch is never
/// aborted, only its successors.
#[derive(Default)]
struct CurrentStation {
    generation: u64,
    station: Option<Station>,
}

pub struct Session<C: HttpClient> {
    stations: Vec<Station>,
    registry: ProxyRegistry,
    client: C,
    batch: BatchConfig,
    store: ClientStateStore,
    current: Mutex<CurrentStation>,
}

impl<C: HttpClient> Session<C> {
    pub fn new(
        stations: Vec<Station>,
        registry: ProxyRegistry,
        client: C,
        batch: BatchConfig,
        store: ClientStateStore,
    ) -> Self {
        Self {
            stations,
            registry,
            client,
            batch,
            store,
            current: Mutex::new(CurrentStation::default()),
        }
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn store(&self) -> &ClientStateStore {
        &self.store
    }

    /// Case-insensitive name search.
    pub fn search(&self, query: &str) -> Vec<&Station> {
        stations::search(&self.stations, query)
    }

    /// Stations within `radius_m` of a point, closest first.
    pub fn search_nearby(&self, lat: f64, lon: f64, radius_m: f64) -> Vec<Station> {
        stations::search_nearby(&self.stations, lat, lon, radius_m)
    }

    /// Loads and aggregates departures for a station.
    ///
    /// Non-silent loads claim the current-station slot (cancelling any
    /// older refresh loop via the generation bump) and record the station
    /// in recent searches. Silent refreshes touch neither.
    #[tracing::instrument(skip(self, progress), fields(station = %station.name, silent))]
    pub async fn load_departures(
        &self,
        station: &Station,
        silent: bool,
        progress: &dyn ProgressSink,
    ) -> Result<LoadOutcome> {
        let station = stations::resolve(&self.stations, station).clone();
        let rbls = station.platform_ids();

        if !silent {
            info!(rbls = rbls.len(), "Loading departures");
            self.set_current(&station);
            if let Err(e) = self.store.add_recent(&station) {
                warn!(error = %e, "Could not record recent search");
            }
        }

        let monitors =
            load_monitors(&self.registry, &self.client, &rbls, &self.batch, progress).await;

        if monitors.is_empty() {
            return Ok(LoadOutcome::NoData { station });
        }

        let groups = build_groups(&monitors);
        Ok(LoadOutcome::Departures { station, groups })
    }

    /// Claims the current-station slot and returns the new generation.
    pub fn set_current(&self, station: &Station) -> u64 {
        let mut current = self.current.lock().unwrap();
        current.generation += 1;
        current.station = Some(station.clone());
        current.generation
    }

    /// Releases the slot, stopping any refresh loop keyed to it.
    pub fn clear_current(&self) {
        let mut current = self.current.lock().unwrap();
        current.generation += 1;
        current.station = None;
    }

    pub fn current_station(&self) -> Option<Station> {
        self.current.lock().unwrap().station.clone()
    }

    /// Whether a refresh loop started at `generation` may keep running.
    pub fn refresh_still_valid(&self, generation: u64) -> bool {
        self.current.lock().unwrap().generation == generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{NoProgress, ProxyDescriptor};
    use async_trait::async_trait;
    use std::env;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Answers every request with the given status/body.
    struct FixedClient {
        status: u16,
        content_type: &'static str,
        body: String,
    }

    #[async_trait]
    impl HttpClient for FixedClient {
        async fn execute(&self, _req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            Ok(http::Response::builder()
                .status(self.status)
                .header("content-type", self.content_type)
                .body(self.body.clone())
                .unwrap()
                .into())
        }
    }

    static DIR_SEQ: AtomicU64 = AtomicU64::new(0);

    fn test_session(client: FixedClient) -> Session<FixedClient> {
        let seq = DIR_SEQ.fetch_add(1, Ordering::SeqCst);
        let dir = env::temp_dir().join(format!("abfahrten_session_{seq}"));
        let _ = std::fs::remove_dir_all(&dir);
        Session::new(
            vec![station()],
            ProxyRegistry::new(vec![ProxyDescriptor::direct("direct")]),
            client,
            BatchConfig {
                delay: std::time::Duration::from_millis(1),
                ..BatchConfig::default()
            },
            ClientStateStore::new(dir),
        )
    }

    fn station() -> Station {
        Station {
            name: "Karlsplatz".to_string(),
            municipality: Some("Wien".to_string()),
            lat: 48.2002,
            lon: 16.3696,
            rbl: 100,
            rbls: vec![100, 101, 102],
        }
    }

    #[tokio::test]
    async fn test_all_platforms_failing_reports_no_data() {
        // Every proxy answer is non-JSON: each RBL soft-fails, nothing
        // propagates as an error.
        let session = test_session(FixedClient {
            status: 200,
            content_type: "text/html",
            body: "<html>".to_string(),
        });

        let outcome = session
            .load_departures(&station(), false, &NoProgress)
            .await
            .unwrap();
        assert!(matches!(outcome, LoadOutcome::NoData { .. }));
    }

    #[tokio::test]
    async fn test_successful_load_builds_groups_and_records_recent() {
        let body = r#"{"data":{"monitors":[{"lines":[{
            "name":"U1","towards":"Leopoldau","type":"ptMetro",
            "departures":{"departure":[{"departureTime":{"countdown":2,"timePlanned":"2025-01-01T12:02:00+0100"}}]}
        }]}]}}"#;
        let session = test_session(FixedClient {
            status: 200,
            content_type: "application/json",
            body: body.to_string(),
        });

        let outcome = session
            .load_departures(&station(), false, &NoProgress)
            .await
            .unwrap();
        match outcome {
            LoadOutcome::Departures { station, groups } => {
                // Three RBLs each return the same monitor; dedup collapses
                // the copies into one group with one departure.
                assert_eq!(station.rbls, vec![100, 101, 102]);
                assert_eq!(groups.len(), 1);
                assert_eq!(groups[0].line, "U1");
                assert_eq!(groups[0].departures.len(), 1);
            }
            other => panic!("expected departures, got {other:?}"),
        }
        assert_eq!(session.store().recent_searches().len(), 1);
    }

    #[tokio::test]
    async fn test_silent_refresh_does_not_touch_recent_searches() {
        let session = test_session(FixedClient {
            status: 200,
            content_type: "text/html",
            body: String::new(),
        });

        session
            .load_departures(&station(), true, &NoProgress)
            .await
            .unwrap();
        assert!(session.store().recent_searches().is_empty());
        assert!(session.current_station().is_none());
    }

    #[tokio::test]
    async fn test_generation_invalidates_older_refresh_loops() {
        let session = test_session(FixedClient {
            status: 200,
            content_type: "text/html",
            body: String::new(),
        });

        let first = session.set_current(&station());
        assert!(session.refresh_still_valid(first));

        let second = session.set_current(&station());
        assert!(!session.refresh_still_valid(first));
        assert!(session.refresh_still_valid(second));

        session.clear_current();
        assert!(!session.refresh_still_valid(second));
        assert!(session.current_station().is_none());
    }
}
