//! End-to-end pipeline test: scripted per-RBL payloads through the session,
//! batched fetch, and the merge/dedup/group engine.

use abfahrten::config::BatchConfig;
use abfahrten::fetch::{HttpClient, NoProgress, ProxyDescriptor, ProxyRegistry};
use abfahrten::session::{LoadOutcome, Session};
use abfahrten::stations::Station;
use abfahrten::store::ClientStateStore;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Serves one fixture per RBL; unknown RBLs get a non-JSON answer so every
/// proxy attempt for them soft-fails.
struct FixtureClient;

#[async_trait]
impl HttpClient for FixtureClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        let url = req.url().to_string();
        let fixture = if url.contains("rbl=100") {
            Some(include_str!("fixtures/monitor_rbl100.json"))
        } else if url.contains("rbl=101") {
            Some(include_str!("fixtures/monitor_rbl101.json"))
        } else if url.contains("rbl=102") {
            Some(include_str!("fixtures/monitor_rbl102.json"))
        } else {
            None
        };
        let (content_type, body) = match fixture {
            Some(json) => ("application/json", json.to_string()),
            None => ("text/plain", "upstream down".to_string()),
        };
        Ok(http::Response::builder()
            .status(200)
            .header("content-type", content_type)
            .body(body)
            .unwrap()
            .into())
    }
}

fn station(rbls: Vec<u32>) -> Station {
    Station {
        name: "Testplatz".to_string(),
        municipality: Some("Wien".to_string()),
        lat: 48.2,
        lon: 16.37,
        rbl: rbls[0],
        rbls,
    }
}

static DIR_SEQ: AtomicU64 = AtomicU64::new(0);

fn session(rbls: Vec<u32>) -> Session<FixtureClient> {
    let seq = DIR_SEQ.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join(format!("abfahrten_pipeline_{seq}"));
    let _ = std::fs::remove_dir_all(&dir);
    Session::new(
        vec![station(rbls)],
        ProxyRegistry::new(vec![ProxyDescriptor::direct("direct")]),
        FixtureClient,
        BatchConfig {
            delay: Duration::from_millis(1),
            ..BatchConfig::default()
        },
        ClientStateStore::new(dir),
    )
}

#[tokio::test]
async fn test_overlapping_feeds_collapse_to_ordered_groups() {
    let session = session(vec![100, 101, 102]);

    let outcome = session
        .load_departures(&station(vec![100, 101, 102]), false, &NoProgress)
        .await
        .unwrap();

    let LoadOutcome::Departures { groups, .. } = outcome else {
        panic!("expected departures");
    };
    assert_eq!(groups.len(), 2);

    // Metro group first: the countdown-4 departure observed through both
    // RBL feeds was deduplicated in favor of the real-time record.
    let metro = &groups[0];
    assert_eq!(metro.line, "U6");
    assert_eq!(metro.destination, "SIEBENHIRTEN");
    assert_eq!(metro.platform, "2");
    assert_eq!(metro.departures.len(), 2);
    assert_eq!(metro.departures[0].countdown, Some(4));
    assert!(metro.departures[0].has_realtime());
    assert_eq!(metro.departures[1].countdown, Some(9));
    assert!(!metro.departures[1].has_realtime());

    // Bus group after metro, from the message-schema variant.
    let bus = &groups[1];
    assert_eq!(bus.line, "13A");
    assert_eq!(bus.destination, "ALFRED-ADLER-STRASSE");
    assert_eq!(bus.departures.len(), 1);
}

#[tokio::test]
async fn test_partial_platform_failure_keeps_remaining_data() {
    // RBL 999 soft-fails on every proxy; the other two still produce a board.
    let session = session(vec![100, 999, 102]);

    let outcome = session
        .load_departures(&station(vec![100, 999, 102]), false, &NoProgress)
        .await
        .unwrap();

    let LoadOutcome::Departures { groups, .. } = outcome else {
        panic!("expected departures");
    };
    assert_eq!(groups.len(), 2);
}

#[tokio::test]
async fn test_total_failure_reports_no_data() {
    let session = session(vec![900, 901, 902]);

    let outcome = session
        .load_departures(&station(vec![900, 901, 902]), false, &NoProgress)
        .await
        .unwrap();

    assert!(matches!(outcome, LoadOutcome::NoData { .. }));
}
