//! Departure merge, deduplication, and grouping.
//!
//! The batched fetcher hands over one flat monitor sequence in which the
//! same physical departure can appear several times: neighboring RBL feeds
//! overlap, and the real-time variant of an entry may arrive next to its
//! schedule-only twin. This module flattens the raw tree into uniform
//! departure records, drops the duplicates (keeping the record most likely
//! to carry confirmed real-time data), groups the survivors by
//! line/platform/destination, and orders everything deterministically for
//! display.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::lines::{LineCategory, classify_line};
use crate::monitor::Monitor;

/// Placeholder destination when no label can be resolved anywhere.
pub const UNKNOWN_DESTINATION: &str = "UNBEKANNT";

/// Sort sentinel for departures without a countdown: they always come last.
const COUNTDOWN_SENTINEL: i64 = 999;

/// Maximum departures kept per group for the preview.
const GROUP_PREVIEW_LEN: usize = 3;

/// One departure in the engine's uniform shape.
///
/// `time_real` present means the vehicle is actively tracked; absent means
/// `time_planned` is unconfirmed schedule data. The distinction survives
/// deduplication and is part of the rendered output.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedDeparture {
    pub line: String,
    pub destination: String,
    /// Platform label, empty when the feed carries none.
    pub platform: String,
    pub countdown: Option<i64>,
    pub time_planned: Option<String>,
    pub time_real: Option<String>,
    pub category: LineCategory,
}

impl NormalizedDeparture {
    pub fn has_realtime(&self) -> bool {
        self.time_real.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Identity under deduplication: two records with the same line,
    /// platform, destination, and time signature describe one physical
    /// departure seen through overlapping feeds.
    fn dedup_key(&self) -> String {
        let platform = if self.platform.is_empty() {
            "no-platform"
        } else {
            self.platform.as_str()
        };
        format!(
            "{}|{}|{}|{}",
            self.line,
            platform,
            self.destination,
            self.time_signature()
        )
    }

    /// Real time wins, then planned time, then a token from the countdown.
    fn time_signature(&self) -> String {
        if let Some(t) = non_empty(self.time_real.as_deref()) {
            return t.to_string();
        }
        if let Some(t) = non_empty(self.time_planned.as_deref()) {
            return t.to_string();
        }
        match self.countdown {
            Some(c) => format!("countdown-{c}"),
            None => "countdown-none".to_string(),
        }
    }

    fn sort_countdown(&self) -> i64 {
        self.countdown.unwrap_or(COUNTDOWN_SENTINEL)
    }
}

/// Departures for one line/destination/platform combination, ready to render.
#[derive(Debug, Clone, Serialize)]
pub struct DepartureGroup {
    pub line: String,
    pub destination: String,
    pub platform: String,
    pub category: LineCategory,
    pub departures: Vec<NormalizedDeparture>,
}

impl DepartureGroup {
    fn first_countdown(&self) -> i64 {
        self.departures
            .first()
            .and_then(|d| d.countdown)
            .unwrap_or(COUNTDOWN_SENTINEL)
    }
}

/// Trims and uppercases a raw destination label; empty input resolves to
/// [`UNKNOWN_DESTINATION`]. Idempotent on its own output.
pub fn normalize_destination(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        UNKNOWN_DESTINATION.to_string()
    } else {
        trimmed.to_uppercase()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Flattens monitors → lines → departures into uniform records.
///
/// Destination precedence: vehicle `towards`, vehicle direction label,
/// vehicle `destination`, line `towards` — the first non-empty value wins,
/// then gets normalized.
pub fn flatten(monitors: &[Monitor]) -> Vec<NormalizedDeparture> {
    let mut out = Vec::new();

    for monitor in monitors {
        for line in &monitor.lines {
            let category = classify_line(&line.name, line.line_type.as_deref().unwrap_or(""));
            let departures = line.departures.iter().flat_map(|list| &list.departure);

            for dep in departures {
                let vehicle = dep.vehicle.as_ref();
                let raw_destination = vehicle
                    .and_then(|v| non_empty(v.towards.as_deref()))
                    .or_else(|| {
                        vehicle
                            .and_then(|v| v.direction.as_ref())
                            .and_then(|d| non_empty(d.label()))
                    })
                    .or_else(|| vehicle.and_then(|v| non_empty(v.destination.as_deref())))
                    .or_else(|| non_empty(line.towards.as_deref()));

                let destination = raw_destination
                    .map(normalize_destination)
                    .unwrap_or_else(|| UNKNOWN_DESTINATION.to_string());

                let time = dep.departure_time.as_ref();
                out.push(NormalizedDeparture {
                    line: line.name.clone(),
                    destination,
                    platform: line.platform.clone().unwrap_or_default(),
                    countdown: time.and_then(|t| t.countdown),
                    time_planned: time.and_then(|t| t.time_planned.clone()),
                    time_real: time.and_then(|t| t.time_real.clone()),
                    category,
                });
            }
        }
    }

    out
}

/// Removes duplicate observations of the same physical departure.
///
/// The list is first stably pre-sorted so that real-time-confirmed entries
/// come before schedule-only ones (countdown ascending within each class,
/// original order on ties); first-seen then wins per identity, keeping the
/// authoritative record.
pub fn dedup(mut departures: Vec<NormalizedDeparture>) -> Vec<NormalizedDeparture> {
    departures.sort_by_key(|d| (!d.has_realtime(), d.sort_countdown()));

    let mut seen = HashSet::new();
    departures.retain(|dep| {
        let fresh = seen.insert(dep.dedup_key());
        if !fresh {
            debug!(
                line = %dep.line,
                destination = %dep.destination,
                countdown = ?dep.countdown,
                "Removed duplicate departure"
            );
        }
        fresh
    });
    departures
}

/// Buckets deduplicated departures by `(line, platform, destination)`,
/// sorts each bucket by countdown, truncates to the preview length, and
/// orders the groups for display.
pub fn group(departures: Vec<NormalizedDeparture>) -> Vec<DepartureGroup> {
    let mut buckets: HashMap<(String, String, String), DepartureGroup> = HashMap::new();

    for dep in departures {
        let key = (dep.line.clone(), dep.platform.clone(), dep.destination.clone());
        buckets
            .entry(key)
            .or_insert_with(|| DepartureGroup {
                line: dep.line.clone(),
                destination: dep.destination.clone(),
                platform: dep.platform.clone(),
                category: dep.category,
                departures: Vec::new(),
            })
            .departures
            .push(dep);
    }

    let mut groups: Vec<DepartureGroup> = buckets.into_values().collect();
    for g in &mut groups {
        g.departures.sort_by_key(NormalizedDeparture::sort_countdown);
        g.departures.truncate(GROUP_PREVIEW_LEN);
    }

    groups.sort_by(|a, b| {
        a.category
            .rank()
            .cmp(&b.category.rank())
            .then_with(|| line_number(&a.line).cmp(&line_number(&b.line)))
            .then_with(|| a.line.cmp(&b.line))
            .then_with(|| a.platform.cmp(&b.platform))
            .then_with(|| a.first_countdown().cmp(&b.first_countdown()))
    });
    groups
}

/// Full pipeline: flatten, dedup, group.
pub fn build_groups(monitors: &[Monitor]) -> Vec<DepartureGroup> {
    group(dedup(flatten(monitors)))
}

/// Numeric portion of a line name for natural ordering (U1 < U2 < U11);
/// names without digits sort as 0.
fn line_number(line: &str) -> u64 {
    let digits: String = line.chars().filter(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}
