//! Station dataset loading, normalization, and search.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::geo::distance_meters;

/// One logical station with all of its physical platforms.
///
/// Immutable after load. `rbl` is the primary platform id (`rbls[0]`
/// normalized); a partial record from old persisted state recovers its
/// full `rbls` list via [`resolve`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    pub name: String,
    #[serde(default)]
    pub municipality: Option<String>,
    pub lat: f64,
    pub lon: f64,
    /// Primary platform id.
    pub rbl: u32,
    /// All platform ids, primary first. Never empty.
    #[serde(default)]
    pub rbls: Vec<u32>,
}

impl Station {
    /// Platform ids to load, falling back to the primary id for partial
    /// records persisted before multi-RBL support.
    pub fn platform_ids(&self) -> Vec<u32> {
        if self.rbls.is_empty() {
            vec![self.rbl]
        } else {
            self.rbls.clone()
        }
    }
}

#[derive(Deserialize)]
struct StationDataset {
    stations: Vec<RawStation>,
}

/// Dataset entry as shipped: coordinates under long names, RBLs as numeric
/// strings like `"2093.0"`.
#[derive(Deserialize)]
struct RawStation {
    name: String,
    #[serde(default)]
    municipality: Option<String>,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    rbls: Vec<serde_json::Value>,
}

/// Coerces a dataset RBL value (string or number) to a positive integer.
fn normalize_rbl(value: &serde_json::Value) -> Option<u32> {
    let parsed = match value {
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
        serde_json::Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    let floored = parsed.floor();
    if floored > 0.0 && floored <= u32::MAX as f64 {
        Some(floored as u32)
    } else {
        None
    }
}

/// Parses the static station dataset, dropping entries without any valid
/// positive-integer platform id.
pub fn parse_stations(json: &str) -> Result<Vec<Station>> {
    let dataset: StationDataset =
        serde_json::from_str(json).context("station dataset is not valid JSON")?;
    let total = dataset.stations.len();

    let stations: Vec<Station> = dataset
        .stations
        .into_iter()
        .filter_map(|raw| {
            let rbls: Vec<u32> = raw.rbls.iter().filter_map(normalize_rbl).collect();
            let &primary = rbls.first()?;
            Some(Station {
                name: raw.name,
                municipality: raw.municipality,
                lat: raw.latitude,
                lon: raw.longitude,
                rbl: primary,
                rbls,
            })
        })
        .collect();

    info!(loaded = stations.len(), total, "Stations loaded");
    Ok(stations)
}

/// Loads the dataset from disk.
pub fn load_stations(path: &str) -> Result<Vec<Station>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read station dataset at {path}"))?;
    parse_stations(&json)
}

/// Case-insensitive substring search on the station name.
pub fn search<'a>(stations: &'a [Station], query: &str) -> Vec<&'a Station> {
    let query = query.to_lowercase();
    stations
        .iter()
        .filter(|s| s.name.to_lowercase().contains(&query))
        .collect()
}

/// Stations within `radius_m` meters of a point, closest first.
pub fn search_nearby(stations: &[Station], lat: f64, lon: f64, radius_m: f64) -> Vec<Station> {
    let mut hits: Vec<(f64, &Station)> = stations
        .iter()
        .map(|s| (distance_meters(lat, lon, s.lat, s.lon), s))
        .filter(|(d, _)| *d <= radius_m)
        .collect();
    hits.sort_by(|a, b| a.0.total_cmp(&b.0));
    hits.into_iter().map(|(_, s)| s.clone()).collect()
}

/// Re-resolves a (possibly partial) station record against the canonical
/// list by primary id, falling back to the given record.
pub fn resolve<'a>(stations: &'a [Station], station: &'a Station) -> &'a Station {
    stations.iter().find(|s| s.rbl == station.rbl).unwrap_or(station)
}
