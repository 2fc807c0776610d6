//! Persisted client state: favorites and recent searches.
//!
//! Simple JSON blobs on disk, keyed by the station's primary RBL. Missing
//! or corrupt files degrade to empty state instead of failing the load.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::stations::Station;

const FAVORITES_FILE: &str = "favorites.json";
const RECENT_FILE: &str = "recent_searches.json";

/// Recent searches are capped to the newest five.
const RECENT_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentSearch {
    #[serde(flatten)]
    pub station: Station,
    pub timestamp: DateTime<Utc>,
}

pub struct ClientStateStore {
    dir: PathBuf,
}

impl ClientStateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn read_or_default<T: serde::de::DeserializeOwned + Default>(&self, file: &str) -> T {
        let path = self.dir.join(file);
        if !path.exists() {
            return T::default();
        }
        match fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                warn!(file, error = %e, "Corrupt state file, starting empty");
                T::default()
            }),
            Err(e) => {
                warn!(file, error = %e, "Unreadable state file, starting empty");
                T::default()
            }
        }
    }

    fn write(&self, file: &str, value: &impl Serialize) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("cannot create state dir {}", self.dir.display()))?;
        let path = self.dir.join(file);
        fs::write(&path, serde_json::to_string_pretty(value)?)
            .with_context(|| format!("cannot write {}", path.display()))?;
        Ok(())
    }

    pub fn favorites(&self) -> Vec<Station> {
        self.read_or_default(FAVORITES_FILE)
    }

    pub fn is_favorite(&self, rbl: u32) -> bool {
        self.favorites().iter().any(|s| s.rbl == rbl)
    }

    /// Adds or removes the station; returns whether it is a favorite now.
    pub fn toggle_favorite(&self, station: &Station) -> Result<bool> {
        let mut favorites = self.favorites();
        let now_favorite = if let Some(pos) = favorites.iter().position(|s| s.rbl == station.rbl) {
            favorites.remove(pos);
            false
        } else {
            favorites.push(station.clone());
            true
        };
        self.write(FAVORITES_FILE, &favorites)?;
        Ok(now_favorite)
    }

    pub fn recent_searches(&self) -> Vec<RecentSearch> {
        self.read_or_default(RECENT_FILE)
    }

    /// Records a station as recently viewed: de-duplicated by primary RBL,
    /// newest first, capped at [`RECENT_LIMIT`].
    pub fn add_recent(&self, station: &Station) -> Result<()> {
        let mut recent = self.recent_searches();
        recent.retain(|r| r.station.rbl != station.rbl);
        recent.insert(
            0,
            RecentSearch {
                station: station.clone(),
                timestamp: Utc::now(),
            },
        );
        recent.truncate(RECENT_LIMIT);
        self.write(RECENT_FILE, &recent)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
