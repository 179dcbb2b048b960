use std::{fs, path::Path, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::{placement::MonospaceMetrics, recorder::ConsistencyPolicy};

/// Scanner settings, stored as JSON. Missing fields take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ScannerConfig {
    /// Capture size requested from the camera.
    pub frame_width: u32,
    pub frame_height: u32,
    pub consistency: ConsistencyPolicy,
    /// Upper bound for a single sink call.
    pub sink_timeout_ms: u64,
    pub database_path: PathBuf,
    pub csv_path: PathBuf,
    /// Source label attached to frames from the live feed.
    pub camera_source: String,
    /// Delay between live-feed frames.
    pub feed_interval_ms: u64,
    pub font: MonospaceMetrics,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            frame_width: 640,
            frame_height: 480,
            consistency: ConsistencyPolicy::AllOrNothing,
            sink_timeout_ms: 2_000,
            database_path: PathBuf::from("scans.sqlite3"),
            csv_path: PathBuf::from("scans.csv"),
            camera_source: "Live Camera".into(),
            feed_interval_ms: 33,
            font: MonospaceMetrics::default(),
        }
    }
}

impl ScannerConfig {
    /// Reads the config at `path`. A missing file yields defaults; an
    /// unparsable one is logged and also yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        match serde_json::from_str(&contents) {
            Ok(config) => Ok(config),
            Err(err) => {
                warn!("Ignoring invalid config {}: {err}", path.display());
                Ok(Self::default())
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    pub fn sink_timeout(&self) -> Duration {
        Duration::from_millis(self.sink_timeout_ms)
    }

    pub fn feed_interval(&self) -> Duration {
        Duration::from_millis(self.feed_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ScannerConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, ScannerConfig::default());
        assert_eq!(config.frame_width, 640);
        assert_eq!(config.frame_height, 480);
    }

    #[test]
    fn save_then_load_keeps_overrides() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scanner.json");
        let config = ScannerConfig {
            consistency: ConsistencyPolicy::BestEffort,
            camera_source: "cam0".into(),
            ..ScannerConfig::default()
        };

        config.save(&path).unwrap();
        assert_eq!(ScannerConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scanner.json");
        fs::write(&path, r#"{ "sinkTimeoutMs": 50, "consistency": "bestEffort" }"#).unwrap();

        let config = ScannerConfig::load(&path).unwrap();
        assert_eq!(config.sink_timeout(), Duration::from_millis(50));
        assert_eq!(config.consistency, ConsistencyPolicy::BestEffort);
        assert_eq!(config.csv_path, PathBuf::from("scans.csv"));
    }

    #[test]
    fn garbage_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scanner.json");
        fs::write(&path, "not json").unwrap();
        assert_eq!(ScannerConfig::load(&path).unwrap(), ScannerConfig::default());
    }
}
