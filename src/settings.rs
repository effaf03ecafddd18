use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
    time::Duration,
};

use crate::utils::sync::{read, write};

/// Which fields survive a navigation reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResetPreserve {
    pub speed_limit: bool,
    pub road_camera: bool,
    pub alt_speed: bool,
}

impl ResetPreserve {
    pub const SPEED_LIMIT_ONLY: Self = Self {
        speed_limit: true,
        road_camera: false,
        alt_speed: false,
    };
}

impl Default for ResetPreserve {
    fn default() -> Self {
        Self {
            speed_limit: true,
            road_camera: true,
            alt_speed: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HudConfig {
    /// Upper bound on simultaneously displayed traffic lights (at least 1).
    pub traffic_light_max_active: usize,
    /// Lifetime of a traffic light that arrived without a countdown.
    pub traffic_light_default_ttl_ms: u64,
    /// Take the speed limit from the alternate speed source instead of the
    /// navigation app.
    pub prefer_alt_speed_source: bool,
    /// Maneuver name -> turn id understood by the downstream sink.
    pub maneuver_turn_ids: HashMap<String, i32>,
    pub default_turn_id: i32,
    pub street_reset_ms: u64,
    pub dispatch_debounce_ms: u64,
    pub maneuver_rate_limit_ms: u64,
    /// Grace period between "navigation inactive" and the actual reset.
    pub nav_end_timeout_ms: u64,
    /// Forward turn-by-turn data to the downstream sink at all.
    pub native_nav_enabled: bool,
    /// Package of the navigation app; blank disables the open/closed gate.
    pub nav_app_package: String,
    pub reset_preserve: ResetPreserve,
    /// Directory holding `<maneuver>.png` reference icons.
    pub maneuver_icon_dir: Option<PathBuf>,
}

impl Default for HudConfig {
    fn default() -> Self {
        Self {
            traffic_light_max_active: 3,
            traffic_light_default_ttl_ms: 2_000,
            prefer_alt_speed_source: false,
            maneuver_turn_ids: HashMap::new(),
            default_turn_id: 0,
            street_reset_ms: 5_000,
            dispatch_debounce_ms: 100,
            maneuver_rate_limit_ms: 3_000,
            nav_end_timeout_ms: 2_000,
            native_nav_enabled: false,
            nav_app_package: String::new(),
            reset_preserve: ResetPreserve::default(),
            maneuver_icon_dir: None,
        }
    }
}

impl HudConfig {
    pub fn max_active_lights(&self) -> usize {
        self.traffic_light_max_active.max(1)
    }

    pub fn turn_id_for(&self, maneuver: &str) -> i32 {
        self.maneuver_turn_ids
            .get(maneuver)
            .copied()
            .unwrap_or(self.default_turn_id)
    }

    pub fn street_reset(&self) -> Duration {
        Duration::from_millis(self.street_reset_ms)
    }

    pub fn dispatch_debounce(&self) -> Duration {
        Duration::from_millis(self.dispatch_debounce_ms)
    }

    pub fn maneuver_rate_limit(&self) -> Duration {
        Duration::from_millis(self.maneuver_rate_limit_ms)
    }

    pub fn nav_end_timeout(&self) -> Duration {
        Duration::from_millis(self.nav_end_timeout_ms)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).context("invalid navhud config")
    }
}

/// Read-mostly holder of the active configuration.
///
/// The core only reads it; the surrounding application may swap in a new
/// config at any time and components pick it up on their next event.
#[derive(Clone)]
pub struct ConfigStore {
    path: Option<PathBuf>,
    data: Arc<RwLock<Arc<HudConfig>>>,
}

impl ConfigStore {
    /// Load from `path`, falling back to defaults when the file is missing.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            HudConfig::from_json(&contents)
                .with_context(|| format!("Failed to parse config {}", path.display()))?
        } else {
            HudConfig::default()
        };

        Ok(Self {
            path: Some(path),
            data: Arc::new(RwLock::new(Arc::new(data))),
        })
    }

    pub fn in_memory(config: HudConfig) -> Self {
        Self {
            path: None,
            data: Arc::new(RwLock::new(Arc::new(config))),
        }
    }

    pub fn get(&self) -> Arc<HudConfig> {
        Arc::clone(&read(&self.data))
    }

    pub fn replace(&self, config: HudConfig) {
        *write(&self.data) = Arc::new(config);
    }

    /// Re-read the backing file. In-memory stores keep their current value.
    pub fn reload(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let data = HudConfig::from_json(&contents)?;
        self.replace(data);
        Ok(())
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::in_memory(HudConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_fall_back_to_defaults() {
        let config = HudConfig::from_json(
            r#"{"traffic_light_max_active": 5, "maneuver_turn_ids": {"turn_left": 2}}"#,
        )
        .unwrap();
        assert_eq!(config.traffic_light_max_active, 5);
        assert_eq!(config.street_reset_ms, 5_000);
        assert_eq!(config.turn_id_for("turn_left"), 2);
        assert_eq!(config.turn_id_for("unknown"), 0);
        assert!(config.reset_preserve.speed_limit);
    }

    #[test]
    fn test_max_active_is_at_least_one() {
        let config = HudConfig {
            traffic_light_max_active: 0,
            ..HudConfig::default()
        };
        assert_eq!(config.max_active_lights(), 1);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let store = ConfigStore::load("/nonexistent/navhud/config.json").unwrap();
        assert_eq!(store.get().dispatch_debounce_ms, 100);
        assert!(store.reload().is_err());
    }

    #[test]
    fn test_replace_is_visible_to_clones() {
        let store = ConfigStore::default();
        let clone = store.clone();
        store.replace(HudConfig {
            prefer_alt_speed_source: true,
            ..HudConfig::default()
        });
        assert!(clone.get().prefer_alt_speed_source);
    }
}
