//! Harness configuration
//!
//! Loaded from `config/harness.json`; anything missing falls back to defaults.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::*;

#[derive(Debug, Clone, Serialize, Deserialize, Resource)]
#[serde(default)]
pub struct HarnessConfig {
    /// Directory for `TestResults ...txt` files
    pub results_dir: PathBuf,
    /// Console line capacity
    pub console_capacity: usize,
    /// Wait before the dynamic-deletion step, in seconds
    pub dynamic_delete_delay_secs: f32,
    /// Frames per second for the headless run loop
    pub frame_rate: f32,
    /// Also verify bang/float/symbol/list echoes
    pub route_scalar_echoes: bool,
    /// Export array plots as PNGs here
    pub plot_dir: Option<PathBuf>,
    /// Exit the app once the automated run is done
    pub exit_when_done: bool,
    /// Seed for the random array (random when absent)
    pub rng_seed: Option<u64>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("."),
            console_capacity: CONSOLE_CAPACITY,
            dynamic_delete_delay_secs: DYNAMIC_DELETE_DELAY.as_secs_f32(),
            frame_rate: DEFAULT_FRAME_RATE,
            route_scalar_echoes: false,
            plot_dir: None,
            exit_when_done: true,
            rng_seed: None,
        }
    }
}

impl HarnessConfig {
    /// Load from the default location
    pub fn load() -> Self {
        Self::load_from(HARNESS_CONFIG_FILE)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!("No {} found, using defaults", path.display());
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => {
                    info!("Loaded harness config from {}", path.display());
                    Self::validated(config)
                }
                Err(e) => {
                    warn!("Failed to parse {}: {}, using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read {}: {}, using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    fn validated(mut config: Self) -> Self {
        if config.console_capacity == 0 {
            warn!("console_capacity must be at least 1, using 1");
            config.console_capacity = 1;
        }
        config
    }

    /// Delay before dynamic deletion; never shorter than the fixed minimum
    pub fn dynamic_delete_delay(&self) -> Duration {
        let configured = Duration::try_from_secs_f32(self.dynamic_delete_delay_secs)
            .unwrap_or(DYNAMIC_DELETE_DELAY);
        configured.max(DYNAMIC_DELETE_DELAY)
    }

    /// Falls back to the default rate when the configured one is unusable
    pub fn frame_interval(&self) -> Duration {
        let default = Duration::from_secs_f32(1.0 / DEFAULT_FRAME_RATE);
        if self.frame_rate > 0.0 {
            Duration::try_from_secs_f32(1.0 / self.frame_rate).unwrap_or(default)
        } else {
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: HarnessConfig =
            serde_json::from_str(r#"{ "results_dir": "out", "route_scalar_echoes": true }"#)
                .unwrap();
        assert_eq!(config.results_dir, PathBuf::from("out"));
        assert!(config.route_scalar_echoes);
        assert_eq!(config.console_capacity, CONSOLE_CAPACITY);
        assert!(config.exit_when_done);
    }

    #[test]
    fn test_delay_never_below_minimum() {
        let mut config = HarnessConfig::default();
        assert_eq!(config.dynamic_delete_delay(), Duration::from_secs(1));

        config.dynamic_delete_delay_secs = 0.2;
        assert_eq!(config.dynamic_delete_delay(), Duration::from_secs(1));

        config.dynamic_delete_delay_secs = -3.0;
        assert_eq!(config.dynamic_delete_delay(), Duration::from_secs(1));

        config.dynamic_delete_delay_secs = 2.5;
        assert_eq!(config.dynamic_delete_delay(), Duration::from_millis(2500));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = HarnessConfig::load_from("does/not/exist.json");
        assert_eq!(config.frame_rate, DEFAULT_FRAME_RATE);
    }

    #[test]
    fn test_frame_interval() {
        let mut config = HarnessConfig::default();
        config.frame_rate = 50.0;
        let interval = config.frame_interval().as_secs_f64();
        assert!((interval - 0.02).abs() < 1e-6);
        config.frame_rate = 0.0;
        assert_eq!(config.frame_interval(), Duration::from_secs_f32(1.0 / 60.0));
    }

    #[test]
    fn test_tiny_frame_rate_uses_default_interval() {
        let mut config = HarnessConfig::default();
        config.frame_rate = 1e-40;
        assert_eq!(config.frame_interval(), Duration::from_secs_f32(1.0 / 60.0));
        config.frame_rate = f32::NAN;
        assert_eq!(config.frame_interval(), Duration::from_secs_f32(1.0 / 60.0));
    }

    #[test]
    fn test_zero_console_capacity_is_raised() {
        let path = std::env::temp_dir().join(format!("patchcheck_config_{}.json", uuid::Uuid::new_v4()));
        fs::write(&path, r#"{ "console_capacity": 0 }"#).unwrap();
        let config = HarnessConfig::load_from(&path);
        fs::remove_file(&path).unwrap();
        assert_eq!(config.console_capacity, 1);
    }
}
