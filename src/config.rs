//! Configuration file support for pinch
//!
//! Reads from .pinch/config.toml (or the file named by `PINCH_CONFIG`)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration structure
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct Config {
    /// Tour behaviour
    #[serde(default)]
    pub tour: TourConfig,

    /// Tooltip placement
    #[serde(default)]
    pub tooltip: TooltipConfig,

    /// Mock concierge settings
    #[serde(default)]
    pub concierge: ConciergeConfig,
}

/// Tour sequencing configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TourConfig {
    /// Route the tour lands on once finished or skipped
    /// Default: "/dashboard"
    #[serde(default = "default_home_route")]
    pub home_route: String,

    /// Whether retreating off the first step of a page rewinds `onboardingStep`
    /// Default: false
    #[serde(default)]
    pub rewind_onboarding_step: bool,

    /// Replacement catalog file (TOML), relative to the config directory
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
}

/// Anchor resolution and tooltip geometry
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TooltipConfig {
    /// Delay between anchor lookups while the anchor is not mounted
    /// Default: 100
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Lookups attempted before the resolver gives up on a step
    /// Default: 20
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Tooltip width in cells
    #[serde(default = "default_tooltip_width")]
    pub width: i32,

    /// Tooltip height in cells
    #[serde(default = "default_tooltip_height")]
    pub height: i32,

    /// Space between anchor and tooltip
    #[serde(default = "default_gap")]
    pub gap: i32,
}

/// Fake latency for simulated concierge replies
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConciergeConfig {
    /// Default: 1200
    #[serde(default = "default_reply_delay_ms")]
    pub reply_delay_ms: u64,
}

fn default_home_route() -> String {
    "/dashboard".to_string()
}

fn default_retry_delay_ms() -> u64 {
    100
}

fn default_max_retries() -> u32 {
    20
}

fn default_tooltip_width() -> i32 {
    44
}

fn default_tooltip_height() -> i32 {
    9
}

fn default_gap() -> i32 {
    1
}

fn default_reply_delay_ms() -> u64 {
    1200
}

impl Default for TourConfig {
    fn default() -> Self {
        Self {
            home_route: default_home_route(),
            rewind_onboarding_step: false,
            catalog_path: None,
        }
    }
}

impl Default for TooltipConfig {
    fn default() -> Self {
        Self {
            retry_delay_ms: default_retry_delay_ms(),
            max_retries: default_max_retries(),
            width: default_tooltip_width(),
            height: default_tooltip_height(),
            gap: default_gap(),
        }
    }
}

impl Default for ConciergeConfig {
    fn default() -> Self {
        Self {
            reply_delay_ms: default_reply_delay_ms(),
        }
    }
}

impl TooltipConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl ConciergeConfig {
    pub fn reply_delay(&self) -> Duration {
        Duration::from_millis(self.reply_delay_ms)
    }
}

impl Config {
    /// Load config from .pinch/config.toml
    /// Returns default config if the file doesn't exist or fails to parse
    pub fn load() -> Self {
        if let Some(path) = Self::find_config_path() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(mut config) => {
                        config.anchor_catalog_path(&path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "ignoring invalid config");
                    }
                },
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "could not read config");
                }
            }
        }
        Self::default()
    }

    /// Find config.toml: `PINCH_CONFIG` first, then walk up the directory tree
    fn find_config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("PINCH_CONFIG") {
            return Some(PathBuf::from(path));
        }

        let current_dir = std::env::current_dir().ok()?;
        let mut dir = current_dir.as_path();

        loop {
            let config_path = dir.join(".pinch").join("config.toml");
            if config_path.exists() {
                return Some(config_path);
            }

            match dir.parent() {
                Some(parent) => dir = parent,
                None => break,
            }
        }
        None
    }

    /// Relative catalog paths are resolved against the config file's directory
    fn anchor_catalog_path(&mut self, config_path: &std::path::Path) {
        if let Some(catalog) = &self.tour.catalog_path {
            if catalog.is_relative() {
                if let Some(dir) = config_path.parent() {
                    self.tour.catalog_path = Some(dir.join(catalog));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.tour.home_route, "/dashboard");
        assert!(!config.tour.rewind_onboarding_step);
        assert_eq!(config.tooltip.retry_delay(), Duration::from_millis(100));
        assert_eq!(config.tooltip.max_retries, 20);
        assert_eq!(config.concierge.reply_delay_ms, 1200);
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[tour]
home_route = "/home"
rewind_onboarding_step = true

[tooltip]
max_retries = 5
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.tour.home_route, "/home");
        assert!(config.tour.rewind_onboarding_step);
        assert_eq!(config.tooltip.max_retries, 5);
        // Unset fields keep their defaults
        assert_eq!(config.tooltip.retry_delay_ms, 100);
        assert_eq!(config.tooltip.width, 44);
    }

    #[test]
    fn test_relative_catalog_path_is_anchored() {
        let mut config: Config = toml::from_str("[tour]\ncatalog_path = \"tour.toml\"").unwrap();
        config.anchor_catalog_path(std::path::Path::new("/srv/app/.pinch/config.toml"));
        assert_eq!(
            config.tour.catalog_path,
            Some(PathBuf::from("/srv/app/.pinch/tour.toml"))
        );
    }
}
