//! Configuration management for the autopilot engine.
//!
//! Loads configuration from TOML files and provides runtime defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub pricing: PricingConfig,

    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub sources: SourcesConfig,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub actions: ActionsConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            pricing: PricingConfig::default(),
            limits: LimitsConfig::default(),
            sources: SourcesConfig::default(),
            timing: TimingConfig::default(),
            actions: ActionsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Whether the engine reacts to screen events at all.
    /// Off by default: nothing is accepted on behalf of the user until
    /// they opt in.
    #[serde(default)]
    pub service_enabled: bool,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            service_enabled: false,
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Minimum fee for a single call
    #[serde(default = "default_single_min")]
    pub single_call_min: u32,

    /// Minimum fee for a two-call bundle
    #[serde(default = "default_double_min")]
    pub double_call_min: u32,

    /// Minimum fee for a three-call bundle
    #[serde(default = "default_triple_min")]
    pub triple_call_min: u32,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            single_call_min: 4000,
            double_call_min: 7000,
            triple_call_min: 9900,
        }
    }
}

impl PricingConfig {
    /// Minimum acceptable fee for the given bundle size.
    /// `None` for bundle sizes the policy does not support.
    pub fn min_price_for(&self, call_count: u32) -> Option<u32> {
        match call_count {
            1 => Some(self.single_call_min),
            2 => Some(self.double_call_min),
            3 => Some(self.triple_call_min),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum delivery distance in kilometers
    #[serde(default = "default_max_distance")]
    pub max_distance_km: f64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_distance_km: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Source identifiers whose screen events are admitted
    /// (supports glob wildcards)
    #[serde(default = "default_watched_sources")]
    pub watched: Vec<String>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            watched: default_watched_sources(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Delay between an admitted event and the scan, letting the screen
    /// finish rendering
    #[serde(default = "default_scan_delay")]
    pub scan_delay_ms: u64,

    /// Quiet period after a scan, absorbing events triggered by our own
    /// accept/reject action
    #[serde(default = "default_cooldown")]
    pub cooldown_ms: u64,

    /// Upper bound on acquiring the UI tree root
    #[serde(default = "default_stage_timeout")]
    pub harvest_timeout_ms: u64,

    /// Upper bound on the OCR fallback call
    #[serde(default = "default_stage_timeout")]
    pub ocr_timeout_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            scan_delay_ms: 1000,
            cooldown_ms: 500,
            harvest_timeout_ms: 5000,
            ocr_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionsConfig {
    /// Button texts that accept an offer
    #[serde(default = "default_accept_labels")]
    pub accept_labels: Vec<String>,

    /// Button texts that reject an offer
    #[serde(default = "default_reject_labels")]
    pub reject_labels: Vec<String>,
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            accept_labels: default_accept_labels(),
            reject_labels: default_reject_labels(),
        }
    }
}

// Default value functions for serde
fn default_log_level() -> String {
    "info".to_string()
}

fn default_single_min() -> u32 {
    4000
}

fn default_double_min() -> u32 {
    7000
}

fn default_triple_min() -> u32 {
    9900
}

fn default_max_distance() -> f64 {
    2.0
}

fn default_scan_delay() -> u64 {
    1000
}

fn default_cooldown() -> u64 {
    500
}

fn default_stage_timeout() -> u64 {
    5000
}

fn default_watched_sources() -> Vec<String> {
    vec![
        "com.woowahan.baemin".to_string(),
        "com.woowahan.baeminrider".to_string(),
        "com.woowahan.baeminpartners".to_string(),
        "com.sampleapp".to_string(),
    ]
}

fn default_accept_labels() -> Vec<String> {
    vec!["수락".to_string(), "확인".to_string(), "OK".to_string()]
}

fn default_reject_labels() -> Vec<String> {
    vec!["거절".to_string(), "취소".to_string(), "패스".to_string()]
}

impl EngineConfig {
    /// Load configuration from the default path
    pub fn load() -> Self {
        Self::load_from_path(Self::default_config_path())
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: PathBuf) -> Self {
        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    info!("Loaded configuration from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("Failed to parse config file: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(_) => {
                info!("No config file found at {:?}, using defaults", path);
                Self::default()
            }
        }
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("offer-autopilot")
            .join("config.toml")
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, path: PathBuf) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;

        std::fs::write(&path, contents)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        // Fail closed: the service must be an explicit opt-in
        assert!(!config.general.service_enabled);
        assert_eq!(config.pricing.single_call_min, 4000);
        assert_eq!(config.limits.max_distance_km, 2.0);
        assert_eq!(config.timing.scan_delay_ms, 1000);
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
[general]
service_enabled = true
log_level = "debug"

[pricing]
single_call_min = 5000

[limits]
max_distance_km = 3.5
"#;

        let config: EngineConfig = toml::from_str(toml_str).unwrap();
        assert!(config.general.service_enabled);
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.pricing.single_call_min, 5000);
        // Unset fields fall back to section defaults
        assert_eq!(config.pricing.double_call_min, 7000);
        assert_eq!(config.limits.max_distance_km, 3.5);
    }

    #[test]
    fn test_min_price_for() {
        let pricing = PricingConfig::default();
        assert_eq!(pricing.min_price_for(1), Some(4000));
        assert_eq!(pricing.min_price_for(2), Some(7000));
        assert_eq!(pricing.min_price_for(3), Some(9900));
        assert_eq!(pricing.min_price_for(0), None);
        assert_eq!(pricing.min_price_for(4), None);
    }

    #[test]
    fn test_watched_sources_default() {
        let config = EngineConfig::default();
        assert!(config
            .sources
            .watched
            .iter()
            .any(|s| s.contains("woowahan")));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = EngineConfig::load_from_path(PathBuf::from("/nonexistent/config.toml"));
        assert!(!config.general.service_enabled);
    }
}
