//! Service configuration resolution
//!
//! Every knob resolves once at startup with ENV → TOML → default priority
//! and is injected as an immutable struct; nothing reads ambient
//! configuration during a decision. Missing provider credentials select
//! the fail-open adapters instead of failing startup.

use cpv_common::config::TomlConfig;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// How the content classifier is implemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisionMode {
    /// Deterministic canned analyses, no network.
    Mock,
    /// Gemini Vision API.
    Gemini,
}

/// Immutable validation configuration.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Reject images that carry no capture metadata at all.
    pub strict_exif_required: bool,
    /// AI probability at or above which an image counts as generated.
    pub ai_generation_threshold: f64,
    /// Maximum Hamming distance for a fingerprint to count as a duplicate.
    pub hash_distance_threshold: u32,
    /// Allowed radius between image GPS and claimed location, km.
    pub location_radius_km: f64,
    /// Per-adapter call deadline, seconds.
    pub adapter_timeout_secs: u64,
    pub sightengine_api_user: Option<String>,
    pub sightengine_api_secret: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub vision_mode: VisionMode,
    pub geocoding_enabled: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            strict_exif_required: false,
            ai_generation_threshold: 0.8,
            hash_distance_threshold: 5,
            location_radius_km: 10.0,
            adapter_timeout_secs: 10,
            sightengine_api_user: None,
            sightengine_api_secret: None,
            gemini_api_key: None,
            gemini_model: "gemini-2.5-flash".to_string(),
            vision_mode: VisionMode::Mock,
            geocoding_enabled: true,
        }
    }
}

impl ValidationConfig {
    /// Resolve configuration with ENV → TOML → default priority.
    pub fn resolve(toml: &TomlConfig) -> Self {
        let mut config = Self::default();

        // Tier 2: TOML config file
        if let Some(v) = toml.strict_exif_required {
            config.strict_exif_required = v;
        }
        if let Some(v) = toml.ai_generation_threshold {
            config.ai_generation_threshold = v;
        }
        if let Some(v) = toml.hash_distance_threshold {
            config.hash_distance_threshold = v;
        }
        if let Some(v) = toml.location_radius_km {
            config.location_radius_km = v;
        }
        if let Some(v) = toml.adapter_timeout_secs {
            config.adapter_timeout_secs = v;
        }
        if let Some(v) = &toml.sightengine_api_user {
            config.sightengine_api_user = Some(v.clone());
        }
        if let Some(v) = &toml.sightengine_api_secret {
            config.sightengine_api_secret = Some(v.clone());
        }
        if let Some(v) = &toml.gemini_api_key {
            config.gemini_api_key = Some(v.clone());
        }
        if let Some(v) = &toml.gemini_model {
            config.gemini_model = v.clone();
        }
        if let Some(v) = &toml.vision_mode {
            if let Some(mode) = parse_vision_mode(v) {
                config.vision_mode = mode;
            }
        }
        if let Some(v) = toml.geocoding_enabled {
            config.geocoding_enabled = v;
        }

        // Tier 1: environment variables (highest priority)
        if let Some(v) = env_bool("CPV_REQUIRE_EXIF") {
            config.strict_exif_required = v;
        }
        if let Some(v) = env_parse::<f64>("CPV_AI_THRESHOLD") {
            config.ai_generation_threshold = v;
        }
        if let Some(v) = env_parse::<u32>("CPV_HASH_THRESHOLD") {
            config.hash_distance_threshold = v;
        }
        if let Some(v) = env_parse::<f64>("CPV_LOCATION_RADIUS_KM") {
            config.location_radius_km = v;
        }
        if let Some(v) = env_parse::<u64>("CPV_ADAPTER_TIMEOUT_SECS") {
            config.adapter_timeout_secs = v;
        }
        if let Some(v) = env_string("CPV_SIGHTENGINE_API_USER") {
            config.sightengine_api_user = Some(v);
        }
        if let Some(v) = env_string("CPV_SIGHTENGINE_API_SECRET") {
            config.sightengine_api_secret = Some(v);
        }
        if let Some(v) = env_string("CPV_GEMINI_API_KEY") {
            config.gemini_api_key = Some(v);
        }
        if let Some(v) = env_string("CPV_GEMINI_MODEL") {
            config.gemini_model = v;
        }
        if let Some(v) = env_string("CPV_VISION_MODE") {
            match parse_vision_mode(&v) {
                Some(mode) => config.vision_mode = mode,
                None => warn!(value = %v, "unknown CPV_VISION_MODE, keeping previous"),
            }
        }
        if let Some(v) = env_bool("CPV_GEOCODING_ENABLED") {
            config.geocoding_enabled = v;
        }

        // A real vision provider needs its key; fall back rather than fail
        if config.vision_mode == VisionMode::Gemini && config.gemini_api_key.is_none() {
            warn!("vision_mode is gemini but no API key configured, using mock classifier");
            config.vision_mode = VisionMode::Mock;
        }

        info!(
            strict_exif = config.strict_exif_required,
            ai_threshold = config.ai_generation_threshold,
            hash_threshold = config.hash_distance_threshold,
            radius_km = config.location_radius_km,
            vision_mode = ?config.vision_mode,
            ai_detection = config.has_sightengine_credentials(),
            "validation configuration resolved"
        );

        config
    }

    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_secs(self.adapter_timeout_secs)
    }

    pub fn has_sightengine_credentials(&self) -> bool {
        matches!(
            (&self.sightengine_api_user, &self.sightengine_api_secret),
            (Some(user), Some(secret)) if !user.trim().is_empty() && !secret.trim().is_empty()
        )
    }
}

fn parse_vision_mode(value: &str) -> Option<VisionMode> {
    match value.trim().to_ascii_lowercase().as_str() {
        "mock" => Some(VisionMode::Mock),
        "gemini" => Some(VisionMode::Gemini),
        _ => None,
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_bool(name: &str) -> Option<bool> {
    env_string(name).map(|v| v.trim().eq_ignore_ascii_case("true") || v.trim() == "1")
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    let raw = env_string(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(var = name, value = %raw, "unparseable environment override, ignoring");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn defaults_without_any_source() {
        let config = ValidationConfig::resolve(&TomlConfig::default());
        assert!(!config.strict_exif_required);
        assert_eq!(config.ai_generation_threshold, 0.8);
        assert_eq!(config.hash_distance_threshold, 5);
        assert_eq!(config.location_radius_km, 10.0);
        assert_eq!(config.vision_mode, VisionMode::Mock);
        assert!(!config.has_sightengine_credentials());
    }

    #[test]
    #[serial]
    fn env_overrides_toml() {
        let toml = TomlConfig {
            location_radius_km: Some(25.0),
            hash_distance_threshold: Some(8),
            ..TomlConfig::default()
        };

        std::env::set_var("CPV_LOCATION_RADIUS_KM", "3.5");
        let config = ValidationConfig::resolve(&toml);
        std::env::remove_var("CPV_LOCATION_RADIUS_KM");

        assert_eq!(config.location_radius_km, 3.5);
        // TOML value survives where no env override exists
        assert_eq!(config.hash_distance_threshold, 8);
    }

    #[test]
    #[serial]
    fn strict_mode_env_flag_parses() {
        std::env::set_var("CPV_REQUIRE_EXIF", "true");
        let config = ValidationConfig::resolve(&TomlConfig::default());
        std::env::remove_var("CPV_REQUIRE_EXIF");
        assert!(config.strict_exif_required);
    }

    #[test]
    #[serial]
    fn gemini_without_key_falls_back_to_mock() {
        let toml = TomlConfig {
            vision_mode: Some("gemini".to_string()),
            ..TomlConfig::default()
        };
        let config = ValidationConfig::resolve(&toml);
        assert_eq!(config.vision_mode, VisionMode::Mock);
    }

    #[test]
    #[serial]
    fn gemini_with_key_is_kept() {
        let toml = TomlConfig {
            vision_mode: Some("gemini".to_string()),
            gemini_api_key: Some("test-key".to_string()),
            ..TomlConfig::default()
        };
        let config = ValidationConfig::resolve(&toml);
        assert_eq!(config.vision_mode, VisionMode::Gemini);
    }
}
