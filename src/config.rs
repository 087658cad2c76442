//! TOML settings for the correction policy.
//!
//! Every threshold the engine applies can be tuned without recompiling:
//!
//! ```toml
//! # wavecal.toml
//! [detector]
//! min_peaks_found = 4
//! max_peaks_found = 50
//! min_relative_prominence = 0.02
//!
//! [matcher]
//! max_shift_threshold = 20.0
//! min_matched_peaks = 4
//! ```
//!
//! Missing keys fall back to the built-in defaults.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::detect::DetectorConfig;
use crate::engine::EngineConfig;
use crate::matcher::MatcherConfig;

/// Root of a `wavecal.toml` file.
#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub detector: DetectorSettings,
    #[serde(default)]
    pub matcher: MatcherSettings,
}

#[derive(Debug, Default, Deserialize)]
pub struct DetectorSettings {
    pub min_peaks_found: Option<usize>,
    pub max_peaks_found: Option<usize>,
    pub min_relative_prominence: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MatcherSettings {
    /// cm⁻¹
    pub max_shift_threshold: Option<f64>,
    pub min_matched_peaks: Option<usize>,
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse settings from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }

    /// Resolve against the defaults and check the result is coherent.
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let detector_defaults = DetectorConfig::default();
        let matcher_defaults = MatcherConfig::default();

        let config = EngineConfig {
            detector: DetectorConfig {
                min_peaks_found: self
                    .detector
                    .min_peaks_found
                    .unwrap_or(detector_defaults.min_peaks_found),
                max_peaks_found: self
                    .detector
                    .max_peaks_found
                    .unwrap_or(detector_defaults.max_peaks_found),
                min_relative_prominence: self
                    .detector
                    .min_relative_prominence
                    .unwrap_or(detector_defaults.min_relative_prominence),
            },
            matcher: MatcherConfig {
                max_shift_threshold: self
                    .matcher
                    .max_shift_threshold
                    .unwrap_or(matcher_defaults.max_shift_threshold),
                min_matched_peaks: self
                    .matcher
                    .min_matched_peaks
                    .unwrap_or(matcher_defaults.min_matched_peaks),
            },
        };

        let d = &config.detector;
        if d.min_peaks_found > d.max_peaks_found {
            bail!(
                "detector.min_peaks_found ({}) exceeds detector.max_peaks_found ({})",
                d.min_peaks_found,
                d.max_peaks_found
            );
        }
        if !(0.0..1.0).contains(&d.min_relative_prominence) {
            bail!(
                "detector.min_relative_prominence must be in [0, 1), got {}",
                d.min_relative_prominence
            );
        }
        let m = &config.matcher;
        if !(m.max_shift_threshold.is_finite() && m.max_shift_threshold > 0.0) {
            bail!(
                "matcher.max_shift_threshold must be positive, got {}",
                m.max_shift_threshold
            );
        }
        if m.min_matched_peaks == 0 {
            bail!("matcher.min_matched_peaks must be at least 1");
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_settings() {
        let toml = r#"
            [detector]
            min_peaks_found = 3
            max_peaks_found = 80
            min_relative_prominence = 0.05

            [matcher]
            max_shift_threshold = 12.5
            min_matched_peaks = 5
        "#;

        let config = Settings::from_str(toml).unwrap().engine_config().unwrap();
        assert_eq!(config.detector.min_peaks_found, 3);
        assert_eq!(config.detector.max_peaks_found, 80);
        assert_eq!(config.detector.min_relative_prominence, 0.05);
        assert_eq!(config.matcher.max_shift_threshold, 12.5);
        assert_eq!(config.matcher.min_matched_peaks, 5);
    }

    #[test]
    fn test_partial_settings() {
        let toml = r#"
            [matcher]
            max_shift_threshold = 8.0
        "#;

        let config = Settings::from_str(toml).unwrap().engine_config().unwrap();
        assert_eq!(config.matcher.max_shift_threshold, 8.0);
        assert_eq!(config.matcher.min_matched_peaks, 4);
        assert_eq!(config.detector, DetectorConfig::default());
    }

    #[test]
    fn test_empty_settings() {
        let config = Settings::from_str("").unwrap().engine_config().unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_incoherent_settings() {
        let inverted = "[detector]\nmin_peaks_found = 60\nmax_peaks_found = 50\n";
        assert!(Settings::from_str(inverted).unwrap().engine_config().is_err());

        let zero = "[matcher]\nmin_matched_peaks = 0\n";
        assert!(Settings::from_str(zero).unwrap().engine_config().is_err());

        let negative = "[matcher]\nmax_shift_threshold = -1.0\n";
        assert!(Settings::from_str(negative).unwrap().engine_config().is_err());
    }

    #[test]
    fn test_bad_toml() {
        assert!(Settings::from_str("[detector\n").is_err());
    }
}
