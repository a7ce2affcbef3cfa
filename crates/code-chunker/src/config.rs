use crate::error::{ChunkerError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for chunk sizing, signal extraction and classification.
///
/// Supplied once and never mutated while files are processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Preferred chunk size in bytes; siblings merge while under it
    pub target_chunk_bytes: usize,

    /// Size above which a unit is descended into (soft limit)
    pub max_chunk_bytes: usize,

    /// Lines at least this long become atomic, unsplittable units
    pub long_line_threshold_bytes: usize,

    /// Classifier calibration
    pub classifier: ClassifierConfig,

    /// Signal extraction calibration
    pub signals: SignalConfig,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            target_chunk_bytes: 1500,
            max_chunk_bytes: 4000,
            long_line_threshold_bytes: 512,
            classifier: ClassifierConfig::default(),
            signals: SignalConfig::default(),
        }
    }
}

/// Calibration of the weighted-sum classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Confidence must exceed this for a positive classification
    pub acceptance_threshold: f64,

    /// Weighted sums are divided by this before capping at 1.0
    pub confidence_normalizer: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            acceptance_threshold: 0.5,
            confidence_normalizer: 1.0,
        }
    }
}

/// Calibration of the signal extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// A file, unit or literal larger than this multiple of the median
    /// construct size is a size outlier
    pub size_outlier_multiple: f64,

    /// Share of a body's statement lines that must be delegation lines
    pub delegation_min_line_fraction: f64,

    /// String literals shorter than this are not tracked
    pub min_literal_bytes: usize,

    /// Check generated units against their template lines
    pub audit_templates: bool,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            size_outlier_multiple: 32.0,
            delegation_min_line_fraction: 0.8,
            min_literal_bytes: 32,
            audit_templates: true,
        }
    }
}

impl ChunkerConfig {
    /// Create config optimized for embeddings (smaller, focused chunks)
    pub fn for_embeddings() -> Self {
        Self {
            target_chunk_bytes: 1000,
            max_chunk_bytes: 2000,
            ..Default::default()
        }
    }

    /// Create config optimized for LLM context (larger, comprehensive chunks)
    pub fn for_llm_context() -> Self {
        Self {
            target_chunk_bytes: 3000,
            max_chunk_bytes: 8000,
            ..Default::default()
        }
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate().map_err(ChunkerError::invalid_config)?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.target_chunk_bytes == 0 {
            return Err("target_chunk_bytes must be > 0".to_string());
        }

        if self.target_chunk_bytes > self.max_chunk_bytes {
            return Err(format!(
                "target_chunk_bytes ({}) cannot exceed max_chunk_bytes ({})",
                self.target_chunk_bytes, self.max_chunk_bytes
            ));
        }

        if self.long_line_threshold_bytes == 0 {
            return Err("long_line_threshold_bytes must be > 0".to_string());
        }

        let threshold = self.classifier.acceptance_threshold;
        if !(0.0..1.0).contains(&threshold) {
            return Err(format!(
                "classifier.acceptance_threshold ({threshold}) must be in [0, 1)"
            ));
        }

        let normalizer = self.classifier.confidence_normalizer;
        if !normalizer.is_finite() || normalizer <= 0.0 {
            return Err(format!(
                "classifier.confidence_normalizer ({normalizer}) must be a positive number"
            ));
        }

        let multiple = self.signals.size_outlier_multiple;
        if !multiple.is_finite() || multiple < 1.0 {
            return Err(format!(
                "signals.size_outlier_multiple ({multiple}) must be >= 1"
            ));
        }

        let fraction = self.signals.delegation_min_line_fraction;
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(format!(
                "signals.delegation_min_line_fraction ({fraction}) must be in (0, 1]"
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = ChunkerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.target_chunk_bytes, 1500);
        assert_eq!(config.max_chunk_bytes, 4000);
        assert_eq!(config.long_line_threshold_bytes, 512);
        assert!((config.classifier.acceptance_threshold - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_preset_configs_valid() {
        assert!(ChunkerConfig::for_embeddings().validate().is_ok());
        assert!(ChunkerConfig::for_llm_context().validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ChunkerConfig {
            target_chunk_bytes: 5000,
            max_chunk_bytes: 4000,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.target_chunk_bytes = 0;
        assert!(config.validate().is_err());

        config.target_chunk_bytes = 1000;
        assert!(config.validate().is_ok());

        config.classifier.acceptance_threshold = 1.0;
        assert!(config.validate().is_err());
        config.classifier.acceptance_threshold = 0.5;

        config.classifier.confidence_normalizer = 0.0;
        assert!(config.validate().is_err());
        config.classifier.confidence_normalizer = 1.0;

        config.signals.size_outlier_multiple = 0.5;
        assert!(config.validate().is_err());
        config.signals.size_outlier_multiple = 8.0;

        config.signals.delegation_min_line_fraction = 0.0;
        assert!(config.validate().is_err());
        config.signals.delegation_min_line_fraction = 1.0;
        assert!(config.validate().is_ok());

        config.long_line_threshold_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ChunkerConfig::from_toml_str(
            r#"
target_chunk_bytes = 800

[classifier]
acceptance_threshold = 0.6
"#,
        )
        .unwrap();

        assert_eq!(config.target_chunk_bytes, 800);
        assert_eq!(config.max_chunk_bytes, 4000);
        assert!((config.classifier.acceptance_threshold - 0.6).abs() < f64::EPSILON);
        assert!((config.classifier.confidence_normalizer - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_invalid_toml_is_configuration_error() {
        let err = ChunkerConfig::from_toml_str("target_chunk_bytes = \"big\"").unwrap_err();
        assert!(matches!(err, ChunkerError::ConfigParse(_)));
        assert!(err.is_configuration());

        let err = ChunkerConfig::from_toml_str("target_chunk_bytes = 9000").unwrap_err();
        assert!(matches!(err, ChunkerError::InvalidConfig(_)));
    }

    #[test]
    fn test_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sift.toml");
        std::fs::write(&path, "max_chunk_bytes = 6000\n").unwrap();

        let config = ChunkerConfig::from_toml_file(&path).unwrap();
        assert_eq!(config.max_chunk_bytes, 6000);
    }
}
