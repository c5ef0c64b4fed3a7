/*!
This module defines the `StoreConfig` struct, which is used to configure a [`DatasetStore`](../struct.DatasetStore.html).
*/

use anyhow::{Context, Result};
use spotlight_colors::ColorPreferences;
use std::path::Path;

#[derive(Clone, Debug, Default, serde::Deserialize)]
pub struct StoreConfig {
	/// The number of histogram bins the relevance computation compares.
	pub relevance_bins: Option<usize>,
	/// Int columns with more unique values than this are colored continuously.
	pub max_categorical_ints: Option<usize>,
	/// The initial color preferences of a store that creates its own preference store.
	pub color_preferences: Option<ColorPreferences>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("invalid store config")]
	Json(#[from] serde_json::Error),
	#[error("relevance_bins must be at least 1")]
	InvalidRelevanceBins,
}

impl StoreConfig {
	pub fn from_json_str(json: &str) -> Result<StoreConfig, ConfigError> {
		let config: StoreConfig = serde_json::from_str(json)?;
		if config.relevance_bins == Some(0) {
			return Err(ConfigError::InvalidRelevanceBins);
		}
		Ok(config)
	}

	pub fn from_path(path: &Path) -> Result<StoreConfig> {
		let json = std::fs::read_to_string(path)
			.with_context(|| format!("failed to read config file {}", path.display()))?;
		let config = StoreConfig::from_json_str(&json)
			.with_context(|| format!("failed to parse config file {}", path.display()))?;
		Ok(config)
	}

	pub fn relevance_bins(&self) -> usize {
		self.relevance_bins
			.unwrap_or(spotlight_relevance::DEFAULT_RELEVANCE_BINS)
	}
}

#[test]
fn test_config_defaults() {
	let config = StoreConfig::from_json_str("{}").unwrap();
	assert_eq!(config.relevance_bins(), 5);
	assert_eq!(config.max_categorical_ints, None);
	assert!(config.color_preferences.is_none());
}

#[test]
fn test_config_parse() {
	let config = StoreConfig::from_json_str(
		r#"{
			"relevance_bins": 8,
			"max_categorical_ints": 100,
			"color_preferences": { "robust": true }
		}"#,
	)
	.unwrap();
	assert_eq!(config.relevance_bins(), 8);
	assert_eq!(config.max_categorical_ints, Some(100));
	assert!(config.color_preferences.unwrap().robust);
	assert!(matches!(
		StoreConfig::from_json_str(r#"{ "relevance_bins": 0 }"#),
		Err(ConfigError::InvalidRelevanceBins)
	));
	assert!(matches!(
		StoreConfig::from_json_str("{"),
		Err(ConfigError::Json(_))
	));
}
