// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the Analytiq tracker.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`ANALYTIQ_*`)
//!
//! # Usage
//!
//! ```ignore
//! use analytiq_config::load_config;
//!
//! let config = load_config()?;
//! println!("sending to {}", config.ingest_url());
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::TrackerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use std::time::Duration;

use analytiq_core::{SiteKey, INGEST_PATH};
use tracing::{debug, info};

/// Fully resolved tracker configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
	pub site: SiteConfig,
	pub batch: BatchConfig,
	pub monitoring: MonitoringConfig,
	pub routes: RoutesConfig,
	pub storage: StorageConfig,
}

impl TrackerConfig {
	/// Default configuration for one site, sending to [`DEFAULT_BASE_URL`].
	pub fn new(site_id: impl Into<String>, site_key: impl Into<SiteKey>) -> Self {
		Self {
			site: SiteConfig {
				site_id: site_id.into(),
				site_key: site_key.into(),
				base_url: DEFAULT_BASE_URL.to_string(),
			},
			batch: BatchConfig::default(),
			monitoring: MonitoringConfig::default(),
			routes: RoutesConfig::default(),
			storage: StorageConfig::default(),
		}
	}

	/// Replaces the base URL. The trailing slash, if any, is dropped.
	pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
		self.site.base_url = base_url.into().trim_end_matches('/').to_string();
		self
	}

	/// The unified ingest address, `{base}/ingest`.
	pub fn ingest_url(&self) -> String {
		format!("{}{}", self.site.base_url, INGEST_PATH)
	}

	/// Checks cross-field rules. Loaders call this automatically.
	pub fn validate(&self) -> Result<(), ConfigError> {
		validate_config(self)
	}
}

fn merge_sources(sources: Vec<Box<dyn ConfigSource>>) -> Result<TrackerConfigLayer, ConfigError> {
	let mut sources = sources;
	sources.sort_by_key(|s| s.precedence());

	let mut merged = TrackerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}
	Ok(merged)
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`ANALYTIQ_*`)
/// 2. Config file (`<config dir>/analytiq/tracker.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<TrackerConfig, ConfigError> {
	let mut sources: Vec<Box<dyn ConfigSource>> = vec![Box::new(DefaultsSource), Box::new(EnvSource)];
	if let Some(user) = TomlSource::user() {
		sources.push(Box::new(user));
	}
	finalize(merge_sources(sources)?)
}

/// Load configuration from environment only.
pub fn load_config_from_env() -> Result<TrackerConfig, ConfigError> {
	let mut merged = TrackerConfigLayer::default();
	merged.merge(EnvSource.load()?);
	finalize(merged)
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<TrackerConfig, ConfigError> {
	let sources: Vec<Box<dyn ConfigSource>> = vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	];
	finalize(merge_sources(sources)?)
}

/// Finalize configuration layer into resolved config.
pub fn finalize(layer: TrackerConfigLayer) -> Result<TrackerConfig, ConfigError> {
	let site = layer.site.unwrap_or_default().finalize()?;
	let batch = layer.batch.unwrap_or_default().finalize();
	let monitoring = layer.monitoring.unwrap_or_default().finalize();
	let routes = layer.routes.unwrap_or_default().finalize();
	let storage = layer.storage.unwrap_or_default().finalize();

	let config = TrackerConfig {
		site,
		batch,
		monitoring,
		routes,
		storage,
	};
	validate_config(&config)?;

	info!(
		site_id = %config.site.site_id,
		base_url = %config.site.base_url,
		batch_size = config.batch.batch_size,
		batch_interval_ms = config.batch.batch_interval.as_millis() as u64,
		routed_categories = config.routes.configured().count(),
		persistent_storage = config.storage.path.is_some(),
		"Tracker configuration loaded"
	);

	Ok(config)
}

/// Validate cross-field configuration rules.
fn validate_config(config: &TrackerConfig) -> Result<(), ConfigError> {
	if config.batch.batch_size == 0 {
		return Err(ConfigError::invalid_value(
			"batch.batch_size",
			"must be at least 1",
		));
	}
	if config.batch.batch_interval == Duration::ZERO {
		return Err(ConfigError::invalid_value(
			"batch.batch_interval_ms",
			"must be greater than zero",
		));
	}
	for (key, value) in config.monitoring.durations() {
		if value == Duration::ZERO {
			return Err(ConfigError::invalid_value(key, "must be greater than zero"));
		}
	}
	parse_http_url("site.base_url", &config.site.base_url)?;
	for (key, url) in config.routes.configured() {
		parse_http_url(key, url)?;
	}
	Ok(())
}
