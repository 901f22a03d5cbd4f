// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::TrackerConfigLayer;
use crate::sections::{
	BatchConfigLayer, MonitoringConfigLayer, RoutesConfigLayer, SiteConfigLayer,
	StorageConfigLayer,
};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<TrackerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<TrackerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(TrackerConfigLayer::default())
	}
}

/// TOML file configuration source.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	/// `<config dir>/analytiq/tracker.toml`, if a config dir exists.
	pub fn user() -> Option<Self> {
		dirs::config_dir().map(|dir| Self::new(dir.join("analytiq").join("tracker.toml")))
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<TrackerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(TrackerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: TrackerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: ANALYTIQ_<FIELD>, durations suffixed `_MS`.
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<TrackerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(TrackerConfigLayer {
			site: Some(load_site_from_env()),
			batch: Some(load_batch_from_env()?),
			monitoring: Some(load_monitoring_from_env()?),
			routes: Some(load_routes_from_env()),
			storage: Some(load_storage_from_env()),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_bool(name: &str) -> Option<bool> {
	env_var(name).map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn env_u64(name: &str) -> Result<Option<u64>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			field: name.to_string(),
			message: format!("invalid u64 value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn env_usize(name: &str) -> Result<Option<usize>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			field: name.to_string(),
			message: format!("invalid count '{v}'"),
		}),
		None => Ok(None),
	}
}

fn load_site_from_env() -> SiteConfigLayer {
	SiteConfigLayer {
		site_id: env_var("ANALYTIQ_SITE_ID"),
		site_key: env_var("ANALYTIQ_SITE_KEY"),
		base_url: env_var("ANALYTIQ_BASE_URL"),
		loader_script_url: env_var("ANALYTIQ_LOADER_SCRIPT_URL"),
	}
}

fn load_batch_from_env() -> Result<BatchConfigLayer, ConfigError> {
	Ok(BatchConfigLayer {
		batch_size: env_usize("ANALYTIQ_BATCH_SIZE")?,
		batch_interval_ms: env_u64("ANALYTIQ_BATCH_INTERVAL_MS")?,
	})
}

fn load_monitoring_from_env() -> Result<MonitoringConfigLayer, ConfigError> {
	Ok(MonitoringConfigLayer {
		engagement_update_interval_ms: env_u64("ANALYTIQ_ENGAGEMENT_UPDATE_INTERVAL_MS")?,
		performance_update_interval_ms: env_u64("ANALYTIQ_PERFORMANCE_UPDATE_INTERVAL_MS")?,
		idle_threshold_ms: env_u64("ANALYTIQ_IDLE_THRESHOLD_MS")?,
		activity_threshold_ms: env_u64("ANALYTIQ_ACTIVITY_THRESHOLD_MS")?,
		recent_activity_threshold_ms: env_u64("ANALYTIQ_RECENT_ACTIVITY_THRESHOLD_MS")?,
		load_report_delay_ms: env_u64("ANALYTIQ_LOAD_REPORT_DELAY_MS")?,
	})
}

fn load_routes_from_env() -> RoutesConfigLayer {
	RoutesConfigLayer {
		conversion_url: env_var("ANALYTIQ_ROUTE_CONVERSION_URL"),
		engagement_url: env_var("ANALYTIQ_ROUTE_ENGAGEMENT_URL"),
		performance_url: env_var("ANALYTIQ_ROUTE_PERFORMANCE_URL"),
		search_url: env_var("ANALYTIQ_ROUTE_SEARCH_URL"),
		custom_url: env_var("ANALYTIQ_ROUTE_CUSTOM_URL"),
		mirror_to_batch: env_bool("ANALYTIQ_ROUTE_MIRROR_TO_BATCH"),
	}
}

fn load_storage_from_env() -> StorageConfigLayer {
	StorageConfigLayer {
		path: env_var("ANALYTIQ_STORAGE_PATH").map(PathBuf::from),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn test_precedence_order() {
		assert!(Precedence::Defaults < Precedence::ConfigFile);
		assert!(Precedence::ConfigFile < Precedence::Environment);
	}

	#[test]
	fn test_missing_file_is_empty_layer() {
		let source = TomlSource::new("/nonexistent/analytiq/tracker.toml");
		assert_eq!(source.load().unwrap(), TrackerConfigLayer::default());
	}

	#[test]
	fn test_toml_source_reads_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[monitoring]\nidle_threshold_ms = 15000").unwrap();
		let layer = TomlSource::new(file.path()).load().unwrap();
		assert_eq!(layer.monitoring.unwrap().idle_threshold_ms, Some(15_000));
	}

	#[test]
	fn test_toml_source_reports_parse_errors() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[batch]\nbatch_size = \"many\"").unwrap();
		let err = TomlSource::new(file.path()).load().unwrap_err();
		assert!(matches!(err, ConfigError::TomlParse { .. }));
	}
}
