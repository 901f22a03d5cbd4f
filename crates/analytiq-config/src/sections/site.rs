// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Site identity and base URL configuration section.

use analytiq_core::SiteKey;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;

/// Base URL used when neither an explicit value nor a loader script URL is known.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SiteConfigLayer {
	pub site_id: Option<String>,
	pub site_key: Option<String>,
	pub base_url: Option<String>,
	/// URL the tracker script was served from; its origin becomes the base URL.
	pub loader_script_url: Option<String>,
}

impl SiteConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.site_id.is_some() {
			self.site_id = other.site_id;
		}
		if other.site_key.is_some() {
			self.site_key = other.site_key;
		}
		if other.base_url.is_some() {
			self.base_url = other.base_url;
		}
		if other.loader_script_url.is_some() {
			self.loader_script_url = other.loader_script_url;
		}
	}

	pub fn finalize(self) -> Result<SiteConfig, ConfigError> {
		let site_id = self
			.site_id
			.filter(|s| !s.trim().is_empty())
			.ok_or_else(|| ConfigError::missing_field("site.site_id"))?;
		let site_key = self
			.site_key
			.filter(|s| !s.trim().is_empty())
			.ok_or_else(|| ConfigError::missing_field("site.site_key"))?;
		let base_url = resolve_base_url(
			self.base_url.as_deref(),
			self.loader_script_url.as_deref(),
		)?;

		Ok(SiteConfig {
			site_id,
			site_key: SiteKey::new(site_key),
			base_url,
		})
	}
}

/// Resolved site configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteConfig {
	pub site_id: String,
	pub site_key: SiteKey,
	/// Origin for every network send, without a trailing slash.
	pub base_url: String,
}

/// Picks the base URL: explicit value, else the loader script's origin, else
/// [`DEFAULT_BASE_URL`].
pub fn resolve_base_url(
	explicit: Option<&str>,
	loader_script_url: Option<&str>,
) -> Result<String, ConfigError> {
	if let Some(explicit) = explicit.filter(|s| !s.trim().is_empty()) {
		let url = parse_http_url("site.base_url", explicit)?;
		return Ok(url.as_str().trim_end_matches('/').to_string());
	}

	if let Some(script) = loader_script_url.filter(|s| !s.trim().is_empty()) {
		let url = parse_http_url("site.loader_script_url", script)?;
		return Ok(url.origin().ascii_serialization());
	}

	Ok(DEFAULT_BASE_URL.to_string())
}

/// Parses an absolute `http`/`https` URL.
pub fn parse_http_url(field: &str, value: &str) -> Result<Url, ConfigError> {
	let url = Url::parse(value)
		.map_err(|e| ConfigError::invalid_value(field, format!("'{value}' is not a URL: {e}")))?;
	match url.scheme() {
		"http" | "https" => Ok(url),
		other => Err(ConfigError::invalid_value(
			field,
			format!("unsupported scheme '{other}'"),
		)),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn layer() -> SiteConfigLayer {
		SiteConfigLayer {
			site_id: Some("site_1".to_string()),
			site_key: Some("key_1".to_string()),
			..Default::default()
		}
	}

	#[test]
	fn test_default_base_url() {
		let config = layer().finalize().unwrap();
		assert_eq!(config.base_url, "http://127.0.0.1:8000");
	}

	#[test]
	fn test_base_url_from_loader_script() {
		let config = SiteConfigLayer {
			loader_script_url: Some("https://cdn.analytiq.io/static/tracker.js?v=3".to_string()),
			..layer()
		}
		.finalize()
		.unwrap();
		assert_eq!(config.base_url, "https://cdn.analytiq.io");
	}

	#[test]
	fn test_explicit_base_url_wins() {
		let config = SiteConfigLayer {
			base_url: Some("https://ingest.example.com/".to_string()),
			loader_script_url: Some("https://cdn.analytiq.io/tracker.js".to_string()),
			..layer()
		}
		.finalize()
		.unwrap();
		assert_eq!(config.base_url, "https://ingest.example.com");
	}

	#[test]
	fn test_base_url_keeps_path_prefix() {
		let url = resolve_base_url(Some("https://example.com/analytics/"), None).unwrap();
		assert_eq!(url, "https://example.com/analytics");
	}

	#[test]
	fn test_missing_site_id() {
		let err = SiteConfigLayer {
			site_id: None,
			..layer()
		}
		.finalize()
		.unwrap_err();
		assert!(matches!(err, ConfigError::MissingField(f) if f == "site.site_id"));
	}

	#[test]
	fn test_blank_site_key_is_missing() {
		let err = SiteConfigLayer {
			site_key: Some("  ".to_string()),
			..layer()
		}
		.finalize()
		.unwrap_err();
		assert!(matches!(err, ConfigError::MissingField(f) if f == "site.site_key"));
	}

	#[test]
	fn test_rejects_non_http_base_url() {
		let err = resolve_base_url(Some("ftp://example.com"), None).unwrap_err();
		assert!(err.to_string().contains("unsupported scheme"));
		assert!(resolve_base_url(Some("/relative"), None).is_err());
	}

	#[test]
	fn test_merge_overwrites() {
		let mut base = layer();
		base.merge(SiteConfigLayer {
			site_id: Some("site_2".to_string()),
			..Default::default()
		});
		assert_eq!(base.site_id.as_deref(), Some("site_2"));
		assert_eq!(base.site_key.as_deref(), Some("key_1"));
	}
}
