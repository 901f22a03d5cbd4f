// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Dedicated per-category endpoints.
//!
//! A category without a route is delivered through the unified ingest path.

use analytiq_core::EventCategory;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RoutesConfigLayer {
	pub conversion_url: Option<String>,
	pub engagement_url: Option<String>,
	pub performance_url: Option<String>,
	pub search_url: Option<String>,
	pub custom_url: Option<String>,
	pub mirror_to_batch: Option<bool>,
}

impl RoutesConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.conversion_url.is_some() {
			self.conversion_url = other.conversion_url;
		}
		if other.engagement_url.is_some() {
			self.engagement_url = other.engagement_url;
		}
		if other.performance_url.is_some() {
			self.performance_url = other.performance_url;
		}
		if other.search_url.is_some() {
			self.search_url = other.search_url;
		}
		if other.custom_url.is_some() {
			self.custom_url = other.custom_url;
		}
		if other.mirror_to_batch.is_some() {
			self.mirror_to_batch = other.mirror_to_batch;
		}
	}

	pub fn finalize(self) -> RoutesConfig {
		RoutesConfig {
			conversion: self.conversion_url,
			engagement: self.engagement_url,
			performance: self.performance_url,
			search: self.search_url,
			custom: self.custom_url,
			mirror_to_batch: self.mirror_to_batch.unwrap_or(false),
		}
	}
}

/// Resolved routing table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RoutesConfig {
	pub conversion: Option<String>,
	pub engagement: Option<String>,
	pub performance: Option<String>,
	pub search: Option<String>,
	pub custom: Option<String>,
	/// Also queue routed events for the unified batch.
	pub mirror_to_batch: bool,
}

impl RoutesConfig {
	/// The dedicated address for `category`, if one is configured.
	///
	/// Raw events are never routed.
	pub fn endpoint_for(&self, category: EventCategory) -> Option<&str> {
		match category {
			EventCategory::Raw => None,
			EventCategory::Conversion => self.conversion.as_deref(),
			EventCategory::Performance => self.performance.as_deref(),
			EventCategory::Engagement => self.engagement.as_deref(),
			EventCategory::Search => self.search.as_deref(),
			EventCategory::Custom => self.custom.as_deref(),
		}
	}

	/// Configured routes with their config keys, for validation.
	pub(crate) fn configured(&self) -> impl Iterator<Item = (&'static str, &str)> {
		[
			("routes.conversion_url", self.conversion.as_deref()),
			("routes.engagement_url", self.engagement.as_deref()),
			("routes.performance_url", self.performance.as_deref()),
			("routes.search_url", self.search.as_deref()),
			("routes.custom_url", self.custom.as_deref()),
		]
		.into_iter()
		.filter_map(|(key, url)| url.map(|u| (key, u)))
	}
}
