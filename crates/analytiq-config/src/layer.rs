// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partial configuration as produced by a single source.

use serde::{Deserialize, Serialize};

use crate::sections::{
	BatchConfigLayer, MonitoringConfigLayer, RoutesConfigLayer, SiteConfigLayer,
	StorageConfigLayer,
};

/// One source's view of the tracker configuration. Later layers override
/// earlier ones field by field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TrackerConfigLayer {
	pub site: Option<SiteConfigLayer>,
	pub batch: Option<BatchConfigLayer>,
	pub monitoring: Option<MonitoringConfigLayer>,
	pub routes: Option<RoutesConfigLayer>,
	pub storage: Option<StorageConfigLayer>,
}

fn merge_section<T: Default>(target: &mut Option<T>, other: Option<T>, merge: impl FnOnce(&mut T, T)) {
	if let Some(other) = other {
		merge(target.get_or_insert_with(T::default), other);
	}
}

impl TrackerConfigLayer {
	pub fn merge(&mut self, other: Self) {
		merge_section(&mut self.site, other.site, SiteConfigLayer::merge);
		merge_section(&mut self.batch, other.batch, BatchConfigLayer::merge);
		merge_section(&mut self.monitoring, other.monitoring, MonitoringConfigLayer::merge);
		merge_section(&mut self.routes, other.routes, RoutesConfigLayer::merge);
		merge_section(&mut self.storage, other.storage, StorageConfigLayer::merge);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_merge_fills_missing_sections() {
		let mut base = TrackerConfigLayer::default();
		base.merge(TrackerConfigLayer {
			batch: Some(BatchConfigLayer {
				batch_size: Some(10),
				..Default::default()
			}),
			..Default::default()
		});
		assert_eq!(base.batch.as_ref().and_then(|b| b.batch_size), Some(10));
		assert!(base.site.is_none());
	}

	#[test]
	fn test_merge_is_field_wise() {
		let mut base = TrackerConfigLayer {
			site: Some(SiteConfigLayer {
				site_id: Some("from_file".to_string()),
				site_key: Some("file_key".to_string()),
				..Default::default()
			}),
			..Default::default()
		};
		base.merge(TrackerConfigLayer {
			site: Some(SiteConfigLayer {
				site_key: Some("env_key".to_string()),
				..Default::default()
			}),
			..Default::default()
		});
		let site = base.site.unwrap();
		assert_eq!(site.site_id.as_deref(), Some("from_file"));
		assert_eq!(site.site_key.as_deref(), Some("env_key"));
	}

	#[test]
	fn test_parses_toml() {
		let layer: TrackerConfigLayer = toml::from_str(
			r#"
			[site]
			site_id = "site_1"
			site_key = "key_1"

			[batch]
			batch_size = 5

			[routes]
			search_url = "https://search.example.com"
			mirror_to_batch = true
			"#,
		)
		.unwrap();
		assert_eq!(layer.batch.unwrap().batch_size, Some(5));
		assert_eq!(layer.routes.unwrap().mirror_to_batch, Some(true));
	}
}
