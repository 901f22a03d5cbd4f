// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Engagement and performance monitoring cadence.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MonitoringConfigLayer {
	pub engagement_update_interval_ms: Option<u64>,
	pub performance_update_interval_ms: Option<u64>,
	pub idle_threshold_ms: Option<u64>,
	pub activity_threshold_ms: Option<u64>,
	pub recent_activity_threshold_ms: Option<u64>,
	pub load_report_delay_ms: Option<u64>,
}

impl MonitoringConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.engagement_update_interval_ms.is_some() {
			self.engagement_update_interval_ms = other.engagement_update_interval_ms;
		}
		if other.performance_update_interval_ms.is_some() {
			self.performance_update_interval_ms = other.performance_update_interval_ms;
		}
		if other.idle_threshold_ms.is_some() {
			self.idle_threshold_ms = other.idle_threshold_ms;
		}
		if other.activity_threshold_ms.is_some() {
			self.activity_threshold_ms = other.activity_threshold_ms;
		}
		if other.recent_activity_threshold_ms.is_some() {
			self.recent_activity_threshold_ms = other.recent_activity_threshold_ms;
		}
		if other.load_report_delay_ms.is_some() {
			self.load_report_delay_ms = other.load_report_delay_ms;
		}
	}

	pub fn finalize(self) -> MonitoringConfig {
		let ms = Duration::from_millis;
		MonitoringConfig {
			engagement_update_interval: ms(self.engagement_update_interval_ms.unwrap_or(30_000)),
			performance_update_interval: ms(self.performance_update_interval_ms.unwrap_or(10_000)),
			idle_threshold: ms(self.idle_threshold_ms.unwrap_or(30_000)),
			activity_threshold: ms(self.activity_threshold_ms.unwrap_or(60_000)),
			recent_activity_threshold: ms(self.recent_activity_threshold_ms.unwrap_or(120_000)),
			load_report_delay: ms(self.load_report_delay_ms.unwrap_or(1_000)),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitoringConfig {
	/// Cadence of periodic engagement snapshots.
	pub engagement_update_interval: Duration,
	/// Cadence of periodic performance snapshots.
	pub performance_update_interval: Duration,
	/// Activity gaps longer than this count as idle time.
	pub idle_threshold: Duration,
	/// Engagement snapshots are skipped once the visitor has been inactive this long.
	pub activity_threshold: Duration,
	/// Performance snapshots are skipped once the visitor has been inactive this long.
	pub recent_activity_threshold: Duration,
	/// Delay between the page `load` signal and the one-off performance report.
	pub load_report_delay: Duration,
}

impl Default for MonitoringConfig {
	fn default() -> Self {
		MonitoringConfigLayer::default().finalize()
	}
}

impl MonitoringConfig {
	/// Every duration paired with its config key, for validation.
	pub(crate) fn durations(&self) -> [(&'static str, Duration); 6] {
		[
			("monitoring.engagement_update_interval_ms", self.engagement_update_interval),
			("monitoring.performance_update_interval_ms", self.performance_update_interval),
			("monitoring.idle_threshold_ms", self.idle_threshold),
			("monitoring.activity_threshold_ms", self.activity_threshold),
			("monitoring.recent_activity_threshold_ms", self.recent_activity_threshold),
			("monitoring.load_report_delay_ms", self.load_report_delay),
		]
	}
}
