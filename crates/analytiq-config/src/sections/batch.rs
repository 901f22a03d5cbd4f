// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Batch flush thresholds.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_BATCH_SIZE: usize = 20;
pub const DEFAULT_BATCH_INTERVAL_MS: u64 = 5_000;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BatchConfigLayer {
	pub batch_size: Option<usize>,
	pub batch_interval_ms: Option<u64>,
}

impl BatchConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.batch_size.is_some() {
			self.batch_size = other.batch_size;
		}
		if other.batch_interval_ms.is_some() {
			self.batch_interval_ms = other.batch_interval_ms;
		}
	}

	pub fn finalize(self) -> BatchConfig {
		BatchConfig {
			batch_size: self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
			batch_interval: Duration::from_millis(
				self.batch_interval_ms.unwrap_or(DEFAULT_BATCH_INTERVAL_MS),
			),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
	/// Total queued events across all categories that forces a flush.
	pub batch_size: usize,
	/// Delay before a time-triggered flush.
	pub batch_interval: Duration,
}

impl Default for BatchConfig {
	fn default() -> Self {
		BatchConfigLayer::default().finalize()
	}
}
