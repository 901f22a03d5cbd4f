// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Request bodies for the ingest endpoint.
//!
//! ```text
//! POST {base}/ingest
//! {"batch": {"raw_events": [...], ..., "custom_events": [...]}}   batched
//! {...event fields, "type": "search"}                               single
//! ```

use serde::{Deserialize, Serialize};

use crate::category::EventCategory;
use crate::event::Envelope;

/// Header carrying the site id.
pub const SITE_ID_HEADER: &str = "x-site-id";
/// Header carrying the site key.
pub const SITE_KEY_HEADER: &str = "x-site-key";
/// Path of the unified ingest endpoint, relative to the base URL.
pub const INGEST_PATH: &str = "/ingest";

/// The per-category queues of one flush.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestBatch {
	#[serde(default)]
	pub raw_events: Vec<Envelope>,
	#[serde(default)]
	pub conversion_events: Vec<Envelope>,
	#[serde(default)]
	pub performance_events: Vec<Envelope>,
	#[serde(default)]
	pub engagement_events: Vec<Envelope>,
	#[serde(default)]
	pub search_events: Vec<Envelope>,
	#[serde(default)]
	pub custom_events: Vec<Envelope>,
}

impl IngestBatch {
	pub fn queue(&self, category: EventCategory) -> &Vec<Envelope> {
		match category {
			EventCategory::Raw => &self.raw_events,
			EventCategory::Conversion => &self.conversion_events,
			EventCategory::Performance => &self.performance_events,
			EventCategory::Engagement => &self.engagement_events,
			EventCategory::Search => &self.search_events,
			EventCategory::Custom => &self.custom_events,
		}
	}

	pub fn queue_mut(&mut self, category: EventCategory) -> &mut Vec<Envelope> {
		match category {
			EventCategory::Raw => &mut self.raw_events,
			EventCategory::Conversion => &mut self.conversion_events,
			EventCategory::Performance => &mut self.performance_events,
			EventCategory::Engagement => &mut self.engagement_events,
			EventCategory::Search => &mut self.search_events,
			EventCategory::Custom => &mut self.custom_events,
		}
	}

	/// Total number of events across all categories.
	pub fn len(&self) -> usize {
		EventCategory::ALL.iter().map(|c| self.queue(*c).len()).sum()
	}

	pub fn is_empty(&self) -> bool {
		EventCategory::ALL.iter().all(|c| self.queue(*c).is_empty())
	}
}

/// A single event sent on its own, tagged with its category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SingleEvent {
	#[serde(flatten)]
	pub event: Envelope,
	#[serde(rename = "type")]
	pub category: EventCategory,
}

/// Body of an ingest POST.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum IngestBody {
	Batch { batch: IngestBatch },
	Single(SingleEvent),
}

impl IngestBody {
	/// Number of events carried by this body.
	pub fn event_count(&self) -> usize {
		match self {
			IngestBody::Batch { batch } => batch.len(),
			IngestBody::Single(_) => 1,
		}
	}
}

/// Acknowledgement returned by the ingest endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestResponse {
	pub status: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub processed_count: Option<u64>,
}
