// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Event categories recognised by the ingest endpoint.
//!
//! Every category has two spellings on the wire: the queue name used as a key
//! inside a batch body (`search_events`) and the type tag attached to a single
//! event body (`search`).

use serde::{Deserialize, Serialize};

/// A category of tracked event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
	/// Generic tracked interactions (pageview, click, exit, ...).
	Raw,
	/// Purchases, add-to-cart, checkout starts, signups.
	Conversion,
	/// Page timing and network snapshots.
	Performance,
	/// Scroll, pointer, keyboard and idle summaries.
	Engagement,
	/// Site search queries.
	Search,
	/// Host-defined events.
	Custom,
}

impl EventCategory {
	/// All categories, in batch body order.
	pub const ALL: [EventCategory; 6] = [
		EventCategory::Raw,
		EventCategory::Conversion,
		EventCategory::Performance,
		EventCategory::Engagement,
		EventCategory::Search,
		EventCategory::Custom,
	];

	/// The tag sent in the `type` field of a single-event body.
	pub fn type_tag(&self) -> &'static str {
		match self {
			EventCategory::Raw => "raw",
			EventCategory::Conversion => "conversion",
			EventCategory::Performance => "performance",
			EventCategory::Engagement => "engagement",
			EventCategory::Search => "search",
			EventCategory::Custom => "custom",
		}
	}

	/// The key of this category's array inside a batch body.
	pub fn queue_name(&self) -> &'static str {
		match self {
			EventCategory::Raw => "raw_events",
			EventCategory::Conversion => "conversion_events",
			EventCategory::Performance => "performance_events",
			EventCategory::Engagement => "engagement_events",
			EventCategory::Search => "search_events",
			EventCategory::Custom => "custom_events",
		}
	}

	/// Looks up a category by its batch queue name.
	pub fn from_queue_name(name: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|c| c.queue_name() == name)
	}

	/// Looks up a category by its single-event type tag.
	pub fn from_type_tag(tag: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|c| c.type_tag() == tag)
	}

	/// Position of this category inside [`EventCategory::ALL`].
	pub fn index(&self) -> usize {
		*self as usize
	}
}

impl std::fmt::Display for EventCategory {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.type_tag())
	}
}

impl std::str::FromStr for EventCategory {
	type Err = UnknownCategory;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::from_type_tag(s)
			.or_else(|| Self::from_queue_name(s))
			.ok_or_else(|| UnknownCategory(s.to_string()))
	}
}

/// Returned when a string names no known category.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event category: {0}")]
pub struct UnknownCategory(pub String);

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn queue_names_match_ingest_keys() {
		let names: Vec<_> = EventCategory::ALL.iter().map(|c| c.queue_name()).collect();
		assert_eq!(
			names,
			vec![
				"raw_events",
				"conversion_events",
				"performance_events",
				"engagement_events",
				"search_events",
				"custom_events",
			]
		);
	}

	#[test]
	fn index_follows_declaration_order() {
		for (i, category) in EventCategory::ALL.iter().enumerate() {
			assert_eq!(category.index(), i);
		}
	}

	#[test]
	fn parses_both_spellings() {
		assert_eq!("search".parse::<EventCategory>(), Ok(EventCategory::Search));
		assert_eq!(
			"search_events".parse::<EventCategory>(),
			Ok(EventCategory::Search)
		);
		assert!("clicks".parse::<EventCategory>().is_err());
	}

	#[test]
	fn serializes_as_type_tag() {
		let json = serde_json::to_string(&EventCategory::Conversion).unwrap();
		assert_eq!(json, "\"conversion\"");
	}

	#[test]
	fn unknown_queue_name_is_none() {
		assert_eq!(EventCategory::from_queue_name("raw"), None);
		assert_eq!(EventCategory::from_queue_name("video_events"), None);
	}
}
