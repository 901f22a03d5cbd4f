// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Event envelopes, the unit that leaves the tracker.
//!
//! Raw events nest their context under `payload`; category events
//! (conversion, engagement, performance, search, custom) are flat objects.
//! Both always carry the visitor id, the session id and a client timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::identity::{SessionId, VisitorId};

/// A generic tracked interaction with its full context payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
	pub site_id: String,
	pub ts: DateTime<Utc>,
	pub event_type: String,
	pub payload: Map<String, Value>,
	pub visitor_id: VisitorId,
	pub session_id: SessionId,
}

/// Keys owned by a category envelope and its single-event wrapper. Flat
/// fields must not reuse them.
pub const ENVELOPE_KEYS: &[&str] = &[
	"site_id",
	"ts",
	"visitor_id",
	"session_id",
	"event_type",
	"type",
];

/// A flat event bound for one of the specialised categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryEvent {
	pub site_id: String,
	pub ts: DateTime<Utc>,
	pub visitor_id: VisitorId,
	pub session_id: SessionId,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub event_type: Option<String>,
	#[serde(flatten)]
	pub fields: Map<String, Value>,
}

impl CategoryEvent {
	/// Looks up a flattened field.
	pub fn field(&self, key: &str) -> Option<&Value> {
		self.fields.get(key)
	}
}

/// Either shape of event, as stored in the batch queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Envelope {
	Raw(RawEvent),
	Category(CategoryEvent),
}

impl Envelope {
	pub fn visitor_id(&self) -> &VisitorId {
		match self {
			Envelope::Raw(e) => &e.visitor_id,
			Envelope::Category(e) => &e.visitor_id,
		}
	}

	pub fn session_id(&self) -> &SessionId {
		match self {
			Envelope::Raw(e) => &e.session_id,
			Envelope::Category(e) => &e.session_id,
		}
	}

	pub fn timestamp(&self) -> DateTime<Utc> {
		match self {
			Envelope::Raw(e) => e.ts,
			Envelope::Category(e) => e.ts,
		}
	}

	/// The event type, if the envelope has one.
	pub fn event_type(&self) -> Option<&str> {
		match self {
			Envelope::Raw(e) => Some(e.event_type.as_str()),
			Envelope::Category(e) => e.event_type.as_deref(),
		}
	}

	/// Looks up a field in the payload (raw) or the flat body (category).
	pub fn field(&self, key: &str) -> Option<&Value> {
		match self {
			Envelope::Raw(e) => e.payload.get(key),
			Envelope::Category(e) => e.fields.get(key),
		}
	}
}

impl From<RawEvent> for Envelope {
	fn from(event: RawEvent) -> Self {
		Envelope::Raw(event)
	}
}

impl From<CategoryEvent> for Envelope {
	fn from(event: CategoryEvent) -> Self {
		Envelope::Category(event)
	}
}
