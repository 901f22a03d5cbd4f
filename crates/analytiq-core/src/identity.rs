// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Visitor and session identifiers.
//!
//! Both are opaque tokens. Freshly generated ids are random UUIDs, but a value
//! read back from storage is kept verbatim even if it is not a UUID.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Durable identifier of a browser profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisitorId(String);

impl VisitorId {
	/// Generates a new random visitor id.
	pub fn generate() -> Self {
		Self(Uuid::new_v4().to_string())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl From<String> for VisitorId {
	fn from(value: String) -> Self {
		Self(value)
	}
}

impl std::fmt::Display for VisitorId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Identifier of a nominal browsing session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
	/// Generates a new random session id.
	pub fn generate() -> Self {
		Self(Uuid::new_v4().to_string())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl From<String> for SessionId {
	fn from(value: String) -> Self {
		Self(value)
	}
}

impl std::fmt::Display for SessionId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Result of resolving the visitor id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitorIdentity {
	pub id: VisitorId,
	/// True only when this read created the id.
	pub is_new: bool,
}
