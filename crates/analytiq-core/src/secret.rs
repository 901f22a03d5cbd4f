// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The site key, kept out of logs.

use std::fmt;

use zeroize::Zeroize;

/// Public write key paired with a site id.
///
/// `Debug` and `Display` are redacted; call [`SiteKey::expose`] to read the
/// value when building request headers. The buffer is zeroed on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct SiteKey(String);

impl SiteKey {
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	pub fn expose(&self) -> &str {
		&self.0
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl Drop for SiteKey {
	fn drop(&mut self) {
		self.0.zeroize();
	}
}

impl fmt::Debug for SiteKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("SiteKey([REDACTED])")
	}
}

impl fmt::Display for SiteKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("[REDACTED]")
	}
}

impl From<String> for SiteKey {
	fn from(value: String) -> Self {
		Self(value)
	}
}

impl From<&str> for SiteKey {
	fn from(value: &str) -> Self {
		Self(value.to_string())
	}
}
