// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared HTTP client with consistent User-Agent header.

use reqwest::{Client, ClientBuilder};

/// Creates a new HTTP client with the standard Analytiq User-Agent header.
pub fn new_client() -> Result<Client, reqwest::Error> {
	builder().build()
}

/// Creates a new HTTP client builder with the standard Analytiq User-Agent header.
///
/// # Example
/// ```ignore
/// let client = analytiq_common_http::builder()
///     .pool_max_idle_per_host(2)
///     .build()?;
/// ```
pub fn builder() -> ClientBuilder {
	Client::builder().user_agent(user_agent())
}

/// Creates a new HTTP client builder with a custom User-Agent header.
pub fn builder_with_user_agent(user_agent: impl Into<String>) -> ClientBuilder {
	Client::builder().user_agent(user_agent.into())
}

/// `{os}-{arch}` of the running binary.
pub fn platform() -> String {
	format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH)
}

/// Returns the standard Analytiq User-Agent string.
///
/// Format: `analytiq/{platform}/{version}`
pub fn user_agent() -> String {
	format!("analytiq/{}/{}", platform(), env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn user_agent_has_correct_format() {
		let ua = user_agent();
		let parts: Vec<&str> = ua.split('/').collect();
		assert_eq!(parts.len(), 3);
		assert_eq!(parts[0], "analytiq");
		assert_eq!(parts[1], platform());
		assert_eq!(parts[2], env!("CARGO_PKG_VERSION"));
	}

	#[test]
	fn builders_build() {
		assert!(new_client().is_ok());
		assert!(builder_with_user_agent("my-custom-agent/1.0").build().is_ok());
	}
}
