// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Network delivery of ingest bodies.
//!
//! A send either succeeds or returns an error; the caller decides whether a
//! failure drops the data or demotes it to the batch queue.

use analytiq_config::SiteConfig;
use analytiq_core::{IngestBody, IngestResponse, SiteKey, SITE_ID_HEADER, SITE_KEY_HEADER};
use reqwest::Client;
use tracing::{debug, trace};

use crate::error::{AnalyticsError, Result};

/// One POST to an ingest address.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestRequest {
	pub url: String,
	pub body: IngestBody,
}

/// Delivers ingest bodies.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
	async fn send(&self, request: IngestRequest) -> Result<()>;
}

/// HTTP transport with the site identity headers.
///
/// No timeout is configured; a send lasts as long as the network stack lets it.
pub struct HttpTransport {
	client: Client,
	site_id: String,
	site_key: SiteKey,
}

impl HttpTransport {
	pub fn new(site: &SiteConfig) -> Result<Self> {
		let client = analytiq_common_http::new_client().map_err(AnalyticsError::RequestFailed)?;
		Ok(Self::with_client(client, site))
	}

	/// Uses a caller-provided client, e.g. one with a proxy configured.
	pub fn with_client(client: Client, site: &SiteConfig) -> Self {
		Self {
			client,
			site_id: site.site_id.clone(),
			site_key: site.site_key.clone(),
		}
	}
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
	async fn send(&self, request: IngestRequest) -> Result<()> {
		let count = request.body.event_count();
		debug!(url = %request.url, count, "Sending ingest request");

		let response = self
			.client
			.post(&request.url)
			.header(SITE_ID_HEADER, &self.site_id)
			.header(SITE_KEY_HEADER, self.site_key.expose())
			.json(&request.body)
			.send()
			.await?;

		if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
			let retry_after = response
				.headers()
				.get("Retry-After")
				.and_then(|v| v.to_str().ok())
				.and_then(|s| s.parse().ok());
			return Err(AnalyticsError::RateLimited {
				retry_after_secs: retry_after,
			});
		}

		if !response.status().is_success() {
			let status = response.status().as_u16();
			let message = response.text().await.unwrap_or_default();
			return Err(AnalyticsError::ServerError { status, message });
		}

		match response.json::<IngestResponse>().await {
			Ok(ack) => trace!(
				status = %ack.status,
				processed_count = ?ack.processed_count,
				"Ingest acknowledged"
			),
			Err(e) => trace!(error = %e, "Ingest response was not an acknowledgement"),
		}

		Ok(())
	}
}
