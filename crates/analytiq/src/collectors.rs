// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Context supplied by the host page.
//!
//! Collectors are plain data producers. Geolocation is the only asynchronous
//! one; it runs a fallback chain and settles on the `(0, 0)` placeholder
//! rather than failing.

use std::sync::{Arc, RwLock, RwLockReadGuard, PoisonError};
use std::time::Duration;

use analytiq_core::{
	classify_traffic_source, parse_utm_params, DeviceInfo, GeoInfo, NetworkInfo, PageInfo,
	PerformanceMetrics, ReferrerInfo, UtmParams,
};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{AnalyticsError, Result};

/// How long one geolocation source may take before the next one is tried.
pub const GEO_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Snapshots of the page and the browser.
pub trait ContextProvider: Send + Sync {
	fn page(&self) -> PageInfo;

	fn device(&self) -> DeviceInfo {
		DeviceInfo::default()
	}

	fn network(&self) -> NetworkInfo {
		NetworkInfo::default()
	}

	fn performance(&self) -> PerformanceMetrics {
		PerformanceMetrics::default()
	}

	fn utm(&self) -> UtmParams {
		parse_utm_params(&self.page().query())
	}

	fn referrer(&self) -> ReferrerInfo {
		let page = self.page();
		let host = page.host().unwrap_or_default();
		classify_traffic_source(&page.referrer, &host, !self.utm().is_empty())
	}
}

/// A source of the visitor's coordinates.
#[async_trait::async_trait]
pub trait GeoLocator: Send + Sync {
	fn name(&self) -> &'static str;
	async fn locate(&self) -> Result<GeoInfo>;
}

/// Tries each locator in order and returns the first known position.
///
/// Errors, timeouts and `(0, 0)` answers move on to the next locator; when
/// all are exhausted the placeholder is returned.
pub async fn resolve_geo(locators: &[Arc<dyn GeoLocator>]) -> GeoInfo {
	for locator in locators {
		match tokio::time::timeout(GEO_LOOKUP_TIMEOUT, locator.locate()).await {
			Ok(Ok(geo)) if geo.is_known() => {
				debug!(source = locator.name(), "Resolved geolocation");
				return geo;
			}
			Ok(Ok(_)) => debug!(source = locator.name(), "Geolocation source had no position"),
			Ok(Err(e)) => warn!(source = locator.name(), error = %e, "Geolocation source failed"),
			Err(_) => warn!(source = locator.name(), "Geolocation source timed out"),
		}
	}
	GeoInfo::UNKNOWN
}

/// A fixed position, e.g. one the host already obtained from the browser.
#[derive(Debug, Clone, Copy)]
pub struct FixedGeoLocator(pub GeoInfo);

#[async_trait::async_trait]
impl GeoLocator for FixedGeoLocator {
	fn name(&self) -> &'static str {
		"fixed"
	}

	async fn locate(&self) -> Result<GeoInfo> {
		Ok(self.0)
	}
}

#[derive(Debug, Deserialize)]
struct IpLookupResponse {
	latitude: Option<f64>,
	longitude: Option<f64>,
}

/// IP-based lookup against a JSON service answering `{latitude, longitude}`.
pub struct IpGeoLocator {
	client: reqwest::Client,
	url: String,
}

impl IpGeoLocator {
	pub fn new(url: impl Into<String>) -> Result<Self> {
		let client = analytiq_common_http::new_client()?;
		Ok(Self::with_client(client, url))
	}

	pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
		Self {
			client,
			url: url.into(),
		}
	}
}

#[async_trait::async_trait]
impl GeoLocator for IpGeoLocator {
	fn name(&self) -> &'static str {
		"ip"
	}

	async fn locate(&self) -> Result<GeoInfo> {
		let response = self.client.get(&self.url).send().await?;
		if !response.status().is_success() {
			return Err(AnalyticsError::Geo(format!(
				"lookup returned {}",
				response.status()
			)));
		}
		let body: IpLookupResponse = response.json().await?;
		match (body.latitude, body.longitude) {
			(Some(lat), Some(long)) => Ok(GeoInfo { lat, long }),
			_ => Err(AnalyticsError::Geo("response had no coordinates".to_string())),
		}
	}
}

#[derive(Debug, Default, Clone)]
struct ContextSnapshot {
	page: PageInfo,
	device: DeviceInfo,
	network: NetworkInfo,
	performance: PerformanceMetrics,
}

/// A settable context provider for native hosts and tests.
#[derive(Debug, Default)]
pub struct StaticContext {
	inner: RwLock<ContextSnapshot>,
}

impl StaticContext {
	pub fn new(page: PageInfo) -> Self {
		Self {
			inner: RwLock::new(ContextSnapshot {
				page,
				..Default::default()
			}),
		}
	}

	pub fn with_device(self, device: DeviceInfo) -> Self {
		self.update(|c| c.device = device);
		self
	}

	pub fn with_network(self, network: NetworkInfo) -> Self {
		self.update(|c| c.network = network);
		self
	}

	pub fn set_page(&self, page: PageInfo) {
		self.update(|c| c.page = page);
	}

	pub fn set_performance(&self, performance: PerformanceMetrics) {
		self.update(|c| c.performance = performance);
	}

	pub fn set_network(&self, network: NetworkInfo) {
		self.update(|c| c.network = network);
	}

	fn read(&self) -> RwLockReadGuard<'_, ContextSnapshot> {
		self.inner.read().unwrap_or_else(PoisonError::into_inner)
	}

	fn update(&self, f: impl FnOnce(&mut ContextSnapshot)) {
		let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
		f(&mut guard);
	}
}

impl ContextProvider for StaticContext {
	fn page(&self) -> PageInfo {
		self.read().page.clone()
	}

	fn device(&self) -> DeviceInfo {
		self.read().device.clone()
	}

	fn network(&self) -> NetworkInfo {
		self.read().network.clone()
	}

	fn performance(&self) -> PerformanceMetrics {
		self.read().performance.clone()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use analytiq_core::TrafficSource;

	struct FailingLocator;

	#[async_trait::async_trait]
	impl GeoLocator for FailingLocator {
		fn name(&self) -> &'static str {
			"failing"
		}

		async fn locate(&self) -> Result<GeoInfo> {
			Err(AnalyticsError::Geo("permission denied".to_string()))
		}
	}

	struct HangingLocator;

	#[async_trait::async_trait]
	impl GeoLocator for HangingLocator {
		fn name(&self) -> &'static str {
			"hanging"
		}

		async fn locate(&self) -> Result<GeoInfo> {
			std::future::pending().await
		}
	}

	#[tokio::test]
	async fn test_first_known_position_wins() {
		let berlin = GeoInfo {
			lat: 52.52,
			long: 13.40,
		};
		let chain: Vec<Arc<dyn GeoLocator>> = vec![
			Arc::new(FailingLocator),
			Arc::new(FixedGeoLocator(GeoInfo::UNKNOWN)),
			Arc::new(FixedGeoLocator(berlin)),
		];
		assert_eq!(resolve_geo(&chain).await, berlin);
	}

	#[tokio::test]
	async fn test_exhausted_chain_is_placeholder() {
		let chain: Vec<Arc<dyn GeoLocator>> = vec![Arc::new(FailingLocator)];
		assert_eq!(resolve_geo(&chain).await, GeoInfo::UNKNOWN);
		assert_eq!(resolve_geo(&[]).await, GeoInfo::UNKNOWN);
	}

	#[tokio::test(start_paused = true)]
	async fn test_hanging_locator_times_out() {
		let paris = GeoInfo {
			lat: 48.85,
			long: 2.35,
		};
		let chain: Vec<Arc<dyn GeoLocator>> =
			vec![Arc::new(HangingLocator), Arc::new(FixedGeoLocator(paris))];
		assert_eq!(resolve_geo(&chain).await, paris);
	}

	#[test]
	fn test_static_context_derives_referrer_and_utm() {
		let context = StaticContext::new(
			PageInfo::new("https://shop.example/?utm_source=mail", "Shop")
				.with_referrer("https://news.site/article"),
		);
		assert_eq!(context.utm()["utm_source"], "mail");
		assert_eq!(context.referrer().traffic_source, TrafficSource::Paid);
	}

	#[test]
	fn test_static_context_updates() {
		let context = StaticContext::new(PageInfo::new("https://a.example/", "A"));
		context.set_page(PageInfo::new("https://a.example/next", "Next"));
		assert_eq!(context.page().path(), "/next");
	}
}
