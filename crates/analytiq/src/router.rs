// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Delivery of category events.
//!
//! Each category may have a dedicated endpoint in [`RoutesConfig`]. Without
//! one, the event is sent on its own to the unified ingest address. With one,
//! it is sent to that endpoint instead, and also queued for the unified batch
//! when `mirror_to_batch` is set. Either way a failed send falls back to the
//! batch queue.

use std::sync::Arc;

use analytiq_config::RoutesConfig;
use analytiq_core::{EventCategory, Envelope};
use tracing::trace;

use crate::batch::BatchEngine;

/// How a routed event left the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
	/// Sent to the unified ingest address.
	Unified,
	/// Sent to a dedicated endpoint.
	Dedicated { url: String, mirrored: bool },
}

/// Chooses the delivery path for category events.
#[derive(Clone)]
pub struct EndpointRouter {
	engine: BatchEngine,
	routes: Arc<RoutesConfig>,
}

impl EndpointRouter {
	pub fn new(engine: BatchEngine, routes: RoutesConfig) -> Self {
		Self {
			engine,
			routes: Arc::new(routes),
		}
	}

	pub fn routes(&self) -> &RoutesConfig {
		&self.routes
	}

	/// Sends `event` along the configured path for `category`.
	pub fn route(&self, category: EventCategory, event: Envelope) -> Delivery {
		match self.routes.endpoint_for(category) {
			None => {
				trace!(category = %category, "Routing event to unified ingest");
				self.engine.send_single_event(category, event);
				Delivery::Unified
			}
			Some(url) => {
				let mirrored = self.routes.mirror_to_batch;
				trace!(category = %category, url, mirrored, "Routing event to dedicated endpoint");
				if mirrored {
					self.engine.add_to_batch(category, event.clone());
				}
				self.engine.send_single_event_to(url, category, event);
				Delivery::Dedicated {
					url: url.to_string(),
					mirrored,
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{category_event, RecordingTransport};
	use analytiq_config::BatchConfig;
	use std::time::Duration;

	fn router(routes: RoutesConfig) -> (EndpointRouter, BatchEngine, Arc<RecordingTransport>) {
		let transport = Arc::new(RecordingTransport::new());
		let engine = BatchEngine::new(
			BatchConfig {
				batch_size: 20,
				batch_interval: Duration::from_secs(5),
			},
			"http://ingest.test/ingest",
			transport.clone(),
		)
		.unwrap();
		(EndpointRouter::new(engine.clone(), routes), engine, transport)
	}

	#[tokio::test]
	async fn test_unrouted_category_uses_unified_single_send() {
		let (router, engine, transport) = router(RoutesConfig::default());
		let delivery = router.route(EventCategory::Conversion, category_event("order_id", "o1"));
		engine.drain().await;

		assert_eq!(delivery, Delivery::Unified);
		let requests = transport.requests();
		assert_eq!(requests.len(), 1);
		assert_eq!(requests[0].url, "http://ingest.test/ingest");
		assert_eq!(transport.singles()[0]["type"], "conversion");
		assert_eq!(engine.queued_total(), 0);
	}

	#[tokio::test]
	async fn test_routed_category_replaces_unified_send() {
		let routes = RoutesConfig {
			conversion: Some("http://conversions.test/events".to_string()),
			..Default::default()
		};
		let (router, engine, transport) = router(routes);
		let delivery = router.route(EventCategory::Conversion, category_event("order_id", "o1"));
		engine.drain().await;

		assert_eq!(
			delivery,
			Delivery::Dedicated {
				url: "http://conversions.test/events".to_string(),
				mirrored: false
			}
		);
		let requests = transport.requests();
		assert_eq!(requests.len(), 1);
		assert_eq!(requests[0].url, "http://conversions.test/events");
		assert_eq!(engine.queued_total(), 0);
	}

	#[tokio::test]
	async fn test_mirrored_route_also_queues() {
		let routes = RoutesConfig {
			engagement: Some("http://engagement.test/events".to_string()),
			mirror_to_batch: true,
			..Default::default()
		};
		let (router, engine, transport) = router(routes);
		router.route(EventCategory::Engagement, category_event("video_played", "yes"));
		engine.drain().await;

		assert_eq!(engine.queued(EventCategory::Engagement), 1);
		assert_eq!(transport.requests().len(), 1);
	}

	#[tokio::test]
	async fn test_failed_dedicated_send_falls_back_to_batch() {
		let routes = RoutesConfig {
			performance: Some("http://perf.test/events".to_string()),
			..Default::default()
		};
		let (router, engine, transport) = router(routes);
		transport.set_fail(true);
		router.route(EventCategory::Performance, category_event("load_event", "1200"));
		engine.drain().await;

		assert_eq!(engine.queued(EventCategory::Performance), 1);
	}
}
