// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Assembles envelopes and hands them to the batch engine or the router.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use analytiq_core::{
	CategoryEvent, EventCategory, GeoInfo, RawEvent, VisitorIdentity, ENVELOPE_KEYS,
};
use serde_json::Value;
use tracing::warn;

use crate::batch::BatchEngine;
use crate::clock::Stamper;
use crate::collectors::ContextProvider;
use crate::engagement::EngagementTracker;
use crate::identity::IdentityStore;
use crate::properties::Properties;
use crate::router::{Delivery, EndpointRouter};

/// Everything an event needs besides its own fields.
pub(crate) struct Emitter {
	site_id: String,
	identity: IdentityStore,
	stamper: Stamper,
	context: Arc<dyn ContextProvider>,
	geo: RwLock<GeoInfo>,
	new_visitor: AtomicBool,
	engine: BatchEngine,
	router: EndpointRouter,
	engagement: Arc<EngagementTracker>,
}

pub(crate) struct EmitterParts {
	pub site_id: String,
	pub identity: IdentityStore,
	pub stamper: Stamper,
	pub context: Arc<dyn ContextProvider>,
	pub engine: BatchEngine,
	pub router: EndpointRouter,
	pub engagement: Arc<EngagementTracker>,
}

fn seconds(duration: std::time::Duration) -> f64 {
	duration.as_secs_f64()
}

impl Emitter {
	pub(crate) fn new(parts: EmitterParts) -> Self {
		Self {
			site_id: parts.site_id,
			identity: parts.identity,
			stamper: parts.stamper,
			context: parts.context,
			geo: RwLock::new(GeoInfo::UNKNOWN),
			new_visitor: AtomicBool::new(false),
			engine: parts.engine,
			router: parts.router,
			engagement: parts.engagement,
		}
	}

	pub(crate) fn engine(&self) -> &BatchEngine {
		&self.engine
	}

	pub(crate) fn identity(&self) -> &IdentityStore {
		&self.identity
	}

	pub(crate) fn engagement(&self) -> &EngagementTracker {
		&self.engagement
	}

	pub(crate) fn context(&self) -> &dyn ContextProvider {
		self.context.as_ref()
	}

	pub(crate) fn set_geo(&self, geo: GeoInfo) {
		*self.geo.write().unwrap_or_else(PoisonError::into_inner) = geo;
	}

	fn geo(&self) -> GeoInfo {
		*self.geo.read().unwrap_or_else(PoisonError::into_inner)
	}

	/// Resolves the visitor id, remembering whether this page load created it.
	pub(crate) fn visitor(&self) -> VisitorIdentity {
		let visitor = self.identity.get_or_set_visitor_id();
		if visitor.is_new {
			self.new_visitor.store(true, Ordering::SeqCst);
		}
		visitor
	}

	/// True when this page load created the visitor id.
	pub(crate) fn is_new_visitor(&self) -> bool {
		self.visitor();
		self.new_visitor.load(Ordering::SeqCst)
	}

	/// A raw event: the full page context with `payload` merged last.
	pub(crate) fn raw_event(&self, event_type: &str, payload: Properties) -> RawEvent {
		let visitor_id = self.visitor().id;
		let is_new = self.new_visitor.load(Ordering::SeqCst);
		let session_id = self.identity.session_id();
		let page = self.context.page();

		let mut base = Properties::new()
			.insert("url", page.url.clone())
			.insert("page", page.path())
			.insert("title", page.title.clone())
			.extend_from(&self.context.referrer())
			.extend_from(&self.context.device())
			.extend_from(&self.context.performance())
			.extend_from(&self.context.network())
			.extend_from(&self.context.utm())
			.insert("visitor_id", visitor_id.as_str())
			.insert("session_id", session_id.as_str())
			.insert("is_new_visitor", is_new)
			.insert("is_returning_visitor", !is_new)
			.merge(payload);

		let geo = self.geo();
		if geo.is_known() {
			if let Ok(value) = serde_json::to_value(geo) {
				base = base.insert("geo", value);
			}
		}

		RawEvent {
			site_id: self.site_id.clone(),
			ts: self.stamper.stamp(),
			event_type: event_type.to_string(),
			payload: base.into_map(),
			visitor_id,
			session_id,
		}
	}

	/// A flat category event.
	///
	/// Fields named like an envelope key are dropped so the pipeline's ids
	/// and timestamp are the only ones on the wire.
	pub(crate) fn category_event(&self, event_type: Option<&str>, fields: Properties) -> CategoryEvent {
		let mut fields = fields.into_map();
		for key in ENVELOPE_KEYS {
			if fields.remove(*key).is_some() {
				warn!(key = *key, "Dropping event field that shadows an envelope key");
			}
		}
		CategoryEvent {
			site_id: self.site_id.clone(),
			ts: self.stamper.stamp(),
			visitor_id: self.visitor().id,
			session_id: self.identity.session_id(),
			event_type: event_type.map(str::to_string),
			fields,
		}
	}

	/// Queues a raw event for the next batch.
	pub(crate) fn track(&self, event_type: &str, payload: Properties) {
		let event = self.raw_event(event_type, payload);
		self.engine.add_to_batch(EventCategory::Raw, event.into());
	}

	/// Sends a category event along its configured route.
	pub(crate) fn route(
		&self,
		category: EventCategory,
		event_type: Option<&str>,
		fields: Properties,
	) -> Delivery {
		let event = self.category_event(event_type, fields);
		self.router.route(category, event.into())
	}

	pub(crate) fn send_conversion(&self, event_type: &str, fields: Properties) {
		self.route(EventCategory::Conversion, Some(event_type), fields);
	}

	/// Engagement event tagged with the current URL.
	pub(crate) fn send_engagement_event(&self, fields: Properties) {
		let fields = Properties::new()
			.insert("url", self.context.page().url)
			.merge(fields);
		self.route(EventCategory::Engagement, None, fields);
	}

	/// Current engagement counters as flat fields, `extra` merged last.
	pub(crate) fn engagement_fields(&self, extra: Properties) -> Properties {
		let snapshot = self.engagement.snapshot();
		Properties::new()
			.insert("url", self.context.page().url)
			.insert("time_on_page_sec", seconds(snapshot.time_on_page))
			.insert("scroll_depth_percent", snapshot.max_scroll_percent)
			.insert("clicks_count", snapshot.clicks)
			.insert("mouse_movements", snapshot.mouse_movements)
			.insert("keyboard_events", snapshot.keyboard_events)
			.insert("idle_time_sec", seconds(snapshot.idle_time))
			.merge(extra)
	}

	pub(crate) fn send_engagement_update(&self, extra: Properties) {
		let fields = self.engagement_fields(extra);
		self.route(EventCategory::Engagement, None, fields);
	}

	pub(crate) fn send_performance_event(&self) {
		let fields = Properties::new()
			.insert("url", self.context.page().url)
			.extend_from(&self.context.performance())
			.extend_from(&self.context.network());
		self.route(EventCategory::Performance, None, fields);
	}

	pub(crate) fn send_search_event(&self, search_term: &str, results_count: Option<u64>) {
		let fields = Properties::new()
			.insert("search_term", search_term)
			.insert("results_count", results_count.unwrap_or(0));
		self.route(EventCategory::Search, None, fields);
	}

	pub(crate) fn send_custom_event(&self, event_name: &str, data: Properties) {
		let event_category = match data.get("category") {
			Some(category) if is_truthy(category) => category.clone(),
			_ => Value::from("general"),
		};
		let event_value = match data.get("value") {
			Some(value) if is_truthy(value) => value.clone(),
			_ => Value::from(0),
		};
		let fields = Properties::new()
			.insert("event_name", event_name)
			.insert("event_category", event_category)
			.insert("event_value", event_value)
			.insert("custom_properties", data);
		self.route(EventCategory::Custom, None, fields);
	}
}

fn is_truthy(value: &Value) -> bool {
	match value {
		Value::Null => false,
		Value::Bool(b) => *b,
		Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
		Value::String(s) => !s.is_empty(),
		Value::Array(_) | Value::Object(_) => true,
	}
}
