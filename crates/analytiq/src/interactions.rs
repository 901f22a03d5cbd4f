// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Click, form and video tracking.
//!
//! The host describes the DOM element involved; the tracker turns it into a
//! raw event and, where the element looks like a conversion or engagement
//! step, a category event.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::trace;

use crate::emitter::Emitter;
use crate::properties::Properties;

const CLICK_TEXT_LIMIT: usize = 100;

/// The element a click landed on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickTarget {
	/// Tag name, any case.
	pub tag: String,
	pub href: Option<String>,
	pub id: Option<String>,
	pub class: Option<String>,
	pub text: Option<String>,
	/// The anchor's `target` attribute.
	pub target: Option<String>,
}

impl ClickTarget {
	pub fn new(tag: impl Into<String>) -> Self {
		Self {
			tag: tag.into(),
			..Default::default()
		}
	}

	pub fn with_href(mut self, href: impl Into<String>) -> Self {
		self.href = Some(href.into());
		self
	}

	pub fn with_id(mut self, id: impl Into<String>) -> Self {
		self.id = Some(id.into());
		self
	}

	pub fn with_class(mut self, class: impl Into<String>) -> Self {
		self.class = Some(class.into());
		self
	}

	pub fn with_text(mut self, text: impl Into<String>) -> Self {
		self.text = Some(text.into());
		self
	}

	pub fn with_target(mut self, target: impl Into<String>) -> Self {
		self.target = Some(target.into());
		self
	}

	/// The conversion a button with this text represents, if any.
	pub fn conversion_type(&self) -> Option<&'static str> {
		let text = self.text.as_deref()?.to_lowercase();
		if text.contains("add to cart") {
			Some("add_to_cart")
		} else if text.contains("checkout") {
			Some("checkout_started")
		} else if text.contains("buy") || text.contains("purchase") {
			Some("purchase_intent")
		} else if text.contains("subscribe") {
			Some("button_click")
		} else {
			None
		}
	}
}

/// A submitted form and the names of its fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormSubmission {
	pub id: String,
	pub class: String,
	pub action: String,
	pub field_names: Vec<String>,
}

/// What a form submission is taken to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
	NewsletterSignup,
	CheckoutStarted,
	FormSubmit,
}

impl FormKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			FormKind::NewsletterSignup => "newsletter_signup",
			FormKind::CheckoutStarted => "checkout_started",
			FormKind::FormSubmit => "form_submit",
		}
	}
}

impl FormSubmission {
	pub fn has_email(&self) -> bool {
		self.field_names
			.iter()
			.any(|n| n.to_lowercase().contains("email"))
	}

	pub fn has_payment(&self) -> bool {
		self.field_names.iter().any(|n| {
			let n = n.to_lowercase();
			n.contains("card") || n.contains("payment") || n.contains("billing")
		})
	}

	pub fn kind(&self) -> FormKind {
		match (self.has_email(), self.has_payment()) {
			(_, true) => FormKind::CheckoutStarted,
			(true, false) => FormKind::NewsletterSignup,
			(false, false) => FormKind::FormSubmit,
		}
	}
}

/// A focused form control.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldFocus {
	pub tag: String,
	pub name: Option<String>,
	pub id: Option<String>,
}

impl FieldFocus {
	fn is_text_entry(&self) -> bool {
		self.tag.eq_ignore_ascii_case("input") || self.tag.eq_ignore_ascii_case("textarea")
	}

	fn field(&self) -> String {
		self.name
			.as_deref()
			.filter(|n| !n.is_empty())
			.or(self.id.as_deref())
			.unwrap_or_default()
			.to_string()
	}
}

/// A `<video>` element at the moment of a media event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoElement {
	/// `currentSrc`; empty when unknown.
	pub src: String,
	pub current_time: f64,
	pub duration: f64,
}

impl VideoElement {
	fn watch_key(&self) -> &str {
		if self.src.is_empty() {
			"unknown"
		} else {
			&self.src
		}
	}
}

pub(crate) struct InteractionTracker {
	emitter: Arc<Emitter>,
	watch_time: Mutex<HashMap<String, f64>>,
}

impl InteractionTracker {
	pub(crate) fn new(emitter: Arc<Emitter>) -> Self {
		Self {
			emitter,
			watch_time: Mutex::new(HashMap::new()),
		}
	}

	/// Counts the click, reports a conversion for buying buttons, then
	/// queues the raw `click`.
	pub(crate) fn on_click(&self, target: &ClickTarget) {
		let clicks = self.emitter.engagement().record_click();

		if let Some(conversion) = target.conversion_type() {
			trace!(conversion, "Click looks like a conversion");
			let fields = Properties::new()
				.insert("button_text", target.text.clone().unwrap_or_default())
				.insert("button_id", target.id.clone().unwrap_or_default())
				.insert("button_class", target.class.clone().unwrap_or_default());
			self.emitter.send_conversion(conversion, fields);
		}

		let page = self.emitter.context().page().path();
		let text = target
			.text
			.as_deref()
			.filter(|t| !t.is_empty())
			.map(|t| t.chars().take(CLICK_TEXT_LIMIT).collect::<String>());
		let info = Properties::new()
			.insert("tag", target.tag.to_lowercase())
			.insert("clicks_count", clicks)
			.insert("page", page)
			.insert_opt("href", non_empty(&target.href))
			.insert_opt("id", non_empty(&target.id))
			.insert_opt("class", non_empty(&target.class))
			.insert_opt("text", text);
		self.emitter.track("click", info);
	}

	pub(crate) fn on_form_submit(&self, form: &FormSubmission) {
		let kind = form.kind();
		let fields = Properties::new()
			.insert("form_id", form.id.as_str())
			.insert("form_class", form.class.as_str())
			.insert("form_action", form.action.as_str())
			.insert("has_email", form.has_email())
			.insert("has_payment", form.has_payment());
		self.emitter.send_conversion(kind.as_str(), fields);

		let info = Properties::new()
			.insert("form_id", form.id.as_str())
			.insert("form_class", form.class.as_str())
			.insert("form_action", form.action.as_str())
			.insert("form_type", kind.as_str());
		self.emitter.track("form_submit", info);
	}

	/// Reports that the visitor started filling a form. Ignored for
	/// elements other than `input` and `textarea`.
	pub(crate) fn on_field_focus(&self, focus: &FieldFocus) -> bool {
		if !focus.is_text_entry() {
			return false;
		}
		self.emitter.send_engagement_event(
			Properties::new()
				.insert("form_started", true)
				.insert("form_field", focus.field()),
		);
		true
	}

	pub(crate) fn on_video_play(&self, video: &VideoElement) {
		self.emitter.track(
			"video_play",
			Properties::new().insert("video_src", video.src.as_str()),
		);
		self.emitter.send_engagement_event(
			Properties::new()
				.insert("video_played", true)
				.insert("video_src", video.src.as_str()),
		);
	}

	pub(crate) fn on_video_time_update(&self, video: &VideoElement) {
		self.watch_time
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.insert(video.watch_key().to_string(), video.current_time);
	}

	#[cfg(test)]
	pub(crate) fn watch_time(&self, video: &VideoElement) -> Option<f64> {
		self.watch_time
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.get(video.watch_key())
			.copied()
	}

	pub(crate) fn on_video_ended(&self, video: &VideoElement) {
		let watch_time = self
			.watch_time
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.get(video.watch_key())
			.copied()
			.unwrap_or(0.0);

		self.emitter.track(
			"video_ended",
			Properties::new()
				.insert("video_src", video.src.as_str())
				.insert("duration", video.duration)
				.insert("watch_time", watch_time),
		);
		self.emitter.send_engagement_event(
			Properties::new().insert("video_watch_time_sec", watch_time),
		);
	}
}

fn non_empty(value: &Option<String>) -> Option<String> {
	value.clone().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{harness, Harness};
	use analytiq_core::EventCategory;
	use serde_json::json;

	fn form(fields: &[&str]) -> FormSubmission {
		FormSubmission {
			id: "f1".to_string(),
			class: "form".to_string(),
			action: "/submit".to_string(),
			field_names: fields.iter().map(|f| f.to_string()).collect(),
		}
	}

	#[test]
	fn test_button_text_conversions() {
		let kind = |text: &str| ClickTarget::new("button").with_text(text).conversion_type();
		assert_eq!(kind("Add to Cart"), Some("add_to_cart"));
		assert_eq!(kind("Proceed to checkout"), Some("checkout_started"));
		assert_eq!(kind("Buy now"), Some("purchase_intent"));
		assert_eq!(kind("Purchase"), Some("purchase_intent"));
		assert_eq!(kind("Subscribe"), Some("button_click"));
		assert_eq!(kind("Read more"), None);
		assert_eq!(ClickTarget::new("div").conversion_type(), None);
	}

	#[test]
	fn test_form_classification() {
		assert_eq!(form(&["Email"]).kind(), FormKind::NewsletterSignup);
		assert_eq!(form(&["email", "card_number"]).kind(), FormKind::CheckoutStarted);
		assert_eq!(form(&["billing_zip"]).kind(), FormKind::CheckoutStarted);
		assert_eq!(form(&["message"]).kind(), FormKind::FormSubmit);
		assert_eq!(form(&[]).kind(), FormKind::FormSubmit);
	}

	#[tokio::test]
	async fn test_click_emits_conversion_and_raw_click() {
		let Harness {
			emitter, transport, ..
		} = harness();
		let tracker = InteractionTracker::new(emitter.clone());
		let long_text = format!("Add to cart {}", "x".repeat(200));
		tracker.on_click(&ClickTarget::new("BUTTON").with_id("buy-1").with_text(long_text));
		emitter.engine().drain().await;

		let conversion = &transport.singles()[0];
		assert_eq!(conversion["type"], "conversion");
		assert_eq!(conversion["event_type"], "add_to_cart");
		assert_eq!(conversion["button_id"], "buy-1");
		assert_eq!(conversion["button_class"], "");

		let queued = emitter.engine().snapshot();
		let click = &queued.queue(EventCategory::Raw)[0];
		assert_eq!(click.event_type(), Some("click"));
		let analytiq_core::Envelope::Raw(raw) = click else {
			panic!("expected raw click");
		};
		assert_eq!(raw.payload["tag"], "button");
		assert_eq!(raw.payload["clicks_count"], 1);
		assert_eq!(raw.payload["page"], "/products");
		assert_eq!(raw.payload["text"].as_str().unwrap().chars().count(), 100);
		assert!(raw.payload.get("class").is_none());
	}

	#[tokio::test]
	async fn test_plain_click_only_counts() {
		let Harness {
			emitter, transport, ..
		} = harness();
		let tracker = InteractionTracker::new(emitter.clone());
		tracker.on_click(&ClickTarget::new("div"));
		tracker.on_click(&ClickTarget::new("div"));
		emitter.engine().drain().await;

		assert!(transport.singles().is_empty());
		assert_eq!(emitter.engagement().clicks(), 2);
		assert_eq!(emitter.engine().queued(EventCategory::Raw), 2);
	}

	#[tokio::test]
	async fn test_form_submit_events() {
		let Harness {
			emitter, transport, ..
		} = harness();
		let tracker = InteractionTracker::new(emitter.clone());
		tracker.on_form_submit(&form(&["email"]));
		emitter.engine().drain().await;

		let conversion = &transport.singles()[0];
		assert_eq!(conversion["event_type"], "newsletter_signup");
		assert_eq!(conversion["has_email"], true);
		assert_eq!(conversion["has_payment"], false);

		let queued = emitter.engine().snapshot();
		assert_eq!(queued.raw_events[0].event_type(), Some("form_submit"));
		assert_eq!(
			queued.raw_events[0].field("form_type"),
			Some(&json!("newsletter_signup"))
		);
	}

	#[tokio::test]
	async fn test_field_focus_only_for_text_entry() {
		let Harness {
			emitter, transport, ..
		} = harness();
		let tracker = InteractionTracker::new(emitter.clone());
		assert!(!tracker.on_field_focus(&FieldFocus {
			tag: "SELECT".to_string(),
			name: Some("country".to_string()),
			id: None,
		}));
		assert!(tracker.on_field_focus(&FieldFocus {
			tag: "INPUT".to_string(),
			name: None,
			id: Some("email-input".to_string()),
		}));
		emitter.engine().drain().await;

		let singles = transport.singles();
		assert_eq!(singles.len(), 1);
		assert_eq!(singles[0]["form_started"], true);
		assert_eq!(singles[0]["form_field"], "email-input");
		assert_eq!(singles[0]["url"], "https://shop.example/products?q=boots");
	}

	#[tokio::test]
	async fn test_video_watch_time() {
		let Harness {
			emitter, transport, ..
		} = harness();
		let tracker = InteractionTracker::new(emitter.clone());
		let mut video = VideoElement {
			src: "https://cdn.example/intro.mp4".to_string(),
			current_time: 0.0,
			duration: 60.0,
		};
		tracker.on_video_play(&video);
		video.current_time = 42.5;
		tracker.on_video_time_update(&video);
		tracker.on_video_ended(&video);
		emitter.engine().drain().await;

		let singles = transport.singles();
		assert_eq!(singles[0]["video_played"], true);
		assert_eq!(singles[1]["video_watch_time_sec"], json!(42.5));

		let raw = emitter.engine().snapshot().raw_events;
		assert_eq!(raw[0].event_type(), Some("video_play"));
		assert_eq!(raw[1].event_type(), Some("video_ended"));
	}

	#[tokio::test]
	async fn test_time_update_records_latest_position() {
		let Harness { emitter, .. } = harness();
		let tracker = InteractionTracker::new(emitter);
		let mut video = VideoElement::default();
		assert_eq!(tracker.watch_time(&video), None);
		video.current_time = 12.0;
		tracker.on_video_time_update(&video);
		assert_eq!(tracker.watch_time(&video), Some(12.0));
	}

	#[tokio::test]
	async fn test_video_without_updates_reports_zero() {
		let Harness {
			emitter, transport, ..
		} = harness();
		let tracker = InteractionTracker::new(emitter.clone());
		tracker.on_video_ended(&VideoElement::default());
		emitter.engine().drain().await;
		assert_eq!(transport.singles()[0]["video_watch_time_sec"], json!(0.0));
	}
}
