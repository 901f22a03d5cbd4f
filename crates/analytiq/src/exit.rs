// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The single terminal exit event.
//!
//! Browsers have no one reliable "leaving" signal, so several triggers feed
//! [`ExitController::send_exit_event`] and a one-way latch lets only the first
//! through. The winner emits a raw `exit` event plus an engagement summary and
//! then flushes the batch queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};
use url::Url;

use crate::emitter::Emitter;
use crate::properties::Properties;

/// Why the visitor is considered gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitReason {
	/// `beforeunload`.
	TabCloseOrReload,
	/// Link to another origin, or one that opens a new browsing context.
	ExternalLinkClick,
	/// Link to a different URL on the same origin.
	InternalLinkClick,
	/// The page became hidden.
	TabHidden,
}

impl ExitReason {
	pub fn as_str(&self) -> &'static str {
		match self {
			ExitReason::TabCloseOrReload => "tab_close_or_reload",
			ExitReason::ExternalLinkClick => "external_link_click",
			ExitReason::InternalLinkClick => "internal_link_click",
			ExitReason::TabHidden => "tab_hidden",
		}
	}
}

impl std::fmt::Display for ExitReason {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// `document.visibilityState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityState {
	Visible,
	Hidden,
}

/// A click on an anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkClick {
	/// The `href` attribute, absolute or relative to the page.
	pub href: String,
	/// The `target` attribute, if any.
	pub target: Option<String>,
}

impl LinkClick {
	pub fn new(href: impl Into<String>) -> Self {
		Self {
			href: href.into(),
			target: None,
		}
	}

	pub fn with_target(mut self, target: impl Into<String>) -> Self {
		self.target = Some(target.into());
		self
	}

	/// Classifies the click relative to `page_url`.
	///
	/// Returns `None` for links that do not leave the page: same URL,
	/// fragment-only changes and unparseable `href`s.
	pub fn exit_reason(&self, page_url: &str) -> Option<(ExitReason, String)> {
		let page = Url::parse(page_url).ok();
		let resolved = match &page {
			Some(page) => page.join(&self.href).ok()?,
			None => Url::parse(&self.href).ok()?,
		};

		let new_context = self
			.target
			.as_deref()
			.is_some_and(|t| t.eq_ignore_ascii_case("_blank"));
		let same_origin = page
			.as_ref()
			.is_some_and(|p| p.origin() == resolved.origin());

		if new_context || !same_origin {
			return Some((ExitReason::ExternalLinkClick, resolved.to_string()));
		}

		let page = page?;
		let mut a = resolved.clone();
		let mut b = page;
		a.set_fragment(None);
		b.set_fragment(None);
		if a == b {
			None
		} else {
			Some((ExitReason::InternalLinkClick, resolved.to_string()))
		}
	}
}

/// Latches the first exit trigger.
pub(crate) struct ExitController {
	emitter: Arc<Emitter>,
	sent: AtomicBool,
}

impl ExitController {
	pub(crate) fn new(emitter: Arc<Emitter>) -> Self {
		Self {
			emitter,
			sent: AtomicBool::new(false),
		}
	}

	pub(crate) fn exit_sent(&self) -> bool {
		self.sent.load(Ordering::SeqCst)
	}

	/// Emits the exit summary if no exit was sent yet.
	///
	/// Returns `true` only for the call that won the latch.
	pub(crate) fn send_exit_event(&self, reason: ExitReason, extra: Properties) -> bool {
		if self.sent.swap(true, Ordering::SeqCst) {
			debug!(reason = %reason, "Exit already sent, ignoring");
			return false;
		}

		let snapshot = self.emitter.engagement().snapshot();
		let data = Properties::new()
			.insert("exit_reason", reason.as_str())
			.insert("time_spent_sec", snapshot.time_on_page.as_secs_f64())
			.insert("scroll_depth_percent", snapshot.max_scroll_percent)
			.insert("exit_url", self.emitter.context().page().url)
			.insert("clicks_count", snapshot.clicks)
			.insert("mouse_movements", snapshot.mouse_movements)
			.insert("keyboard_events", snapshot.keyboard_events)
			.insert("idle_time_sec", snapshot.idle_time.as_secs_f64())
			.merge(extra);

		self.emitter.track("exit", data.clone());
		self.emitter.send_engagement_event(data);
		let flushed = self.emitter.engine().flush_batch();

		info!(
			reason = %reason,
			time_spent_sec = snapshot.time_on_page.as_secs(),
			flushed,
			"Exit event sent"
		);
		true
	}

	pub(crate) fn on_before_unload(&self) -> bool {
		self.send_exit_event(ExitReason::TabCloseOrReload, Properties::new())
	}

	pub(crate) fn on_link_click(&self, click: &LinkClick) -> bool {
		let page_url = self.emitter.context().page().url;
		match click.exit_reason(&page_url) {
			Some((reason, link)) => {
				self.send_exit_event(reason, Properties::new().insert("link", link))
			}
			None => false,
		}
	}

	pub(crate) fn on_visibility_change(&self, state: VisibilityState) -> bool {
		match state {
			VisibilityState::Hidden => self.send_exit_event(ExitReason::TabHidden, Properties::new()),
			VisibilityState::Visible => false,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{harness, Harness};
	use analytiq_core::EventCategory;

	const PAGE: &str = "https://shop.example/products?q=boots";

	#[test]
	fn test_link_classification() {
		let external = LinkClick::new("https://other.example/");
		assert_eq!(
			external.exit_reason(PAGE).map(|(r, _)| r),
			Some(ExitReason::ExternalLinkClick)
		);

		let new_tab = LinkClick::new("/cart").with_target("_blank");
		assert_eq!(
			new_tab.exit_reason(PAGE),
			Some((
				ExitReason::ExternalLinkClick,
				"https://shop.example/cart".to_string()
			))
		);

		let internal = LinkClick::new("/cart");
		assert_eq!(
			internal.exit_reason(PAGE),
			Some((
				ExitReason::InternalLinkClick,
				"https://shop.example/cart".to_string()
			))
		);
	}

	#[test]
	fn test_same_page_links_are_not_exits() {
		assert_eq!(LinkClick::new(PAGE).exit_reason(PAGE), None);
		assert_eq!(LinkClick::new("#reviews").exit_reason(PAGE), None);
		assert_eq!(
			LinkClick::new("http://[bad").exit_reason("not a url"),
			None
		);
	}

	#[test]
	fn test_reason_strings() {
		assert_eq!(ExitReason::TabCloseOrReload.to_string(), "tab_close_or_reload");
		assert_eq!(ExitReason::TabHidden.as_str(), "tab_hidden");
	}

	#[tokio::test]
	async fn test_latch_allows_one_exit() {
		let Harness {
			emitter, transport, ..
		} = harness();
		let exit = ExitController::new(emitter.clone());

		assert!(exit.send_exit_event(ExitReason::TabHidden, Properties::new()));
		assert!(!exit.send_exit_event(ExitReason::TabCloseOrReload, Properties::new()));
		assert!(!exit.on_link_click(&LinkClick::new("https://other.example/")));
		assert!(!exit.on_before_unload());
		emitter.engine().drain().await;

		let engagement: Vec<_> = transport
			.singles()
			.into_iter()
			.filter(|s| s["type"] == "engagement")
			.collect();
		assert_eq!(engagement.len(), 1);
		assert_eq!(engagement[0]["exit_reason"], "tab_hidden");

		let batches = transport.batches();
		assert_eq!(batches.len(), 1);
		let exits: Vec<_> = batches[0]
			.queue(EventCategory::Raw)
			.iter()
			.filter(|e| e.event_type() == Some("exit"))
			.collect();
		assert_eq!(exits.len(), 1);
	}

	#[tokio::test]
	async fn test_unload_then_hidden_reports_unload() {
		let Harness {
			emitter, transport, ..
		} = harness();
		let exit = ExitController::new(emitter.clone());

		assert!(exit.on_before_unload());
		assert!(!exit.on_visibility_change(VisibilityState::Hidden));
		emitter.engine().drain().await;

		let engagement: Vec<_> = transport
			.singles()
			.into_iter()
			.filter(|s| s["type"] == "engagement")
			.collect();
		assert_eq!(engagement.len(), 1);
		assert_eq!(engagement[0]["exit_reason"], "tab_close_or_reload");
		assert!(exit.exit_sent());
	}

	#[tokio::test]
	async fn test_exit_flushes_pending_events() {
		let Harness {
			emitter, transport, ..
		} = harness();
		let exit = ExitController::new(emitter.clone());
		emitter.track("click", Properties::new());
		assert!(emitter.engine().has_pending_timer());

		exit.on_before_unload();
		assert_eq!(emitter.engine().queued_total(), 0);
		assert!(!emitter.engine().has_pending_timer());
		emitter.engine().drain().await;

		let batches = transport.batches();
		assert_eq!(batches.len(), 1);
		assert_eq!(batches[0].raw_events.len(), 2);
	}

	#[tokio::test]
	async fn test_visible_is_not_an_exit() {
		let Harness { emitter, .. } = harness();
		let exit = ExitController::new(emitter);
		assert!(!exit.on_visibility_change(VisibilityState::Visible));
		assert!(!exit.exit_sent());
	}

	#[tokio::test]
	async fn test_link_exit_records_link() {
		let Harness {
			emitter, transport, ..
		} = harness();
		let exit = ExitController::new(emitter.clone());
		assert!(exit.on_link_click(&LinkClick::new("/checkout")));
		emitter.engine().drain().await;

		let engagement = transport.singles();
		assert_eq!(engagement[0]["exit_reason"], "internal_link_click");
		assert_eq!(engagement[0]["link"], "https://shop.example/checkout");
	}
}
