// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Engagement counters and retroactive idle detection.
//!
//! Idle time is only booked when activity resumes: a scroll, pointer move or
//! key press that follows a gap longer than the idle threshold adds the whole
//! gap. A gap that never ends is never counted. Clicks are tallied here too
//! but do not count as activity.
//!
//! One tracker is shared by the exit controller, the monitors and the
//! facade; it is never reset during a page lifetime.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug)]
struct ActivityState {
	max_scroll_percent: u32,
	mouse_movements: u64,
	keyboard_events: u64,
	idle_time: Duration,
	last_activity: Instant,
}

/// Point-in-time copy of the engagement counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngagementSnapshot {
	pub max_scroll_percent: u32,
	pub mouse_movements: u64,
	pub keyboard_events: u64,
	pub clicks: u64,
	pub idle_time: Duration,
	pub time_on_page: Duration,
}

/// Shared engagement state for one page.
#[derive(Debug)]
pub struct EngagementTracker {
	idle_threshold: Duration,
	page_opened_at: Instant,
	clicks: AtomicU64,
	state: Mutex<ActivityState>,
}

impl EngagementTracker {
	/// Starts tracking now; the page-open instant doubles as the first activity.
	pub fn new(idle_threshold: Duration) -> Self {
		let now = Instant::now();
		Self {
			idle_threshold,
			page_opened_at: now,
			clicks: AtomicU64::new(0),
			state: Mutex::new(ActivityState {
				max_scroll_percent: 0,
				mouse_movements: 0,
				keyboard_events: 0,
				idle_time: Duration::ZERO,
				last_activity: now,
			}),
		}
	}

	fn state(&self) -> MutexGuard<'_, ActivityState> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	fn touch(&self, state: &mut ActivityState) {
		let now = Instant::now();
		let gap = now.saturating_duration_since(state.last_activity);
		if gap > self.idle_threshold {
			state.idle_time += gap;
		}
		state.last_activity = now;
	}

	/// Records a scroll; depth is `round((scroll_y + viewport) / document * 100)`.
	///
	/// A non-positive document height counts as activity without changing depth.
	pub fn record_scroll(&self, scroll_y: f64, viewport_height: f64, document_height: f64) {
		let mut state = self.state();
		self.touch(&mut state);
		if document_height > 0.0 {
			let depth = ((scroll_y + viewport_height) / document_height * 100.0).round();
			if depth.is_finite() && depth > 0.0 {
				let depth = depth.min(u32::MAX as f64) as u32;
				state.max_scroll_percent = state.max_scroll_percent.max(depth);
			}
		}
	}

	pub fn record_mouse_move(&self) {
		let mut state = self.state();
		self.touch(&mut state);
		state.mouse_movements += 1;
	}

	pub fn record_key_down(&self) {
		let mut state = self.state();
		self.touch(&mut state);
		state.keyboard_events += 1;
	}

	/// Counts a click and returns the new total.
	pub fn record_click(&self) -> u64 {
		self.clicks.fetch_add(1, Ordering::SeqCst) + 1
	}

	pub fn clicks(&self) -> u64 {
		self.clicks.load(Ordering::SeqCst)
	}

	pub fn last_activity(&self) -> Instant {
		self.state().last_activity
	}

	/// Time since the last scroll, pointer move or key press.
	pub fn idle_for(&self) -> Duration {
		Instant::now().saturating_duration_since(self.last_activity())
	}

	pub fn time_on_page(&self) -> Duration {
		Instant::now().saturating_duration_since(self.page_opened_at)
	}

	pub fn snapshot(&self) -> EngagementSnapshot {
		let state = self.state();
		EngagementSnapshot {
			max_scroll_percent: state.max_scroll_percent,
			mouse_movements: state.mouse_movements,
			keyboard_events: state.keyboard_events,
			clicks: self.clicks(),
			idle_time: state.idle_time,
			time_on_page: self.time_on_page(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const THRESHOLD: Duration = Duration::from_secs(30);

	#[tokio::test(start_paused = true)]
	async fn test_short_gap_adds_no_idle_time() {
		let tracker = EngagementTracker::new(THRESHOLD);
		tracker.record_mouse_move();
		tokio::time::advance(Duration::from_secs(10)).await;
		tracker.record_mouse_move();
		assert_eq!(tracker.snapshot().idle_time, Duration::ZERO);
	}

	#[tokio::test(start_paused = true)]
	async fn test_gap_at_threshold_is_not_idle() {
		let tracker = EngagementTracker::new(THRESHOLD);
		tokio::time::advance(THRESHOLD).await;
		tracker.record_key_down();
		assert_eq!(tracker.snapshot().idle_time, Duration::ZERO);
	}

	#[tokio::test(start_paused = true)]
	async fn test_long_gap_is_booked_whole() {
		let tracker = EngagementTracker::new(THRESHOLD);
		tokio::time::advance(Duration::from_secs(45)).await;
		tracker.record_key_down();
		assert_eq!(tracker.snapshot().idle_time, Duration::from_secs(45));

		tokio::time::advance(Duration::from_secs(40)).await;
		tracker.record_scroll(0.0, 800.0, 1600.0);
		assert_eq!(tracker.snapshot().idle_time, Duration::from_secs(85));
	}

	#[tokio::test(start_paused = true)]
	async fn test_open_gap_is_not_counted() {
		let tracker = EngagementTracker::new(THRESHOLD);
		tracker.record_mouse_move();
		tokio::time::advance(Duration::from_secs(300)).await;
		assert_eq!(tracker.snapshot().idle_time, Duration::ZERO);
		assert_eq!(tracker.idle_for(), Duration::from_secs(300));
	}

	#[tokio::test(start_paused = true)]
	async fn test_clicks_do_not_reset_idle() {
		let tracker = EngagementTracker::new(THRESHOLD);
		tokio::time::advance(Duration::from_secs(20)).await;
		assert_eq!(tracker.record_click(), 1);
		assert_eq!(tracker.idle_for(), Duration::from_secs(20));
		assert_eq!(tracker.clicks(), 1);
	}

	#[tokio::test]
	async fn test_scroll_depth_is_running_max() {
		let tracker = EngagementTracker::new(THRESHOLD);
		tracker.record_scroll(400.0, 800.0, 2000.0);
		assert_eq!(tracker.snapshot().max_scroll_percent, 60);
		tracker.record_scroll(0.0, 800.0, 2000.0);
		assert_eq!(tracker.snapshot().max_scroll_percent, 60);
		tracker.record_scroll(1200.0, 800.0, 2000.0);
		assert_eq!(tracker.snapshot().max_scroll_percent, 100);
	}

	#[tokio::test]
	async fn test_zero_document_height_keeps_depth() {
		let tracker = EngagementTracker::new(THRESHOLD);
		tracker.record_scroll(100.0, 800.0, 0.0);
		assert_eq!(tracker.snapshot().max_scroll_percent, 0);
	}

	#[tokio::test]
	async fn test_counters_increment() {
		let tracker = EngagementTracker::new(THRESHOLD);
		tracker.record_mouse_move();
		tracker.record_mouse_move();
		tracker.record_key_down();
		let snapshot = tracker.snapshot();
		assert_eq!(snapshot.mouse_movements, 2);
		assert_eq!(snapshot.keyboard_events, 1);
	}

	#[tokio::test(start_paused = true)]
	async fn test_time_on_page() {
		let tracker = EngagementTracker::new(THRESHOLD);
		tokio::time::advance(Duration::from_millis(12_500)).await;
		assert_eq!(tracker.time_on_page(), Duration::from_millis(12_500));
	}
}
