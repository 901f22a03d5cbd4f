// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wall-clock source for event timestamps.
//!
//! Durations (idle time, time on page, timers) use tokio's monotonic clock;
//! only the `ts` field of an envelope comes from here.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};

/// Source of wall-clock time.
pub trait Clock: Send + Sync {
	fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now(&self) -> DateTime<Utc> {
		Utc::now()
	}
}

/// Hands out strictly increasing timestamps.
///
/// If the clock stalls or steps backwards, the previous stamp plus one
/// millisecond is used instead.
pub(crate) struct Stamper {
	clock: Arc<dyn Clock>,
	last: Mutex<Option<DateTime<Utc>>>,
}

impl Stamper {
	pub(crate) fn new(clock: Arc<dyn Clock>) -> Self {
		Self {
			clock,
			last: Mutex::new(None),
		}
	}

	pub(crate) fn stamp(&self) -> DateTime<Utc> {
		let now = self.clock.now();
		let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
		let ts = match *last {
			Some(previous) if now <= previous => previous + Duration::milliseconds(1),
			_ => now,
		};
		*last = Some(ts);
		ts
	}
}
