// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Periodic engagement and performance reports.
//!
//! Two loops tick at fixed periods, the first tick one full period after
//! start. A tick only reports while the visitor was active recently enough;
//! otherwise it does nothing and the loop keeps running. A third, one-off
//! task reports performance shortly after the page `load` signal.

use std::sync::Arc;
use std::time::Duration;

use analytiq_config::MonitoringConfig;
use tokio::runtime::Handle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, trace};

use crate::emitter::Emitter;
use crate::properties::Properties;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Report {
	Engagement,
	Performance,
}

impl Report {
	fn name(&self) -> &'static str {
		match self {
			Report::Engagement => "engagement",
			Report::Performance => "performance",
		}
	}

	fn send(&self, emitter: &Emitter) {
		match self {
			Report::Engagement => emitter.send_engagement_update(Properties::new()),
			Report::Performance => emitter.send_performance_event(),
		}
	}
}

/// Owns the monitoring tasks. Dropping the handle does not stop them; call
/// [`MonitorHandle::shutdown`].
pub(crate) struct MonitorHandle {
	emitter: Arc<Emitter>,
	config: MonitoringConfig,
	runtime: Handle,
	cancel: CancellationToken,
	tasks: TaskTracker,
}

impl MonitorHandle {
	/// Spawns the engagement and performance loops on `runtime`.
	pub(crate) fn start(emitter: Arc<Emitter>, config: MonitoringConfig, runtime: &Handle) -> Self {
		let handle = Self {
			emitter,
			config,
			runtime: runtime.clone(),
			cancel: CancellationToken::new(),
			tasks: TaskTracker::new(),
		};

		handle.spawn_loop(
			Report::Engagement,
			config.engagement_update_interval,
			config.activity_threshold,
		);
		handle.spawn_loop(
			Report::Performance,
			config.performance_update_interval,
			config.recent_activity_threshold,
		);

		info!(
			engagement_secs = config.engagement_update_interval.as_secs(),
			performance_secs = config.performance_update_interval.as_secs(),
			"Monitoring started"
		);
		handle
	}

	fn spawn_loop(&self, report: Report, period: Duration, active_within: Duration) {
		let emitter = self.emitter.clone();
		let cancel = self.cancel.clone();

		self.tasks.spawn_on(
			async move {
				let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
				ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

				loop {
					tokio::select! {
						_ = cancel.cancelled() => break,
						_ = ticker.tick() => {
							let idle = emitter.engagement().idle_for();
							if idle < active_within {
								trace!(report = report.name(), "Sending periodic report");
								report.send(&emitter);
							} else {
								trace!(
									report = report.name(),
									idle_secs = idle.as_secs(),
									"Visitor inactive, skipping periodic report"
								);
							}
						}
					}
				}
				debug!(report = report.name(), "Monitoring loop stopped");
			},
			&self.runtime,
		);
	}

	/// Reports performance once, `load_report_delay` from now.
	pub(crate) fn schedule_load_report(&self) {
		let emitter = self.emitter.clone();
		let cancel = self.cancel.clone();
		let delay = self.config.load_report_delay;

		self.tasks.spawn_on(
			async move {
				tokio::select! {
					_ = cancel.cancelled() => {}
					_ = tokio::time::sleep(delay) => {
						debug!("Sending page load performance report");
						emitter.send_performance_event();
					}
				}
			},
			&self.runtime,
		);
	}

	pub(crate) fn is_running(&self) -> bool {
		!self.cancel.is_cancelled()
	}

	/// Cancels every monitoring task and waits for them to finish.
	pub(crate) async fn shutdown(&self) {
		if self.cancel.is_cancelled() {
			return;
		}
		self.cancel.cancel();
		self.tasks.close();
		self.tasks.wait().await;
		info!("Monitoring stopped");
	}
}
