// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Event batching and flush scheduling.
//!
//! Events are queued per category. After every add the engine sums the
//! queues: reaching `batch_size` flushes at once, otherwise a single flush
//! timer is armed for `batch_interval`. Every flush cancels that timer and
//! clears the queues before the send completes; a failed batch is dropped.
//!
//! Single events are sent on their own and demoted to the batch queue when the
//! send fails.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use analytiq_config::BatchConfig;
use analytiq_core::{EventCategory, Envelope, IngestBatch, IngestBody, SingleEvent};
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, trace, warn};

use crate::error::{AnalyticsError, Result};
use crate::transport::{IngestRequest, Transport};

/// The pending time-triggered flush.
struct PendingFlush {
	generation: u64,
	handle: AbortHandle,
}

#[derive(Default)]
struct QueueState {
	batch: IngestBatch,
	timer: Option<PendingFlush>,
	/// Bumped on every flush; a timer from an older generation is stale.
	generation: u64,
}

impl QueueState {
	/// Empties the queues and cancels the timer.
	fn take(&mut self) -> IngestBatch {
		if let Some(timer) = self.timer.take() {
			timer.handle.abort();
		}
		self.generation = self.generation.wrapping_add(1);
		std::mem::take(&mut self.batch)
	}
}

struct EngineInner {
	config: BatchConfig,
	ingest_url: String,
	transport: Arc<dyn Transport>,
	runtime: Handle,
	state: Mutex<QueueState>,
	in_flight: TaskTracker,
	closed: AtomicBool,
}

/// The batch queue plus its flush timer. Cloning shares the same queue.
#[derive(Clone)]
pub struct BatchEngine {
	inner: Arc<EngineInner>,
}

impl BatchEngine {
	/// Creates an engine on the current tokio runtime.
	pub fn new(
		config: BatchConfig,
		ingest_url: impl Into<String>,
		transport: Arc<dyn Transport>,
	) -> Result<Self> {
		let runtime = Handle::try_current().map_err(|_| AnalyticsError::NoRuntime)?;
		Ok(Self::with_runtime(config, ingest_url, transport, runtime))
	}

	/// Creates an engine whose timers and sends run on `runtime`.
	pub fn with_runtime(
		config: BatchConfig,
		ingest_url: impl Into<String>,
		transport: Arc<dyn Transport>,
		runtime: Handle,
	) -> Self {
		Self {
			inner: Arc::new(EngineInner {
				config,
				ingest_url: ingest_url.into(),
				transport,
				runtime,
				state: Mutex::new(QueueState::default()),
				in_flight: TaskTracker::new(),
				closed: AtomicBool::new(false),
			}),
		}
	}

	fn state(&self) -> MutexGuard<'_, QueueState> {
		self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	pub fn ingest_url(&self) -> &str {
		&self.inner.ingest_url
	}

	pub fn config(&self) -> &BatchConfig {
		&self.inner.config
	}

	/// Queues an event and applies the flush trigger.
	pub fn add_to_batch(&self, category: EventCategory, event: Envelope) {
		if self.inner.closed.load(Ordering::SeqCst) {
			warn!(category = %category, "Batch engine shut down, dropping event");
			return;
		}
		self.enqueue(category, event);
	}

	fn enqueue(&self, category: EventCategory, event: Envelope) {
		let mut state = self.state();
		state.batch.queue_mut(category).push(event);
		if self.inner.closed.load(Ordering::SeqCst) {
			// Shutdown's final flush picks it up.
			return;
		}
		let queued = state.batch.len();
		trace!(category = %category, queued, "Queued event");

		if queued >= self.inner.config.batch_size {
			let batch = state.take();
			drop(state);
			debug!(count = batch.len(), "Batch size reached, flushing");
			self.dispatch(batch);
		} else if state.timer.is_none() {
			self.arm_timer(&mut state);
		}
	}

	/// Queues an event by its queue name (`raw_events`, `search_events`, ...).
	///
	/// Unknown names are ignored and return `false`.
	pub fn add_to_named_batch(&self, queue_name: &str, event: Envelope) -> bool {
		match EventCategory::from_queue_name(queue_name) {
			Some(category) => {
				self.add_to_batch(category, event);
				true
			}
			None => {
				debug!(queue = queue_name, "Ignoring event for unknown queue");
				false
			}
		}
	}

	fn arm_timer(&self, state: &mut QueueState) {
		let generation = state.generation;
		let delay = self.inner.config.batch_interval;
		let engine: Weak<EngineInner> = Arc::downgrade(&self.inner);

		let task = self.inner.runtime.spawn(async move {
			tokio::time::sleep(delay).await;
			if let Some(inner) = engine.upgrade() {
				BatchEngine { inner }.flush_generation(generation);
			}
		});

		state.timer = Some(PendingFlush {
			generation,
			handle: task.abort_handle(),
		});
	}

	fn flush_generation(&self, generation: u64) {
		let mut state = self.state();
		let current = state
			.timer
			.as_ref()
			.is_some_and(|t| t.generation == generation);
		if !current {
			trace!(generation, "Ignoring superseded flush timer");
			return;
		}
		state.timer = None;
		let batch = state.take();
		drop(state);

		if !batch.is_empty() {
			debug!(count = batch.len(), "Batch interval elapsed, flushing");
			self.dispatch(batch);
		}
	}

	/// Sends every queued event as one batch and clears the queues.
	///
	/// Returns the number of events handed to the transport; 0 means the
	/// queues were empty and nothing was sent.
	pub fn flush_batch(&self) -> usize {
		let mut state = self.state();
		if state.batch.is_empty() {
			return 0;
		}
		let batch = state.take();
		drop(state);

		let count = batch.len();
		self.dispatch(batch);
		count
	}

	fn dispatch(&self, batch: IngestBatch) {
		let count = batch.len();
		let request = IngestRequest {
			url: self.inner.ingest_url.clone(),
			body: IngestBody::Batch { batch },
		};
		let transport = self.inner.transport.clone();

		self.inner.in_flight.spawn_on(
			async move {
				match transport.send(request).await {
					Ok(()) => debug!(count, "Event batch delivered"),
					Err(e) => error!(error = %e, count, "Failed to send event batch, dropping it"),
				}
			},
			&self.inner.runtime,
		);
	}

	/// Sends one event to the unified ingest address.
	pub fn send_single_event(&self, category: EventCategory, event: Envelope) {
		let url = self.inner.ingest_url.clone();
		self.send_single_event_to(url, category, event);
	}

	/// Sends one event, tagged with its category, to `url`.
	///
	/// On failure the event is queued for `category` instead.
	pub fn send_single_event_to(
		&self,
		url: impl Into<String>,
		category: EventCategory,
		event: Envelope,
	) {
		if self.inner.closed.load(Ordering::SeqCst) {
			warn!(category = %category, "Batch engine shut down, dropping event");
			return;
		}

		let request = IngestRequest {
			url: url.into(),
			body: IngestBody::Single(SingleEvent {
				event: event.clone(),
				category,
			}),
		};
		let engine = self.clone();

		self.inner.in_flight.spawn_on(
			async move {
				let url = request.url.clone();
				match engine.inner.transport.send(request).await {
					Ok(()) => trace!(category = %category, url = %url, "Event delivered"),
					Err(e) => {
						warn!(
							error = %e,
							category = %category,
							url = %url,
							"Failed to send event, queueing it for the next batch"
						);
						engine.requeue(category, event);
					}
				}
			},
			&self.inner.runtime,
		);
	}

	/// Number of events queued for `category`.
	pub fn queued(&self, category: EventCategory) -> usize {
		self.state().batch.queue(category).len()
	}

	/// Number of events queued across all categories.
	pub fn queued_total(&self) -> usize {
		self.state().batch.len()
	}

	/// A copy of the current queues.
	pub fn snapshot(&self) -> IngestBatch {
		self.state().batch.clone()
	}

	/// True while a time-triggered flush is pending.
	pub fn has_pending_timer(&self) -> bool {
		self.state().timer.is_some()
	}

	/// Waits for every send started so far to finish.
	pub async fn drain(&self) {
		let tracker = &self.inner.in_flight;
		tracker.close();
		tracker.wait().await;
		tracker.reopen();
	}

	/// Queues an event whose single send failed.
	///
	/// Unlike [`BatchEngine::add_to_batch`] this is accepted while shutdown is
	/// draining, so the final flush still carries it.
	fn requeue(&self, category: EventCategory, event: Envelope) {
		if self.inner.closed.load(Ordering::SeqCst) {
			debug!(category = %category, "Requeueing failed event for the final flush");
		}
		self.enqueue(category, event);
	}

	/// Waits for in-flight sends, flushes what is queued (failed single sends
	/// included) and rejects later adds.
	pub async fn shutdown(&self) {
		if self.inner.closed.swap(true, Ordering::SeqCst) {
			return;
		}
		self.drain().await;
		let flushed = self.flush_batch();
		self.drain().await;
		debug!(flushed, "Batch engine shut down");
	}

	pub fn is_shutdown(&self) -> bool {
		self.inner.closed.load(Ordering::SeqCst)
	}
}
