// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-crate test doubles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use analytiq_config::{BatchConfig, RoutesConfig};
use analytiq_core::{
	CategoryEvent, Envelope, IngestBatch, IngestBody, PageInfo, RawEvent, SessionId, VisitorId,
};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::batch::BatchEngine;
use crate::clock::{Clock, Stamper, SystemClock};
use crate::collectors::StaticContext;
use crate::emitter::{Emitter, EmitterParts};
use crate::engagement::EngagementTracker;
use crate::error::{AnalyticsError, Result};
use crate::identity::IdentityStore;
use crate::router::EndpointRouter;
use crate::storage::{KeyValueStore, MemoryStore, StorageError};
use crate::transport::{IngestRequest, Transport};

pub(crate) const TEST_PAGE_URL: &str = "https://shop.example/products?q=boots";
pub(crate) const TEST_INGEST_URL: &str = "http://ingest.test/ingest";

/// Records every send; optionally fails them.
#[derive(Default)]
pub(crate) struct RecordingTransport {
	delivered: Mutex<Vec<IngestRequest>>,
	attempts: Mutex<usize>,
	fail: AtomicBool,
	fail_singles: AtomicBool,
}

impl RecordingTransport {
	pub(crate) fn new() -> Self {
		Self::default()
	}

	pub(crate) fn set_fail(&self, fail: bool) {
		self.fail.store(fail, Ordering::SeqCst);
	}

	/// Fails single-event sends only; batches still go through.
	pub(crate) fn set_fail_singles(&self, fail: bool) {
		self.fail_singles.store(fail, Ordering::SeqCst);
	}

	/// Successfully delivered requests, in send order.
	pub(crate) fn requests(&self) -> Vec<IngestRequest> {
		self.delivered.lock().unwrap().clone()
	}

	/// Every send, failed ones included.
	pub(crate) fn attempts(&self) -> usize {
		*self.attempts.lock().unwrap()
	}

	pub(crate) fn batches(&self) -> Vec<IngestBatch> {
		self.requests()
			.into_iter()
			.filter_map(|r| match r.body {
				IngestBody::Batch { batch } => Some(batch),
				IngestBody::Single(_) => None,
			})
			.collect()
	}

	/// Delivered single events as they appear on the wire.
	pub(crate) fn singles(&self) -> Vec<Value> {
		self.requests()
			.into_iter()
			.filter(|r| matches!(r.body, IngestBody::Single(_)))
			.map(|r| serde_json::to_value(&r.body).unwrap())
			.collect()
	}
}

#[async_trait::async_trait]
impl Transport for RecordingTransport {
	async fn send(&self, request: IngestRequest) -> Result<()> {
		*self.attempts.lock().unwrap() += 1;
		let single = matches!(request.body, IngestBody::Single(_));
		if self.fail.load(Ordering::SeqCst) || (single && self.fail_singles.load(Ordering::SeqCst)) {
			return Err(AnalyticsError::ServerError {
				status: 503,
				message: "unavailable".to_string(),
			});
		}
		self.delivered.lock().unwrap().push(request);
		Ok(())
	}
}

/// Storage that refuses every operation.
pub(crate) struct FailingStore;

impl KeyValueStore for FailingStore {
	fn get(&self, _key: &str) -> std::result::Result<Option<String>, StorageError> {
		Err(StorageError::Unavailable("disabled".to_string()))
	}

	fn set(&self, _key: &str, _value: &str) -> std::result::Result<(), StorageError> {
		Err(StorageError::Unavailable("disabled".to_string()))
	}

	fn remove(&self, _key: &str) -> std::result::Result<(), StorageError> {
		Err(StorageError::Unavailable("disabled".to_string()))
	}
}

/// Memory storage that starts failing once [`FlakyStore::break_now`] is called.
#[derive(Default)]
pub(crate) struct FlakyStore {
	inner: MemoryStore,
	broken: AtomicBool,
}

impl FlakyStore {
	pub(crate) fn new() -> Self {
		Self::default()
	}

	pub(crate) fn break_now(&self) {
		self.broken.store(true, Ordering::SeqCst);
	}

	fn check(&self) -> std::result::Result<(), StorageError> {
		if self.broken.load(Ordering::SeqCst) {
			Err(StorageError::Unavailable("quota exceeded".to_string()))
		} else {
			Ok(())
		}
	}
}

impl KeyValueStore for FlakyStore {
	fn get(&self, key: &str) -> std::result::Result<Option<String>, StorageError> {
		self.check()?;
		self.inner.get(key)
	}

	fn set(&self, key: &str, value: &str) -> std::result::Result<(), StorageError> {
		self.check()?;
		self.inner.set(key, value)
	}

	fn remove(&self, key: &str) -> std::result::Result<(), StorageError> {
		self.check()?;
		self.inner.remove(key)
	}
}

/// A clock that only moves when told to.
pub(crate) struct ManualClock {
	now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
	pub(crate) fn new(now: DateTime<Utc>) -> Self {
		Self {
			now: Mutex::new(now),
		}
	}

	pub(crate) fn set(&self, now: DateTime<Utc>) {
		*self.now.lock().unwrap() = now;
	}
}

impl Clock for ManualClock {
	fn now(&self) -> DateTime<Utc> {
		*self.now.lock().unwrap()
	}
}

pub(crate) fn raw_event(event_type: &str) -> Envelope {
	Envelope::Raw(RawEvent {
		site_id: "site_test".to_string(),
		ts: Utc::now(),
		event_type: event_type.to_string(),
		payload: Map::new(),
		visitor_id: VisitorId::from("visitor".to_string()),
		session_id: SessionId::from("session".to_string()),
	})
}

pub(crate) fn category_event(key: &str, value: &str) -> Envelope {
	let mut fields = Map::new();
	fields.insert(key.to_string(), Value::from(value));
	Envelope::Category(CategoryEvent {
		site_id: "site_test".to_string(),
		ts: Utc::now(),
		visitor_id: VisitorId::from("visitor".to_string()),
		session_id: SessionId::from("session".to_string()),
		event_type: None,
		fields,
	})
}

/// An emitter wired to recording doubles.
pub(crate) struct Harness {
	pub emitter: Arc<Emitter>,
	pub transport: Arc<RecordingTransport>,
	pub context: Arc<StaticContext>,
	pub store: Arc<MemoryStore>,
}

/// Builds a [`Harness`] with default batching and no dedicated routes.
///
/// Must be called inside a tokio runtime.
pub(crate) fn harness() -> Harness {
	harness_with(BatchConfig::default(), RoutesConfig::default())
}

pub(crate) fn harness_with(batch: BatchConfig, routes: RoutesConfig) -> Harness {
	let transport = Arc::new(RecordingTransport::new());
	let context = Arc::new(StaticContext::new(PageInfo::new(TEST_PAGE_URL, "Products")));
	let store = Arc::new(MemoryStore::new());
	let engine = BatchEngine::new(batch, TEST_INGEST_URL, transport.clone()).unwrap();
	let router = EndpointRouter::new(engine.clone(), routes);
	let clock: Arc<dyn Clock> = Arc::new(SystemClock);

	let emitter = Arc::new(Emitter::new(EmitterParts {
		site_id: "site_test".to_string(),
		identity: IdentityStore::new(store.clone()),
		stamper: Stamper::new(clock),
		context: context.clone(),
		engine,
		router,
		engagement: Arc::new(EngagementTracker::new(std::time::Duration::from_secs(30))),
	}));

	Harness {
		emitter,
		transport,
		context,
		store,
	}
}
