// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The tracker facade.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use analytiq_config::{BatchConfig, MonitoringConfig, RoutesConfig, TrackerConfig};
use analytiq_core::{detect_search_term, SessionId, SiteKey, VisitorId};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::batch::BatchEngine;
use crate::clock::{Clock, Stamper, SystemClock};
use crate::collectors::{resolve_geo, ContextProvider, GeoLocator, StaticContext};
use crate::commerce::{rating_data, Order, Product, Signup};
use crate::emitter::{Emitter, EmitterParts};
use crate::engagement::{EngagementSnapshot, EngagementTracker};
use crate::error::{AnalyticsError, Result};
use crate::exit::{ExitController, LinkClick, VisibilityState};
use crate::identity::IdentityStore;
use crate::interactions::{ClickTarget, FieldFocus, FormSubmission, InteractionTracker, VideoElement};
use crate::monitor::MonitorHandle;
use crate::properties::Properties;
use crate::router::EndpointRouter;
use crate::storage::{FileStore, KeyValueStore, MemoryStore};
use crate::transport::{HttpTransport, Transport};

/// Builder for constructing an [`Analytiq`] tracker.
#[derive(Default)]
pub struct AnalyticsBuilder {
	config: Option<TrackerConfig>,
	site_id: Option<String>,
	site_key: Option<SiteKey>,
	base_url: Option<String>,
	batch: Option<BatchConfig>,
	monitoring: Option<MonitoringConfig>,
	routes: Option<RoutesConfig>,
	store: Option<Arc<dyn KeyValueStore>>,
	context: Option<Arc<dyn ContextProvider>>,
	transport: Option<Arc<dyn Transport>>,
	geo_locators: Vec<Arc<dyn GeoLocator>>,
	clock: Option<Arc<dyn Clock>>,
	runtime: Option<Handle>,
}

impl AnalyticsBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Starts from a loaded configuration. Individual setters still override it.
	pub fn config(mut self, config: TrackerConfig) -> Self {
		self.config = Some(config);
		self
	}

	pub fn site_id(mut self, site_id: impl Into<String>) -> Self {
		self.site_id = Some(site_id.into());
		self
	}

	pub fn site_key(mut self, site_key: impl Into<SiteKey>) -> Self {
		self.site_key = Some(site_key.into());
		self
	}

	/// Sets the origin for every send.
	///
	/// Example: `https://analytics.example.com`
	pub fn base_url(mut self, url: impl Into<String>) -> Self {
		self.base_url = Some(url.into());
		self
	}

	pub fn batch(mut self, batch: BatchConfig) -> Self {
		self.batch = Some(batch);
		self
	}

	pub fn monitoring(mut self, monitoring: MonitoringConfig) -> Self {
		self.monitoring = Some(monitoring);
		self
	}

	pub fn routes(mut self, routes: RoutesConfig) -> Self {
		self.routes = Some(routes);
		self
	}

	/// Where visitor and session ids live. Overrides `storage.path`.
	pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
		self.store = Some(store);
		self
	}

	pub fn context(mut self, context: Arc<dyn ContextProvider>) -> Self {
		self.context = Some(context);
		self
	}

	/// Replaces the HTTP transport.
	pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
		self.transport = Some(transport);
		self
	}

	/// Appends a geolocation source. Sources are tried in the order added.
	pub fn geo_locator(mut self, locator: Arc<dyn GeoLocator>) -> Self {
		self.geo_locators.push(locator);
		self
	}

	pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = Some(clock);
		self
	}

	/// Runtime for timers and sends. Defaults to the current one.
	pub fn runtime(mut self, runtime: Handle) -> Self {
		self.runtime = Some(runtime);
		self
	}

	fn resolve_config(&mut self) -> Result<TrackerConfig> {
		let mut config = match self.config.take() {
			Some(config) => config,
			None => {
				let site_id = self.site_id.take().ok_or(AnalyticsError::MissingSiteId)?;
				let site_key = self.site_key.take().ok_or(AnalyticsError::MissingSiteKey)?;
				TrackerConfig::new(site_id, site_key)
			}
		};

		if let Some(site_id) = self.site_id.take() {
			config.site.site_id = site_id;
		}
		if let Some(site_key) = self.site_key.take() {
			config.site.site_key = site_key;
		}
		if let Some(base_url) = self.base_url.take() {
			config = config.with_base_url(base_url);
		}
		if let Some(batch) = self.batch.take() {
			config.batch = batch;
		}
		if let Some(monitoring) = self.monitoring.take() {
			config.monitoring = monitoring;
		}
		if let Some(routes) = self.routes.take() {
			config.routes = routes;
		}

		if config.site.site_id.trim().is_empty() {
			return Err(AnalyticsError::MissingSiteId);
		}
		if config.site.site_key.is_empty() {
			return Err(AnalyticsError::MissingSiteKey);
		}
		config.validate()?;
		Ok(config)
	}

	fn resolve_store(&mut self, config: &TrackerConfig) -> Arc<dyn KeyValueStore> {
		if let Some(store) = self.store.take() {
			return store;
		}
		match &config.storage.path {
			Some(path) => match FileStore::open(path) {
				Ok(store) => Arc::new(store),
				Err(e) => {
					warn!(error = %e, "Identity storage unavailable, keeping ids in memory");
					Arc::new(MemoryStore::new())
				}
			},
			None => Arc::new(MemoryStore::new()),
		}
	}

	/// Builds the tracker without sending anything.
	///
	/// Must run inside a tokio runtime unless [`AnalyticsBuilder::runtime`]
	/// was given.
	pub fn build(mut self) -> Result<Analytiq> {
		let config = self.resolve_config()?;
		let runtime = match self.runtime.take() {
			Some(runtime) => runtime,
			None => Handle::try_current().map_err(|_| AnalyticsError::NoRuntime)?,
		};

		let transport: Arc<dyn Transport> = match self.transport.take() {
			Some(transport) => transport,
			None => Arc::new(HttpTransport::new(&config.site)?),
		};
		let store = self.resolve_store(&config);
		let context: Arc<dyn ContextProvider> = self
			.context
			.take()
			.unwrap_or_else(|| Arc::new(StaticContext::default()));
		let clock: Arc<dyn Clock> = self.clock.take().unwrap_or_else(|| Arc::new(SystemClock));

		let engine = BatchEngine::with_runtime(
			config.batch,
			config.ingest_url(),
			transport,
			runtime.clone(),
		);
		let router = EndpointRouter::new(engine.clone(), config.routes.clone());
		let engagement = Arc::new(EngagementTracker::new(config.monitoring.idle_threshold));

		let emitter = Arc::new(Emitter::new(EmitterParts {
			site_id: config.site.site_id.clone(),
			identity: IdentityStore::new(store),
			stamper: Stamper::new(clock),
			context,
			engine,
			router,
			engagement,
		}));

		info!(
			site_id = %config.site.site_id,
			ingest_url = %config.ingest_url(),
			geo_sources = self.geo_locators.len(),
			"Analytics tracker initialized"
		);

		Ok(Analytiq {
			inner: Arc::new(AnalytiqInner {
				exit: ExitController::new(emitter.clone()),
				interactions: InteractionTracker::new(emitter.clone()),
				emitter,
				geo_locators: self.geo_locators,
				monitoring: config.monitoring,
				runtime,
				monitor: Mutex::new(None),
				started: AtomicBool::new(false),
				closed: AtomicBool::new(false),
				config,
			}),
		})
	}

	/// Builds the tracker and runs [`Analytiq::start`].
	pub async fn start(self) -> Result<Analytiq> {
		let tracker = self.build()?;
		tracker.start().await;
		Ok(tracker)
	}
}

struct AnalytiqInner {
	config: TrackerConfig,
	emitter: Arc<Emitter>,
	exit: ExitController,
	interactions: InteractionTracker,
	geo_locators: Vec<Arc<dyn GeoLocator>>,
	monitoring: MonitoringConfig,
	runtime: Handle,
	monitor: Mutex<Option<MonitorHandle>>,
	started: AtomicBool,
	closed: AtomicBool,
}

/// Collects page telemetry and ships it to the ingest endpoint.
///
/// Tracking methods never fail: problems are logged and the event is dropped
/// or retried through the batch queue.
///
/// # Example
///
/// ```ignore
/// use analytiq::{Analytiq, Properties};
///
/// let tracker = Analytiq::builder()
///     .site_id("site_123")
///     .site_key("key_abc")
///     .base_url("https://analytics.example.com")
///     .start()
///     .await?;
///
/// tracker.track("signup_clicked", Properties::new().insert("plan", "pro"));
/// tracker.on_before_unload();
/// tracker.shutdown().await;
/// ```
#[derive(Clone)]
pub struct Analytiq {
	inner: Arc<AnalytiqInner>,
}

impl Analytiq {
	pub fn builder() -> AnalyticsBuilder {
		AnalyticsBuilder::new()
	}

	pub fn config(&self) -> &TrackerConfig {
		&self.inner.config
	}

	fn emitter(&self) -> &Emitter {
		&self.inner.emitter
	}

	fn accepting(&self, what: &str) -> bool {
		if self.inner.closed.load(Ordering::SeqCst) {
			debug!(event = what, "Tracker shut down, ignoring");
			return false;
		}
		true
	}

	/// Resolves geolocation, tracks the initial pageview, reports a site
	/// search found in the URL and starts periodic monitoring.
	///
	/// Only the first call does anything.
	pub async fn start(&self) {
		if self.inner.started.swap(true, Ordering::SeqCst) || !self.accepting("start") {
			return;
		}

		let geo = resolve_geo(&self.inner.geo_locators).await;
		self.emitter().set_geo(geo);

		let first_visit = self.emitter().is_new_visitor();
		self.emitter().track(
			"pageview",
			Properties::new()
				.insert("is_first_visit", first_visit)
				.insert("is_returning", !first_visit),
		);

		let page = self.emitter().context().page();
		if let Some(term) = detect_search_term(&page.url) {
			debug!(term = %term, "Site search detected in page URL");
			self.emitter().send_search_event(&term, None);
		}

		let monitor = MonitorHandle::start(
			self.inner.emitter.clone(),
			self.inner.monitoring,
			&self.inner.runtime,
		);
		*self.inner.monitor.lock().unwrap_or_else(PoisonError::into_inner) = Some(monitor);

		info!(first_visit, "Tracker started");
	}

	/// Queues a raw event with the full page context.
	pub fn track(&self, event_type: &str, payload: Properties) {
		if self.accepting(event_type) {
			self.emitter().track(event_type, payload);
		}
	}

	pub fn track_search(&self, search_term: &str, results_count: Option<u64>) {
		if self.accepting("search") {
			self.emitter().send_search_event(search_term, results_count);
		}
	}

	pub fn track_performance(&self) {
		if self.accepting("performance") {
			self.emitter().send_performance_event();
		}
	}

	/// Sends the engagement counters with `extra` merged in.
	pub fn track_engagement(&self, extra: Properties) {
		if self.accepting("engagement") {
			self.emitter().send_engagement_update(extra);
		}
	}

	pub fn track_purchase(&self, order: &Order) {
		if self.accepting("purchase") {
			self.emitter().send_conversion("purchase", order.purchase_fields());
		}
	}

	pub fn track_add_to_cart(&self, product: &Product) {
		if self.accepting("add_to_cart") {
			self.emitter().send_conversion("add_to_cart", product.cart_fields());
		}
	}

	pub fn track_product_view(&self, product: &Product) {
		if self.accepting("product_view") {
			self.emitter().send_conversion("product_view", product.view_fields());
		}
	}

	/// Sends a custom event. `data.category` and `data.value` fill the
	/// category and value columns; the whole of `data` is kept as well.
	pub fn track_custom(&self, event_name: &str, data: Properties) {
		if self.accepting(event_name) {
			self.emitter().send_custom_event(event_name, data);
		}
	}

	pub fn track_signup(&self, signup: &Signup) {
		self.track_custom("user_signup", signup.custom_data());
	}

	pub fn track_rating(&self, rating: f64, product_id: Option<&str>) {
		self.track_custom("rating_submitted", rating_data(rating, product_id));
	}

	pub fn send_immediate_performance(&self) {
		self.track_performance();
	}

	pub fn send_immediate_engagement(&self) {
		self.track_engagement(Properties::new().insert("manual_trigger", true));
	}

	/// Sends everything queued now. Returns the number of events sent.
	pub fn flush(&self) -> usize {
		self.emitter().engine().flush_batch()
	}

	/// Drops the session id; the next event starts a new session.
	pub fn reset_session(&self) {
		self.emitter().identity().clear_session();
		info!("Session reset");
	}

	pub fn visitor_id(&self) -> VisitorId {
		self.emitter().visitor().id
	}

	pub fn session_id(&self) -> SessionId {
		self.emitter().identity().session_id()
	}

	/// True when this page load created the visitor id.
	pub fn is_new_visitor(&self) -> bool {
		self.emitter().is_new_visitor()
	}

	pub fn engagement(&self) -> EngagementSnapshot {
		self.emitter().engagement().snapshot()
	}

	pub fn exit_sent(&self) -> bool {
		self.inner.exit.exit_sent()
	}

	/// Events waiting for the next batch.
	pub fn queued_events(&self) -> usize {
		self.emitter().engine().queued_total()
	}

	pub fn on_scroll(&self, scroll_y: f64, viewport_height: f64, document_height: f64) {
		self.emitter()
			.engagement()
			.record_scroll(scroll_y, viewport_height, document_height);
	}

	pub fn on_mouse_move(&self) {
		self.emitter().engagement().record_mouse_move();
	}

	pub fn on_key_down(&self) {
		self.emitter().engagement().record_key_down();
	}

	/// A click anywhere on the page. Links may end the page visit.
	pub fn on_click(&self, target: &ClickTarget) {
		if !self.accepting("click") {
			return;
		}
		self.inner.interactions.on_click(target);

		if let Some(href) = target.href.as_deref().filter(|h| !h.is_empty()) {
			let link = LinkClick {
				href: href.to_string(),
				target: target.target.clone(),
			};
			self.inner.exit.on_link_click(&link);
		}
	}

	pub fn on_form_submit(&self, form: &FormSubmission) {
		if self.accepting("form_submit") {
			self.inner.interactions.on_form_submit(form);
		}
	}

	pub fn on_field_focus(&self, focus: &FieldFocus) {
		if self.accepting("form_started") {
			self.inner.interactions.on_field_focus(focus);
		}
	}

	pub fn on_video_play(&self, video: &VideoElement) {
		if self.accepting("video_play") {
			self.inner.interactions.on_video_play(video);
		}
	}

	pub fn on_video_time_update(&self, video: &VideoElement) {
		if self.accepting("video_time_update") {
			self.inner.interactions.on_video_time_update(video);
		}
	}

	pub fn on_video_ended(&self, video: &VideoElement) {
		if self.accepting("video_ended") {
			self.inner.interactions.on_video_ended(video);
		}
	}

	/// Returns `true` if this call sent the exit event.
	pub fn on_before_unload(&self) -> bool {
		self.accepting("exit") && self.inner.exit.on_before_unload()
	}

	/// Returns `true` if this call sent the exit event.
	pub fn on_visibility_change(&self, state: VisibilityState) -> bool {
		self.accepting("exit") && self.inner.exit.on_visibility_change(state)
	}

	/// The page finished loading; reports performance shortly after.
	pub fn on_page_load(&self) {
		if !self.accepting("load") {
			return;
		}
		let monitor = self.inner.monitor.lock().unwrap_or_else(PoisonError::into_inner);
		match monitor.as_ref() {
			Some(monitor) if monitor.is_running() => monitor.schedule_load_report(),
			_ => debug!("Tracker not started, skipping load report"),
		}
	}

	/// Stops monitoring, flushes the queue and waits for every send.
	///
	/// Later tracking calls are ignored.
	pub async fn shutdown(&self) {
		if self.inner.closed.swap(true, Ordering::SeqCst) {
			return;
		}
		let monitor = self
			.inner
			.monitor
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.take();
		if let Some(monitor) = monitor {
			monitor.shutdown().await;
		}
		self.emitter().engine().shutdown().await;
		info!("Analytics tracker shut down");
	}
}
