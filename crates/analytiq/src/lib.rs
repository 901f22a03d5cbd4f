// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Web analytics collector SDK for Analytiq.
//!
//! The host (a browser binding, a webview shell or a test) feeds page
//! signals into [`Analytiq`]; the tracker turns them into events, batches
//! them and posts them to the ingest endpoint.
//!
//! # Features
//!
//! - **Stable identity**: visitor id persisted through a [`KeyValueStore`],
//!   session id kept until [`Analytiq::reset_session`]
//! - **Batching**: per-category queues flushed by size or after an interval
//! - **Routing**: optional dedicated endpoint per event category, falling
//!   back to the batch queue when a send fails
//! - **Engagement**: scroll depth, pointer and keyboard counts, idle time
//! - **Exit reporting**: exactly one exit summary per page
//! - **Monitoring**: periodic engagement and performance reports while the
//!   visitor is active
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use analytiq::{Analytiq, PageInfo, Properties, StaticContext, VisibilityState};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let page = PageInfo::new("https://shop.example/products?q=boots", "Products");
//!     let tracker = Analytiq::builder()
//!         .config(analytiq_config::load_config()?)
//!         .context(Arc::new(StaticContext::new(page)))
//!         .start()
//!         .await?;
//!
//!     tracker.on_scroll(800.0, 900.0, 2400.0);
//!     tracker.track("newsletter_opened", Properties::new().insert("issue", 42));
//!     tracker.on_visibility_change(VisibilityState::Hidden);
//!
//!     tracker.shutdown().await;
//!     Ok(())
//! }
//! ```

mod batch;
mod client;
mod clock;
mod collectors;
mod commerce;
mod emitter;
mod engagement;
mod error;
mod exit;
mod identity;
mod interactions;
mod monitor;
mod properties;
mod router;
mod storage;
mod transport;

#[cfg(test)]
mod testing;

pub use batch::BatchEngine;
pub use client::{AnalyticsBuilder, Analytiq};
pub use clock::{Clock, SystemClock};
pub use collectors::{
	resolve_geo, ContextProvider, FixedGeoLocator, GeoLocator, IpGeoLocator, StaticContext,
	GEO_LOOKUP_TIMEOUT,
};
pub use commerce::{Order, Product, Signup, DEFAULT_CURRENCY};
pub use engagement::{EngagementSnapshot, EngagementTracker};
pub use error::{AnalyticsError, Result};
pub use exit::{ExitReason, LinkClick, VisibilityState};
pub use identity::{IdentityStore, SESSION_ID_KEY, VISITOR_ID_KEY};
pub use interactions::{ClickTarget, FieldFocus, FormKind, FormSubmission, VideoElement};
pub use properties::Properties;
pub use router::{Delivery, EndpointRouter};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use transport::{HttpTransport, IngestRequest, Transport};

// Re-export core and config types for convenience
pub use analytiq_config::{
	BatchConfig, MonitoringConfig, RoutesConfig, SiteConfig, StorageConfig, TrackerConfig,
};
pub use analytiq_core::{
	DeviceInfo, DeviceType, EventCategory, Envelope, GeoInfo, IngestBatch, IngestBody, NetworkInfo,
	PageInfo, PerformanceMetrics, ReferrerInfo, SessionId, SiteKey, TrafficSource, VisitorId,
};
