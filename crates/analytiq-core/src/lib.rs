// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared types for the Analytiq tracker.
//!
//! This crate has no I/O. It defines the event envelopes and batch bodies
//! exchanged with the ingest endpoint, the identifiers that tie events to a
//! visitor and a session, and the context snapshots merged into raw events.

pub mod category;
pub mod context;
pub mod event;
pub mod identity;
pub mod secret;
pub mod wire;

pub use category::{EventCategory, UnknownCategory};
pub use context::{
	classify_traffic_source, detect_search_term, device_type, parse_browser_info,
	parse_utm_params, BrowserInfo, DeviceInfo, DeviceType, GeoInfo, NetworkInfo, PageInfo,
	PerformanceMetrics, ReferrerInfo, TrafficSource, UtmParams,
};
pub use event::{CategoryEvent, Envelope, RawEvent, ENVELOPE_KEYS};
pub use identity::{SessionId, VisitorId, VisitorIdentity};
pub use secret::SiteKey;
pub use wire::{
	IngestBatch, IngestBody, IngestResponse, SingleEvent, INGEST_PATH, SITE_ID_HEADER,
	SITE_KEY_HEADER,
};
