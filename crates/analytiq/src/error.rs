// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the tracker SDK.

use analytiq_config::ConfigError;
use thiserror::Error;

use crate::storage::StorageError;

/// Tracker SDK errors.
///
/// Only construction and the transport surface these; the public tracking
/// methods swallow them after logging.
#[derive(Debug, Error)]
pub enum AnalyticsError {
	/// Site id was not configured.
	#[error("site id is not set")]
	MissingSiteId,

	/// Site key was not configured.
	#[error("site key is not set")]
	MissingSiteKey,

	/// The tracker must be built inside a tokio runtime.
	#[error("no tokio runtime available; build the tracker inside a runtime or pass a handle")]
	NoRuntime,

	/// HTTP request failed.
	#[error("HTTP request failed: {0}")]
	RequestFailed(#[from] reqwest::Error),

	/// Server returned an error response.
	#[error("server error ({status}): {message}")]
	ServerError { status: u16, message: String },

	/// Rate limited by the server.
	#[error("rate limited, retry after {retry_after_secs:?} seconds")]
	RateLimited { retry_after_secs: Option<u64> },

	/// Client has been shut down.
	#[error("client has been shut down")]
	ClientShutdown,

	/// Geolocation lookup failed.
	#[error("geolocation failed: {0}")]
	Geo(String),

	/// Persistent storage failed.
	#[error(transparent)]
	Storage(#[from] StorageError),

	/// Configuration was invalid.
	#[error(transparent)]
	Config(#[from] ConfigError),
}

/// Result type alias for tracker operations.
pub type Result<T> = std::result::Result<T, AnalyticsError>;
