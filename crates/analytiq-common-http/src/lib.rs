// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared HTTP client for Analytiq.
//!
//! Every outbound request carries the same User-Agent so ingest logs can tell
//! tracker builds apart. Telemetry sends have no client-side timeout and no
//! retry; the builder leaves both unset.

mod client;

pub use client::{builder, builder_with_user_agent, new_client, platform, user_agent};
