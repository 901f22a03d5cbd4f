// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections.

mod batch;
mod monitoring;
mod routes;
mod site;
mod storage;

pub use batch::{BatchConfig, BatchConfigLayer, DEFAULT_BATCH_INTERVAL_MS, DEFAULT_BATCH_SIZE};
pub use monitoring::{MonitoringConfig, MonitoringConfigLayer};
pub use routes::{RoutesConfig, RoutesConfigLayer};
pub use site::{parse_http_url, resolve_base_url, SiteConfig, SiteConfigLayer, DEFAULT_BASE_URL};
pub use storage::{StorageConfig, StorageConfigLayer};
