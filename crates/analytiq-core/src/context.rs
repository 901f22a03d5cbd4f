// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Context snapshots merged into raw event payloads, and the pure helpers
//! that derive them from user-agent strings and URLs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

/// The page the tracker is embedded in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageInfo {
	/// Full URL of the page (`location.href`).
	pub url: String,
	/// Document title.
	pub title: String,
	/// `document.referrer`, empty when there is none.
	#[serde(default)]
	pub referrer: String,
}

impl PageInfo {
	pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
		Self {
			url: url.into(),
			title: title.into(),
			referrer: String::new(),
		}
	}

	pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
		self.referrer = referrer.into();
		self
	}

	/// The path component of the URL, `/` if it cannot be parsed.
	pub fn path(&self) -> String {
		Url::parse(&self.url)
			.map(|u| u.path().to_string())
			.unwrap_or_else(|_| "/".to_string())
	}

	/// The host of the URL, if any.
	pub fn host(&self) -> Option<String> {
		Url::parse(&self.url)
			.ok()
			.and_then(|u| u.host_str().map(str::to_string))
	}

	/// The query string without the leading `?`.
	pub fn query(&self) -> String {
		Url::parse(&self.url)
			.ok()
			.and_then(|u| u.query().map(str::to_string))
			.unwrap_or_default()
	}
}

/// Browser and device facts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub user_agent: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub platform: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub device_type: Option<DeviceType>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub screen: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub screen_width: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub screen_height: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub language: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub browser: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub os: Option<String>,
}

impl DeviceInfo {
	/// Fills the derived fields from a user agent, platform and screen size.
	pub fn from_user_agent(
		user_agent: &str,
		platform: &str,
		screen_width: u32,
		screen_height: u32,
	) -> Self {
		let browser = parse_browser_info(user_agent, platform);
		Self {
			user_agent: Some(user_agent.to_string()),
			platform: Some(platform.to_string()),
			device_type: Some(device_type(user_agent)),
			screen: Some(format!("{screen_width}x{screen_height}")),
			screen_width: Some(screen_width),
			screen_height: Some(screen_height),
			language: None,
			browser: Some(browser.browser),
			os: Some(browser.os),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
	Desktop,
	Mobile,
	Tablet,
}

/// Network Information API snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkInfo {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub connection_downlink: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub connection_rtt: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub connection_type: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub connection_save_data: Option<bool>,
}

/// Navigation timing and Core Web Vitals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub navigation_start: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub dom_content_loaded: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub load_event: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub first_contentful_paint: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub largest_contentful_paint: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub cumulative_layout_shift: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub first_input_delay: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub server_response_time: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub total_resources: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub cached_resources: Option<u32>,
}

/// Latitude/longitude pair. `(0, 0)` is the "unknown" placeholder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoInfo {
	pub lat: f64,
	pub long: f64,
}

impl GeoInfo {
	pub const UNKNOWN: GeoInfo = GeoInfo { lat: 0.0, long: 0.0 };

	/// True when both coordinates are non-zero.
	pub fn is_known(&self) -> bool {
		self.lat != 0.0 && self.long != 0.0
	}
}

/// Where the visitor came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferrerInfo {
	pub referrer: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub referrer_domain: Option<String>,
	pub traffic_source: TrafficSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficSource {
	Direct,
	Organic,
	Social,
	Paid,
	Referral,
	Internal,
}

/// `utm_*` query parameters, ordered by name.
pub type UtmParams = BTreeMap<String, String>;

/// Browser and operating system names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserInfo {
	pub browser: String,
	pub os: String,
}

/// Sniffs the browser and OS from `navigator.userAgent` and `navigator.platform`.
///
/// Android is checked before Linux because Android devices report a Linux
/// platform.
pub fn parse_browser_info(user_agent: &str, platform: &str) -> BrowserInfo {
	let ua = user_agent;
	let browser = if ua.contains("Chrome") && !ua.contains("Edg") {
		"Chrome"
	} else if ua.contains("Safari") && !ua.contains("Chrome") {
		"Safari"
	} else if ua.contains("Firefox") {
		"Firefox"
	} else if ua.contains("Edg") {
		"Edge"
	} else if ua.contains("Opera") || ua.contains("OPR") {
		"Opera"
	} else {
		"Unknown"
	};

	let ios = ua.contains("iPhone") || ua.contains("iPad");
	let os = if ua.contains("Android") {
		"Android"
	} else if platform.contains("Win") {
		"Windows"
	} else if platform.contains("Mac") || ios {
		if ios {
			"iOS"
		} else {
			"macOS"
		}
	} else if ua.contains("CrOS") {
		"ChromeOS"
	} else if platform.contains("Linux") {
		"Linux"
	} else {
		"Unknown"
	};

	BrowserInfo {
		browser: browser.to_string(),
		os: os.to_string(),
	}
}

/// Classifies the device from the user agent.
pub fn device_type(user_agent: &str) -> DeviceType {
	let lower = user_agent.to_ascii_lowercase();
	if lower.contains("mobi") || lower.contains("android") {
		if lower.contains("tablet") || lower.contains("ipad") {
			DeviceType::Tablet
		} else {
			DeviceType::Mobile
		}
	} else {
		DeviceType::Desktop
	}
}

/// Extracts `utm_*` parameters from a query string (without `?`).
///
/// Pairs that are not exactly `key=value` are skipped.
pub fn parse_utm_params(query: &str) -> UtmParams {
	let query = query.strip_prefix('?').unwrap_or(query);
	let mut params = UtmParams::new();
	for pair in query.split('&') {
		let mut parts = pair.split('=');
		let (Some(key), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
			continue;
		};
		if key.starts_with("utm_") {
			let decoded = url::form_urlencoded::parse(format!("v={value}").as_bytes())
				.next()
				.map(|(_, v)| v.into_owned())
				.unwrap_or_else(|| value.to_string());
			params.insert(key.to_string(), decoded);
		}
	}
	params
}

/// Classifies a referrer relative to the current host.
pub fn classify_traffic_source(referrer: &str, current_host: &str, has_utm: bool) -> ReferrerInfo {
	if referrer.is_empty() {
		return ReferrerInfo {
			referrer: String::new(),
			referrer_domain: None,
			traffic_source: TrafficSource::Direct,
		};
	}

	let Some(domain) = Url::parse(referrer)
		.ok()
		.and_then(|u| u.host_str().map(str::to_string))
	else {
		return ReferrerInfo {
			referrer: referrer.to_string(),
			referrer_domain: None,
			traffic_source: TrafficSource::Direct,
		};
	};

	let source = if domain == current_host {
		TrafficSource::Internal
	} else if domain.contains("google.") {
		TrafficSource::Organic
	} else if ["facebook.", "twitter.", "linkedin.", "instagram."]
		.iter()
		.any(|s| domain.contains(s))
	{
		TrafficSource::Social
	} else if has_utm {
		TrafficSource::Paid
	} else {
		TrafficSource::Referral
	};

	ReferrerInfo {
		referrer: referrer.to_string(),
		referrer_domain: Some(domain),
		traffic_source: source,
	}
}

/// Finds a site search term in the `q`, `search` or `query` parameter.
pub fn detect_search_term(page_url: &str) -> Option<String> {
	let url = Url::parse(page_url).ok()?;
	let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
	["q", "search", "query"].iter().find_map(|name| {
		pairs
			.iter()
			.find(|(k, v)| k == name && !v.is_empty())
			.map(|(_, v)| v.clone())
	})
}
