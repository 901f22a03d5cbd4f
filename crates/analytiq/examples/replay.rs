// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Replays a short page visit against a live ingest endpoint.
//!
//! ```text
//! ANALYTIQ_SITE_ID=site_1 ANALYTIQ_SITE_KEY=key_1 RUST_LOG=analytiq=debug \
//!     cargo run -p analytiq --example replay -- https://shop.example/products?q=boots
//! ```

use std::sync::Arc;
use std::time::Duration;

use analytiq::{
	Analytiq, ClickTarget, DeviceInfo, FormSubmission, PageInfo, Product, Properties,
	StaticContext, VisibilityState,
};
use tracing_subscriber::prelude::*;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| "analytiq=info".into()),
		)
		.with(tracing_subscriber::fmt::layer())
		.init();

	let config = analytiq_config::load_config()?;
	let url = std::env::args()
		.nth(1)
		.unwrap_or_else(|| "https://shop.example/products".to_string());

	let mut device = DeviceInfo::from_user_agent(USER_AGENT, "MacIntel", 1440, 900);
	device.language = Some("en-US".to_string());
	let context = Arc::new(StaticContext::new(PageInfo::new(url, "Products")).with_device(device));

	let tracker = Analytiq::builder()
		.config(config)
		.context(context)
		.start()
		.await?;
	tracing::info!(visitor_id = %tracker.visitor_id(), "replaying visit");

	tracker.on_page_load();
	tracker.on_scroll(600.0, 900.0, 2700.0);
	tracker.on_mouse_move();
	tracker.track_product_view(&Product::new("sku-42").with_name("Trail boots").with_price(129.0));
	tracker.on_click(&ClickTarget::new("button").with_text("Add to cart"));
	tracker.on_form_submit(&FormSubmission {
		id: "newsletter".to_string(),
		action: "/subscribe".to_string(),
		field_names: vec!["email".to_string()],
		..Default::default()
	});
	tracker.track("size_guide_opened", Properties::new().insert("size", 42));

	tokio::time::sleep(Duration::from_secs(2)).await;
	tracker.on_visibility_change(VisibilityState::Hidden);
	tracker.shutdown().await;
	Ok(())
}
