// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! E-commerce and account event inputs.

use serde::{Deserialize, Serialize};

use crate::properties::Properties;

pub const DEFAULT_CURRENCY: &str = "USD";

/// A completed order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
	pub order_id: String,
	pub total: f64,
	#[serde(default)]
	pub currency: Option<String>,
	/// Line items; when absent the order counts as one product.
	#[serde(default)]
	pub items: Option<Vec<Product>>,
}

impl Order {
	pub fn new(order_id: impl Into<String>, total: f64) -> Self {
		Self {
			order_id: order_id.into(),
			total,
			..Default::default()
		}
	}

	pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
		self.currency = Some(currency.into());
		self
	}

	pub fn with_items(mut self, items: Vec<Product>) -> Self {
		self.items = Some(items);
		self
	}

	pub fn product_count(&self) -> usize {
		self.items.as_ref().map_or(1, Vec::len)
	}

	pub(crate) fn purchase_fields(&self) -> Properties {
		Properties::new()
			.insert("order_id", self.order_id.as_str())
			.insert("order_value", self.total)
			.insert("currency", currency_or_default(&self.currency))
			.insert("product_count", self.product_count())
	}
}

/// A product as shown or added to the cart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
	pub id: String,
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub category: Option<String>,
	#[serde(default)]
	pub price: Option<f64>,
	#[serde(default)]
	pub quantity: Option<u32>,
	#[serde(default)]
	pub currency: Option<String>,
}

impl Product {
	pub fn new(id: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			..Default::default()
		}
	}

	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	pub fn with_category(mut self, category: impl Into<String>) -> Self {
		self.category = Some(category.into());
		self
	}

	pub fn with_price(mut self, price: f64) -> Self {
		self.price = Some(price);
		self
	}

	pub fn with_quantity(mut self, quantity: u32) -> Self {
		self.quantity = Some(quantity);
		self
	}

	pub(crate) fn view_fields(&self) -> Properties {
		Properties::new()
			.insert("product_id", self.id.as_str())
			.insert_opt("product_name", self.name.clone())
			.insert_opt("category", self.category.clone())
			.insert_opt("price", self.price)
	}

	pub(crate) fn cart_fields(&self) -> Properties {
		self.view_fields()
			.insert("quantity", self.quantity.unwrap_or(1))
			.insert("currency", currency_or_default(&self.currency))
	}
}

/// A new account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Signup {
	/// Account type; `regular` when absent.
	#[serde(default, rename = "type")]
	pub user_type: Option<String>,
	/// Signup method; `email` when absent.
	#[serde(default)]
	pub method: Option<String>,
}

impl Signup {
	pub(crate) fn custom_data(&self) -> Properties {
		Properties::new()
			.insert("category", "authentication")
			.insert("user_type", self.user_type.as_deref().unwrap_or("regular"))
			.insert("signup_method", self.method.as_deref().unwrap_or("email"))
	}
}

pub(crate) fn rating_data(rating: f64, product_id: Option<&str>) -> Properties {
	Properties::new()
		.insert("category", "engagement")
		.insert("value", rating)
		.insert_opt("product_id", product_id)
}

fn currency_or_default(currency: &Option<String>) -> String {
	currency
		.as_deref()
		.filter(|c| !c.is_empty())
		.unwrap_or(DEFAULT_CURRENCY)
		.to_string()
}
