// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Helper for building event payloads and flat category fields.

use serde::Serialize;
use serde_json::{Map, Value};

/// A builder for event payload fields.
///
/// Later inserts overwrite earlier ones, so merging host-supplied fields last
/// lets them override computed ones.
///
/// # Example
///
/// ```
/// use analytiq::Properties;
///
/// let props = Properties::new()
///     .insert("button_name", "checkout")
///     .insert("page", "/cart")
///     .insert("price", 99.99)
///     .insert_opt("coupon", None::<String>);
/// assert_eq!(props.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
	inner: Map<String, Value>,
}

impl Properties {
	pub fn new() -> Self {
		Self { inner: Map::new() }
	}

	/// Inserts a key-value pair.
	pub fn insert<K, V>(mut self, key: K, value: V) -> Self
	where
		K: Into<String>,
		V: Into<Value>,
	{
		self.inner.insert(key.into(), value.into());
		self
	}

	/// Inserts the value only when it is `Some`.
	pub fn insert_opt<K, V>(self, key: K, value: Option<V>) -> Self
	where
		K: Into<String>,
		V: Into<Value>,
	{
		match value {
			Some(value) => self.insert(key, value),
			None => self,
		}
	}

	/// Flattens a serializable struct into the properties.
	///
	/// Values that do not serialize to a JSON object are ignored.
	pub fn extend_from<T: Serialize>(mut self, value: &T) -> Self {
		if let Ok(Value::Object(map)) = serde_json::to_value(value) {
			self.inner.extend(map);
		}
		self
	}

	/// Merges another Properties into this one.
	///
	/// If both contain the same key, the value from `other` takes precedence.
	pub fn merge(mut self, other: Properties) -> Self {
		self.inner.extend(other.inner);
		self
	}

	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}

	pub fn len(&self) -> usize {
		self.inner.len()
	}

	pub fn get(&self, key: &str) -> Option<&Value> {
		self.inner.get(key)
	}

	pub fn into_map(self) -> Map<String, Value> {
		self.inner
	}

	pub fn into_value(self) -> Value {
		Value::Object(self.inner)
	}
}

impl From<Properties> for Value {
	fn from(props: Properties) -> Self {
		props.into_value()
	}
}

impl From<Value> for Properties {
	fn from(value: Value) -> Self {
		match value {
			Value::Object(map) => Self { inner: map },
			_ => Self::new(),
		}
	}
}

impl From<Map<String, Value>> for Properties {
	fn from(map: Map<String, Value>) -> Self {
		Self { inner: map }
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use serde_json::json;

	#[derive(Serialize)]
	struct Screen {
		width: u32,
		#[serde(skip_serializing_if = "Option::is_none")]
		label: Option<String>,
	}

	#[test]
	fn test_insert_opt_skips_none() {
		let props = Properties::new()
			.insert_opt("a", Some(1))
			.insert_opt("b", None::<i32>);
		assert_eq!(props.len(), 1);
		assert_eq!(props.get("a"), Some(&json!(1)));
	}

	#[test]
	fn test_extend_from_flattens_struct() {
		let props = Properties::new().extend_from(&Screen {
			width: 1280,
			label: None,
		});
		assert_eq!(props.get("width"), Some(&json!(1280)));
		assert!(props.get("label").is_none());
	}

	#[test]
	fn test_extend_from_ignores_scalars() {
		let props = Properties::new().insert("x", 1).extend_from(&42);
		assert_eq!(props.len(), 1);
	}

	#[test]
	fn test_merge_other_wins() {
		let base = Properties::new().insert("k", "base").insert("only_base", true);
		let merged = base.merge(Properties::new().insert("k", "other"));
		assert_eq!(merged.get("k"), Some(&json!("other")));
		assert_eq!(merged.get("only_base"), Some(&json!(true)));
	}

	#[test]
	fn test_from_non_object_value_is_empty() {
		assert!(Properties::from(json!([1, 2])).is_empty());
		assert_eq!(Properties::from(json!({"a": 1})).len(), 1);
	}

	proptest! {
		#[test]
		fn merge_keeps_every_key(
			left in proptest::collection::btree_map("[a-z]{1,6}", 0i64..100, 0..8),
			right in proptest::collection::btree_map("[a-z]{1,6}", 0i64..100, 0..8),
		) {
			let mut l = Properties::new();
			for (k, v) in &left {
				l = l.insert(k.clone(), *v);
			}
			let mut r = Properties::new();
			for (k, v) in &right {
				r = r.insert(k.clone(), *v);
			}
			let merged = l.merge(r);
			for (k, v) in &right {
				prop_assert_eq!(merged.get(k), Some(&json!(v)));
			}
			for (k, v) in &left {
				if !right.contains_key(k) {
					prop_assert_eq!(merged.get(k), Some(&json!(v)));
				}
			}
		}
	}
}
