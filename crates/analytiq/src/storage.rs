// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Persistent key-value storage for identifiers.
//!
//! [`KeyValueStore`] is the seam a host uses to plug in its own storage
//! (`localStorage` in a browser). [`FileStore`] keeps the values in a small
//! JSON object on disk for native hosts.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::debug;

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
	/// The backend refused access (quota, privacy mode, disabled storage).
	#[error("storage unavailable: {0}")]
	Unavailable(String),

	#[error("failed to access {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("storage file {path} is corrupt: {source}")]
	Corrupt {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},
}

/// Synchronous string key-value storage.
pub trait KeyValueStore: Send + Sync {
	fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
	fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
	fn remove(&self, key: &str) -> Result<(), StorageError>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Process-local storage. Values vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
	entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}
}

impl KeyValueStore for MemoryStore {
	fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
		Ok(lock(&self.entries).get(key).cloned())
	}

	fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
		lock(&self.entries).insert(key.to_string(), value.to_string());
		Ok(())
	}

	fn remove(&self, key: &str) -> Result<(), StorageError> {
		lock(&self.entries).remove(key);
		Ok(())
	}
}

/// Storage backed by a JSON object file.
///
/// Every write replaces the file atomically (write to a sibling temp file,
/// then rename), so a crash never leaves a half-written file behind.
#[derive(Debug)]
pub struct FileStore {
	path: PathBuf,
	entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
	/// Opens the store, loading existing values if the file exists.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
		let path = path.into();
		let entries = if path.exists() {
			let content = std::fs::read_to_string(&path).map_err(|source| StorageError::Io {
				path: path.clone(),
				source,
			})?;
			if content.trim().is_empty() {
				BTreeMap::new()
			} else {
				serde_json::from_str(&content).map_err(|source| StorageError::Corrupt {
					path: path.clone(),
					source,
				})?
			}
		} else {
			BTreeMap::new()
		};

		debug!(path = %path.display(), keys = entries.len(), "opened identity store");
		Ok(Self {
			path,
			entries: Mutex::new(entries),
		})
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
		let io_err = |source| StorageError::Io {
			path: self.path.clone(),
			source,
		};
		if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
			std::fs::create_dir_all(parent).map_err(io_err)?;
		}
		let json = serde_json::to_vec_pretty(entries).map_err(|source| StorageError::Corrupt {
			path: self.path.clone(),
			source,
		})?;
		let tmp = self.path.with_extension("tmp");
		std::fs::write(&tmp, json).map_err(io_err)?;
		std::fs::rename(&tmp, &self.path).map_err(io_err)?;
		Ok(())
	}
}

impl KeyValueStore for FileStore {
	fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
		Ok(lock(&self.entries).get(key).cloned())
	}

	fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
		let mut entries = lock(&self.entries);
		let previous = entries.insert(key.to_string(), value.to_string());
		if let Err(e) = self.persist(&entries) {
			match previous {
				Some(previous) => entries.insert(key.to_string(), previous),
				None => entries.remove(key),
			};
			return Err(e);
		}
		Ok(())
	}

	fn remove(&self, key: &str) -> Result<(), StorageError> {
		let mut entries = lock(&self.entries);
		if let Some(previous) = entries.remove(key) {
			if let Err(e) = self.persist(&entries) {
				entries.insert(key.to_string(), previous);
				return Err(e);
			}
		}
		Ok(())
	}
}
