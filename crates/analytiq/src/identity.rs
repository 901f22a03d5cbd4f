// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Visitor and session identity on top of a [`KeyValueStore`].
//!
//! Storage failures never reach the caller. The first failure switches the
//! store into degraded mode for the rest of its lifetime: ids are then served
//! from memory, reusing whatever was already read successfully.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use analytiq_core::{SessionId, VisitorId, VisitorIdentity};
use tracing::{debug, warn};

use crate::storage::{KeyValueStore, StorageError};

/// Storage key of the visitor id.
pub const VISITOR_ID_KEY: &str = "analytiq_vid";
/// Storage key of the session id.
pub const SESSION_ID_KEY: &str = "analytiq_sid";

#[derive(Debug, Default)]
struct IdentityState {
	degraded: bool,
	visitor: Option<VisitorId>,
	session: Option<SessionId>,
}

/// Resolves and persists the visitor and session ids.
pub struct IdentityStore {
	store: Arc<dyn KeyValueStore>,
	state: Mutex<IdentityState>,
}

impl IdentityStore {
	pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
		Self {
			store,
			state: Mutex::new(IdentityState::default()),
		}
	}

	fn state(&self) -> MutexGuard<'_, IdentityState> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// True once a storage failure forced in-memory ids.
	pub fn is_degraded(&self) -> bool {
		self.state().degraded
	}

	/// Returns the stored visitor id, creating and persisting one on the first
	/// read. `is_new` is true only for the read that created it.
	pub fn get_or_set_visitor_id(&self) -> VisitorIdentity {
		let mut state = self.state();
		if !state.degraded {
			match self.store.get(VISITOR_ID_KEY) {
				Ok(Some(stored)) => {
					let id = VisitorId::from(stored);
					state.visitor = Some(id.clone());
					return VisitorIdentity { id, is_new: false };
				}
				Ok(None) => {
					let id = VisitorId::generate();
					if let Err(e) = self.store.set(VISITOR_ID_KEY, id.as_str()) {
						degrade(&mut state, &e);
					}
					debug!(visitor_id = %id, "created visitor id");
					state.visitor = Some(id.clone());
					return VisitorIdentity { id, is_new: true };
				}
				Err(e) => degrade(&mut state, &e),
			}
		}

		match &state.visitor {
			Some(id) => VisitorIdentity {
				id: id.clone(),
				is_new: false,
			},
			None => {
				let id = VisitorId::generate();
				state.visitor = Some(id.clone());
				VisitorIdentity { id, is_new: true }
			}
		}
	}

	/// Returns the session id, creating it lazily.
	pub fn session_id(&self) -> SessionId {
		let mut state = self.state();
		if !state.degraded {
			match self.store.get(SESSION_ID_KEY) {
				Ok(Some(stored)) => {
					let id = SessionId::from(stored);
					state.session = Some(id.clone());
					return id;
				}
				Ok(None) => {
					let id = SessionId::generate();
					if let Err(e) = self.store.set(SESSION_ID_KEY, id.as_str()) {
						degrade(&mut state, &e);
					}
					debug!(session_id = %id, "created session id");
					state.session = Some(id.clone());
					return id;
				}
				Err(e) => degrade(&mut state, &e),
			}
		}

		state.session.get_or_insert_with(SessionId::generate).clone()
	}

	/// Forgets the session id. The next read creates a new one.
	pub fn clear_session(&self) {
		let mut state = self.state();
		state.session = None;
		if state.degraded {
			return;
		}
		if let Err(e) = self.store.remove(SESSION_ID_KEY) {
			degrade(&mut state, &e);
		}
	}
}

fn degrade(state: &mut IdentityState, error: &StorageError) {
	if !state.degraded {
		warn!(error = %error, "identity storage unavailable, using in-memory ids for this page");
	}
	state.degraded = true;
}
