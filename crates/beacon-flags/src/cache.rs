// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Versioned in-memory cache of flag and segment state.
//!
//! The cache is the single authority for "is this update newer": every
//! resource type carries a monotonic change-number cursor, and synchronizers
//! only apply a fetched page whose `since` matches the current cursor.
//!
//! Writers apply entries first and advance the advertised cursor last, so a
//! reader never observes a cursor ahead of the definitions backing it.
//! Entries for different names live in a sharded concurrent map and do not
//! block each other; cursor updates are serialized atomics.

use std::sync::atomic::{AtomicI64, Ordering};

use dashmap::DashMap;
use tracing::debug;

use beacon_flags_core::{FlagDefinition, SegmentChange, SegmentMembership, NO_CURSOR};

/// Shared cache of authoritative flag and segment state.
#[derive(Debug)]
pub struct VersionedCache {
	flags: DashMap<String, FlagDefinition>,
	segments: DashMap<String, SegmentMembership>,
	flag_change_number: AtomicI64,
}

impl VersionedCache {
	pub fn new() -> Self {
		Self {
			flags: DashMap::new(),
			segments: DashMap::new(),
			flag_change_number: AtomicI64::new(NO_CURSOR),
		}
	}

	/// Looks up one flag definition by name.
	pub fn get_flag(&self, name: &str) -> Option<FlagDefinition> {
		self.flags.get(name).map(|entry| entry.clone())
	}

	/// Stores a definition, replacing any previous one wholesale.
	///
	/// Archived or killed definitions are retained with their conditions
	/// stripped, so evaluation can still report the forced default
	/// treatment. Entries are never deleted.
	pub fn put_flag(&self, mut definition: FlagDefinition) {
		if !definition.is_live() {
			definition.conditions.clear();
		}
		self.flags.insert(definition.name.clone(), definition);
	}

	/// Applies a kill in place: the entry survives with the forced default
	/// treatment and no conditions. Returns whether the flag was present.
	pub fn kill_flag(&self, name: &str, default_treatment: &str, change_number: i64) -> bool {
		match self.flags.get_mut(name) {
			Some(mut entry) => {
				entry.kill(default_treatment.to_string(), change_number);
				true
			}
			None => {
				debug!(flag = name, "kill for a flag not in cache, ignored");
				false
			}
		}
	}

	pub fn flag_change_number(&self) -> i64 {
		self.flag_change_number.load(Ordering::SeqCst)
	}

	/// Advances the flag cursor. The cursor is a ratchet: attempts to move
	/// it backwards are ignored.
	pub fn set_flag_change_number(&self, change_number: i64) {
		self.flag_change_number
			.fetch_max(change_number, Ordering::SeqCst);
	}

	pub fn flag_count(&self) -> usize {
		self.flags.len()
	}

	/// Membership test on the evaluation path.
	pub fn segment_contains(&self, name: &str, key: &str) -> bool {
		self.segments
			.get(name)
			.map(|entry| entry.contains(key))
			.unwrap_or(false)
	}

	/// Current cursor for one segment, [`NO_CURSOR`] if never fetched.
	pub fn segment_change_number(&self, name: &str) -> i64 {
		self.segments
			.get(name)
			.map(|entry| entry.since)
			.unwrap_or(NO_CURSOR)
	}

	/// Applies one change-log page to a segment, atomically with respect to
	/// concurrent readers of that segment.
	///
	/// The page is discarded as stale unless its `since` matches the
	/// segment's current cursor. Returns whether it was applied.
	pub fn apply_segment_delta(&self, change: &SegmentChange) -> bool {
		let mut entry = self
			.segments
			.entry(change.name.clone())
			.or_insert_with(|| SegmentMembership::new(change.name.clone()));
		if change.since != entry.since {
			debug!(
				segment = %change.name,
				expected = entry.since,
				got = change.since,
				"stale segment delta discarded"
			);
			return false;
		}
		entry.apply_delta(&change.added, &change.removed, change.till);
		true
	}
}
