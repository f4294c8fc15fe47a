// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Segment membership types.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::change::NO_CURSOR;

/// One page of a segment's change log: an add/remove delta relative to
/// the `since` cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentChange {
	pub name: String,
	pub added: Vec<String>,
	pub removed: Vec<String>,
	pub since: i64,
	pub till: i64,
}

impl SegmentChange {
	pub fn has_more(&self) -> bool {
		self.till != self.since
	}
}

/// Materialized membership of one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentMembership {
	pub name: String,
	pub keys: HashSet<String>,
	pub since: i64,
}

impl SegmentMembership {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			keys: HashSet::new(),
			since: NO_CURSOR,
		}
	}

	/// Applies an add/remove delta and advances the cursor to `till`.
	///
	/// The caller is responsible for checking that the delta's `since`
	/// matches the current cursor before applying.
	pub fn apply_delta(&mut self, added: &[String], removed: &[String], till: i64) {
		for key in added {
			self.keys.insert(key.clone());
		}
		for key in removed {
			self.keys.remove(key);
		}
		self.since = till;
	}

	pub fn contains(&self, key: &str) -> bool {
		self.keys.contains(key)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_apply_delta_adds_removes_and_advances() {
		let mut membership = SegmentMembership::new("beta_users");
		membership.apply_delta(
			&["alice".to_string(), "bob".to_string()],
			&[],
			3,
		);
		assert!(membership.contains("alice"));
		assert!(membership.contains("bob"));
		assert_eq!(membership.since, 3);

		membership.apply_delta(&["carol".to_string()], &["bob".to_string()], 7);
		assert!(membership.contains("alice"));
		assert!(membership.contains("carol"));
		assert!(!membership.contains("bob"));
		assert_eq!(membership.since, 7);
	}

	#[test]
	fn test_remove_of_absent_key_is_harmless() {
		let mut membership = SegmentMembership::new("beta_users");
		membership.apply_delta(&[], &["ghost".to_string()], 1);
		assert!(membership.keys.is_empty());
		assert_eq!(membership.since, 1);
	}

	#[test]
	fn test_segment_change_deserializes() {
		let json = r#"{"name":"beta_users","added":["a"],"removed":[],"since":-1,"till":2}"#;
		let change: SegmentChange = serde_json::from_str(json).unwrap();
		assert_eq!(change.name, "beta_users");
		assert!(change.has_more());
	}
}
