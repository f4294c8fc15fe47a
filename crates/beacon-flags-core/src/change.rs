// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Incremental change-log types shared by the polling synchronizers.
//!
//! The remote authority exposes a change log addressed by a `(since, till)`
//! cursor pair. A fetch at cursor `since` returns everything up to `till`;
//! `till == since` means the caller is caught up.

use serde::{Deserialize, Serialize};

use crate::flag::FlagDefinition;

/// Cursor value meaning "no position" (fresh cache, or no target demanded).
pub const NO_CURSOR: i64 = -1;

/// One page of the flag change log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagChangeBatch {
	#[serde(rename = "splits")]
	pub flags: Vec<FlagDefinition>,
	pub since: i64,
	pub till: i64,
}

impl FlagChangeBatch {
	/// Whether the server reports more data beyond this page.
	pub fn has_more(&self) -> bool {
		self.till != self.since
	}
}

/// Immutable per-request fetch options.
///
/// Callers construct options once and hand out references; the one-shot
/// cache-bypass flag is consumed by deriving a cleared copy, never by
/// mutating the caller's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
	/// Ask intermediaries to skip their cache for this request.
	pub cache_bypass: bool,
	/// Change number the caller demands to reach, or [`NO_CURSOR`].
	pub target_change_number: i64,
}

impl FetchOptions {
	pub fn new() -> Self {
		Self {
			cache_bypass: false,
			target_change_number: NO_CURSOR,
		}
	}

	/// Options demanding a specific change number, with the CDN bypass armed
	/// for the first request of the refresh sequence.
	pub fn with_target(target_change_number: i64) -> Self {
		Self {
			cache_bypass: true,
			target_change_number,
		}
	}

	/// A copy with the one-shot bypass consumed and the target dropped,
	/// for the second and later pages of one refresh.
	pub fn consumed(&self) -> Self {
		Self {
			cache_bypass: false,
			target_change_number: NO_CURSOR,
		}
	}
}

impl Default for FetchOptions {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_batch_has_more() {
		let caught_up = FlagChangeBatch {
			flags: vec![],
			since: 5,
			till: 5,
		};
		assert!(!caught_up.has_more());

		let more = FlagChangeBatch {
			flags: vec![],
			since: 5,
			till: 9,
		};
		assert!(more.has_more());
	}

	#[test]
	fn test_options_consumed_clears_bypass_and_target() {
		let original = FetchOptions::with_target(123);
		let next = original.consumed();

		assert!(!next.cache_bypass);
		assert_eq!(next.target_change_number, NO_CURSOR);
		// The original is untouched.
		assert!(original.cache_bypass);
		assert_eq!(original.target_change_number, 123);
	}

	#[test]
	fn test_batch_wire_field_is_splits() {
		let json = r#"{"splits": [], "since": -1, "till": 2}"#;
		let batch: FlagChangeBatch = serde_json::from_str(json).unwrap();
		assert_eq!(batch.since, -1);
		assert_eq!(batch.till, 2);
		assert!(batch.flags.is_empty());
	}
}
