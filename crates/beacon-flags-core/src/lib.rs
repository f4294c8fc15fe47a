// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core wire types for the Beacon feature flags system.
//!
//! This crate provides the shared types exchanged between the remote flag
//! authority and the synchronization client (`beacon-flags`): flag
//! definitions, segment membership deltas, change-log batches, stream frames
//! and notifications, and the authentication payload.
//!
//! # Overview
//!
//! Remote state is addressed by a change-log cursor (`since`/`till`). The
//! synchronization client pulls pages of [`FlagChangeBatch`] and
//! [`SegmentChange`] forward from its last-applied cursor, and receives
//! [`Notification`] values over a push stream telling it when and what to
//! pull next.
//!
//! # Example
//!
//! ```
//! use beacon_flags_core::{FetchOptions, Notification};
//!
//! // A targeted refresh arms the one-shot CDN bypass...
//! let options = FetchOptions::with_target(123);
//! assert!(options.cache_bypass);
//!
//! // ...which later pages of the same refresh no longer carry.
//! assert!(!options.consumed().cache_bypass);
//!
//! let n = Notification::parse(r#"{"type":"SPLIT_UPDATE","changeNumber":123}"#)
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(n, Notification::FlagChange { change_number: 123 });
//! ```

pub mod auth;
pub mod change;
pub mod error;
pub mod flag;
pub mod frame;
pub mod notification;
pub mod segment;

pub use auth::AuthPayload;
pub use change::{FetchOptions, FlagChangeBatch, NO_CURSOR};
pub use error::{CoreError, Result};
pub use flag::{
	Condition, FlagDefinition, FlagStatus, Matcher, MatcherGroup, Partition, IN_SEGMENT,
};
pub use frame::{StreamFrame, KEEP_ALIVE_PAYLOAD};
pub use notification::{ControlType, Notification, NotificationEnvelope, OccupancyMetrics};
pub use segment::{SegmentChange, SegmentMembership};

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	// Property-based tests for fetch options
	proptest! {
		#[test]
		fn consumed_options_never_carry_the_bypass(target in -1i64..1_000_000) {
			let original = FetchOptions::with_target(target);
			let consumed = original.consumed();
			prop_assert!(!consumed.cache_bypass);
			prop_assert_eq!(consumed.target_change_number, NO_CURSOR);
			// Consuming is derivation, not mutation.
			prop_assert_eq!(original.target_change_number, target);
			prop_assert!(original.cache_bypass);
		}
	}

	// Property-based tests for segment delta application
	proptest! {
		#[test]
		fn delta_application_advances_cursor(
			added in prop::collection::vec("[a-z]{1,8}", 0..20),
			removed in prop::collection::vec("[a-z]{1,8}", 0..20),
			till in 0i64..1_000_000,
		) {
			let mut membership = SegmentMembership::new("seg");
			membership.apply_delta(&added, &removed, till);
			prop_assert_eq!(membership.since, till);
			// Every surviving key was added and not removed.
			for key in &membership.keys {
				prop_assert!(added.contains(key));
				prop_assert!(!removed.contains(key));
			}
		}
	}

	// Property-based tests for notification decoding
	proptest! {
		#[test]
		fn flag_change_roundtrip(change_number in 0i64..i64::MAX) {
			let n = Notification::FlagChange { change_number };
			let json = serde_json::to_string(&n).unwrap();
			prop_assert!(json.contains(r#""type":"SPLIT_UPDATE""#));
			let parsed = Notification::parse(&json).unwrap().unwrap();
			prop_assert_eq!(parsed, n);
		}

		#[test]
		fn flag_kill_roundtrip(
			change_number in 0i64..i64::MAX,
			flag_name in "[a-z][a-z0-9_]{2,30}",
			default_treatment in "[a-z]{2,10}",
		) {
			let n = Notification::FlagKill {
				change_number,
				flag_name: flag_name.clone(),
				default_treatment: default_treatment.clone(),
			};
			let json = serde_json::to_string(&n).unwrap();
			let parsed = Notification::parse(&json).unwrap().unwrap();
			prop_assert_eq!(parsed, n);
		}

		#[test]
		fn unknown_types_never_error(kind in "[A-Z_]{3,20}") {
			prop_assume!(!["SPLIT_UPDATE", "SPLIT_KILL", "SEGMENT_UPDATE", "CONTROL", "OCCUPANCY"].contains(&kind.as_str()));
			let json = format!(r#"{{"type":"{kind}","whatever":true}}"#);
			prop_assert!(Notification::parse(&json).unwrap().is_none());
		}
	}

	// Property-based tests for frame parsing
	proptest! {
		#[test]
		fn data_lines_join_in_order(lines in prop::collection::vec("[a-z0-9]{1,12}", 1..6)) {
			let raw = lines
				.iter()
				.map(|l| format!("data: {l}"))
				.collect::<Vec<_>>()
				.join("\n");
			let frame = StreamFrame::parse(&raw);
			prop_assert_eq!(frame.data, lines.join("\n"));
		}
	}

	// Property-based tests for kill semantics
	proptest! {
		#[test]
		fn kill_always_strips_conditions(change_number in 0i64..i64::MAX) {
			let mut def = FlagDefinition {
				name: "f".to_string(),
				status: FlagStatus::Active,
				killed: false,
				default_treatment: "on".to_string(),
				conditions: vec![Condition {
					matcher_group: MatcherGroup {
						combiner: "AND".to_string(),
						matchers: vec![Matcher {
							matcher_type: "ALL_KEYS".to_string(),
							segment_name: None,
						}],
					},
					partitions: vec![Partition { treatment: "on".to_string(), size: 100 }],
				}],
				traffic_allocation_seed: -1,
				change_number: 0,
			};
			def.kill("off".to_string(), change_number);
			prop_assert!(def.conditions.is_empty());
			prop_assert!(!def.is_live());
			prop_assert_eq!(def.change_number, change_number);
		}
	}
}
