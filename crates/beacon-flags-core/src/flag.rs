// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Flag definition wire types.
//!
//! A flag ("split") is a named toggle with an ordered list of evaluation
//! conditions. Definitions arrive from the change-fetch endpoint and are
//! replaced wholesale on every update; there is no partial mutation.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Matcher type for segment-membership conditions.
pub const IN_SEGMENT: &str = "IN_SEGMENT";

/// Lifecycle status of a flag as reported by the remote authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlagStatus {
	Active,
	Archived,
}

/// A single matcher inside a condition's matcher group.
///
/// Only the fields the synchronization core needs are modelled; the
/// evaluation engine owns the full matcher vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Matcher {
	pub matcher_type: String,
	/// Present when `matcher_type` is [`IN_SEGMENT`].
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub segment_name: Option<String>,
}

/// Matchers combined under one boolean combiner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatcherGroup {
	#[serde(default = "default_combiner")]
	pub combiner: String,
	pub matchers: Vec<Matcher>,
}

fn default_combiner() -> String {
	"AND".to_string()
}

/// Treatment bucket inside a condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partition {
	pub treatment: String,
	pub size: u8,
}

/// One evaluation condition: a matcher group plus its treatment partitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
	pub matcher_group: MatcherGroup,
	pub partitions: Vec<Partition>,
}

/// Authoritative definition of one flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagDefinition {
	pub name: String,
	pub status: FlagStatus,
	#[serde(default)]
	pub killed: bool,
	pub default_treatment: String,
	#[serde(default)]
	pub conditions: Vec<Condition>,
	#[serde(default)]
	pub traffic_allocation_seed: i64,
	pub change_number: i64,
}

impl FlagDefinition {
	/// Whether this definition still participates in condition matching.
	///
	/// Archived and killed flags keep their identity so evaluation can
	/// report the forced default treatment, but carry no conditions.
	pub fn is_live(&self) -> bool {
		self.status == FlagStatus::Active && !self.killed
	}

	/// Structural validation of a fetched definition.
	///
	/// A condition with no matchers cannot be evaluated; an `IN_SEGMENT`
	/// matcher without a segment name is unusable. Either fault invalidates
	/// only this definition, never the batch it arrived in.
	pub fn validate(&self) -> Result<()> {
		for condition in &self.conditions {
			if condition.matcher_group.matchers.is_empty() {
				return Err(CoreError::InvalidFlag {
					name: self.name.clone(),
					reason: "condition has an empty matcher group".to_string(),
				});
			}
			for matcher in &condition.matcher_group.matchers {
				if matcher.matcher_type == IN_SEGMENT && matcher.segment_name.is_none() {
					return Err(CoreError::InvalidFlag {
						name: self.name.clone(),
						reason: "IN_SEGMENT matcher without a segment name".to_string(),
					});
				}
			}
		}
		Ok(())
	}

	/// Names of all segments referenced by this definition's conditions.
	pub fn referenced_segments(&self) -> Vec<&str> {
		self.conditions
			.iter()
			.flat_map(|c| c.matcher_group.matchers.iter())
			.filter(|m| m.matcher_type == IN_SEGMENT)
			.filter_map(|m| m.segment_name.as_deref())
			.collect()
	}

	/// Applies a kill: identity is preserved, conditions are dropped and the
	/// default treatment is forced.
	pub fn kill(&mut self, default_treatment: String, change_number: i64) {
		self.killed = true;
		self.default_treatment = default_treatment;
		self.conditions.clear();
		self.change_number = change_number;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn definition(name: &str) -> FlagDefinition {
		FlagDefinition {
			name: name.to_string(),
			status: FlagStatus::Active,
			killed: false,
			default_treatment: "off".to_string(),
			conditions: vec![Condition {
				matcher_group: MatcherGroup {
					combiner: "AND".to_string(),
					matchers: vec![Matcher {
						matcher_type: "ALL_KEYS".to_string(),
						segment_name: None,
					}],
				},
				partitions: vec![Partition {
					treatment: "on".to_string(),
					size: 100,
				}],
			}],
			traffic_allocation_seed: -1,
			change_number: 10,
		}
	}

	#[test]
	fn test_validate_accepts_well_formed_definition() {
		assert!(definition("checkout_flow").validate().is_ok());
	}

	#[test]
	fn test_validate_rejects_empty_matcher_group() {
		let mut def = definition("checkout_flow");
		def.conditions[0].matcher_group.matchers.clear();
		assert!(def.validate().is_err());
	}

	#[test]
	fn test_validate_rejects_segment_matcher_without_name() {
		let mut def = definition("checkout_flow");
		def.conditions[0].matcher_group.matchers[0] = Matcher {
			matcher_type: IN_SEGMENT.to_string(),
			segment_name: None,
		};
		assert!(def.validate().is_err());
	}

	#[test]
	fn test_kill_forces_default_and_drops_conditions() {
		let mut def = definition("checkout_flow");
		def.kill("off".to_string(), 42);

		assert!(def.killed);
		assert!(!def.is_live());
		assert!(def.conditions.is_empty());
		assert_eq!(def.default_treatment, "off");
		assert_eq!(def.change_number, 42);
		// Identity survives the kill.
		assert_eq!(def.name, "checkout_flow");
	}

	#[test]
	fn test_referenced_segments() {
		let mut def = definition("checkout_flow");
		def.conditions[0].matcher_group.matchers.push(Matcher {
			matcher_type: IN_SEGMENT.to_string(),
			segment_name: Some("beta_users".to_string()),
		});

		assert_eq!(def.referenced_segments(), vec!["beta_users"]);
	}

	#[test]
	fn test_wire_field_names_are_camel_case() {
		let json = serde_json::to_string(&definition("checkout_flow")).unwrap();
		assert!(json.contains(r#""defaultTreatment":"off""#));
		assert!(json.contains(r#""changeNumber":10"#));
		assert!(json.contains(r#""matcherType":"ALL_KEYS""#));
		assert!(json.contains(r#""status":"ACTIVE""#));
	}

	#[test]
	fn test_deserialize_tolerates_missing_optional_fields() {
		let json = r#"{
			"name": "billing_rework",
			"status": "ARCHIVED",
			"defaultTreatment": "off",
			"changeNumber": 7
		}"#;
		let def: FlagDefinition = serde_json::from_str(json).unwrap();
		assert_eq!(def.status, FlagStatus::Archived);
		assert!(!def.killed);
		assert!(def.conditions.is_empty());
		assert!(!def.is_live());
	}
}
