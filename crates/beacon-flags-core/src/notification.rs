// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Typed notifications decoded from the push stream.
//!
//! A stream frame's `data` field carries an envelope naming the channel the
//! message was published on; the envelope's own `data` field is a JSON string
//! holding the notification itself, discriminated by its `type` field.
//!
//! The notification vocabulary is fixed: flag change, flag kill, segment
//! change, control, occupancy. Anything outside it is ignored.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Outer envelope of one stream message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEnvelope {
	#[serde(default)]
	pub channel: String,
	/// The notification payload, JSON-encoded.
	pub data: String,
}

impl NotificationEnvelope {
	pub fn parse(raw: &str) -> Result<Self> {
		serde_json::from_str(raw).map_err(CoreError::MalformedNotification)
	}
}

/// Control subtypes published on the control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlType {
	StreamingPaused,
	StreamingResumed,
	StreamingDisabled,
}

/// Publisher counts attached to an occupancy notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancyMetrics {
	pub publishers: i64,
}

/// A decoded stream notification, consumed exactly once by its handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Notification {
	/// The flag change log advanced to `change_number`.
	#[serde(rename = "SPLIT_UPDATE")]
	FlagChange {
		#[serde(rename = "changeNumber")]
		change_number: i64,
	},
	/// A flag was killed; applicable locally without a fetch.
	#[serde(rename = "SPLIT_KILL")]
	FlagKill {
		#[serde(rename = "changeNumber")]
		change_number: i64,
		#[serde(rename = "splitName")]
		flag_name: String,
		#[serde(rename = "defaultTreatment")]
		default_treatment: String,
	},
	/// A segment's change log advanced to `change_number`.
	#[serde(rename = "SEGMENT_UPDATE")]
	SegmentChange {
		#[serde(rename = "changeNumber")]
		change_number: i64,
		#[serde(rename = "segmentName")]
		segment_name: String,
	},
	/// Streaming control directive.
	#[serde(rename = "CONTROL")]
	Control {
		#[serde(rename = "controlType")]
		control_type: ControlType,
	},
	/// Publisher-presence report for the message's channel.
	#[serde(rename = "OCCUPANCY")]
	Occupancy { metrics: OccupancyMetrics },
}

const KNOWN_TYPES: &[&str] = &[
	"SPLIT_UPDATE",
	"SPLIT_KILL",
	"SEGMENT_UPDATE",
	"CONTROL",
	"OCCUPANCY",
];

impl Notification {
	/// Decodes a notification payload.
	///
	/// Returns `Ok(None)` for a structurally valid payload whose `type` is
	/// outside the fixed vocabulary; such messages are dropped silently by
	/// the dispatcher. A payload of a known type with broken fields is an
	/// error.
	pub fn parse(data: &str) -> Result<Option<Self>> {
		let value: serde_json::Value =
			serde_json::from_str(data).map_err(CoreError::MalformedNotification)?;
		let kind = value
			.get("type")
			.and_then(|t| t.as_str())
			.ok_or(CoreError::MissingNotificationType)?;
		if !KNOWN_TYPES.contains(&kind) {
			return Ok(None);
		}
		serde_json::from_value(value)
			.map(Some)
			.map_err(CoreError::MalformedNotification)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_flag_change() {
		let n = Notification::parse(r#"{"type":"SPLIT_UPDATE","changeNumber":1585867723838}"#)
			.unwrap()
			.unwrap();
		assert_eq!(
			n,
			Notification::FlagChange {
				change_number: 1585867723838
			}
		);
	}

	#[test]
	fn test_parse_flag_kill() {
		let n = Notification::parse(
			r#"{"type":"SPLIT_KILL","changeNumber":5,"splitName":"checkout_flow","defaultTreatment":"off"}"#,
		)
		.unwrap()
		.unwrap();
		assert_eq!(
			n,
			Notification::FlagKill {
				change_number: 5,
				flag_name: "checkout_flow".to_string(),
				default_treatment: "off".to_string(),
			}
		);
	}

	#[test]
	fn test_parse_segment_change() {
		let n = Notification::parse(
			r#"{"type":"SEGMENT_UPDATE","changeNumber":9,"segmentName":"beta_users"}"#,
		)
		.unwrap()
		.unwrap();
		assert_eq!(
			n,
			Notification::SegmentChange {
				change_number: 9,
				segment_name: "beta_users".to_string(),
			}
		);
	}

	#[test]
	fn test_parse_control() {
		let n = Notification::parse(r#"{"type":"CONTROL","controlType":"STREAMING_PAUSED"}"#)
			.unwrap()
			.unwrap();
		assert_eq!(
			n,
			Notification::Control {
				control_type: ControlType::StreamingPaused
			}
		);
	}

	#[test]
	fn test_parse_occupancy() {
		let n = Notification::parse(r#"{"type":"OCCUPANCY","metrics":{"publishers":2}}"#)
			.unwrap()
			.unwrap();
		assert_eq!(
			n,
			Notification::Occupancy {
				metrics: OccupancyMetrics { publishers: 2 }
			}
		);
	}

	#[test]
	fn test_unknown_type_is_ignored_not_an_error() {
		let n = Notification::parse(r#"{"type":"MY_NEW_THING","foo":1}"#).unwrap();
		assert!(n.is_none());
	}

	#[test]
	fn test_known_type_with_broken_fields_is_an_error() {
		assert!(Notification::parse(r#"{"type":"SPLIT_UPDATE"}"#).is_err());
	}

	#[test]
	fn test_missing_type_is_an_error() {
		assert!(Notification::parse(r#"{"changeNumber":1}"#).is_err());
		assert!(Notification::parse("not json").is_err());
	}

	#[test]
	fn test_envelope_parse() {
		let envelope = NotificationEnvelope::parse(
			r#"{"channel":"flags_pri","data":"{\"type\":\"SPLIT_UPDATE\",\"changeNumber\":3}"}"#,
		)
		.unwrap();
		assert_eq!(envelope.channel, "flags_pri");

		let n = Notification::parse(&envelope.data).unwrap().unwrap();
		assert_eq!(n, Notification::FlagChange { change_number: 3 });
	}
}
