// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authentication endpoint wire types.

use serde::{Deserialize, Serialize};

/// Body of a successful authentication response.
///
/// `channels` and `exp` only carry meaning when `push_enabled` is true;
/// the server may omit them otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthPayload {
	#[serde(rename = "pushEnabled")]
	pub push_enabled: bool,
	#[serde(default)]
	pub token: String,
	#[serde(default)]
	pub channels: String,
	/// Token lifetime in seconds, as declared by the server.
	#[serde(default)]
	pub exp: u64,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_full_payload() {
		let payload: AuthPayload = serde_json::from_str(
			r#"{"pushEnabled":true,"token":"jwt","channels":"flags_pri,segments_pri","exp":600}"#,
		)
		.unwrap();
		assert!(payload.push_enabled);
		assert_eq!(payload.token, "jwt");
		assert_eq!(payload.channels, "flags_pri,segments_pri");
		assert_eq!(payload.exp, 600);
	}

	#[test]
	fn test_disabled_payload_may_omit_token_fields() {
		let payload: AuthPayload = serde_json::from_str(r#"{"pushEnabled":false}"#).unwrap();
		assert!(!payload.push_enabled);
		assert!(payload.token.is_empty());
		assert_eq!(payload.exp, 0);
	}
}
