// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the synchronization client.

use std::time::Duration;

/// Endpoints and timing knobs for one [`SyncManager`](crate::SyncManager).
#[derive(Debug, Clone)]
pub struct SyncConfig {
	/// Base URL of the change-fetch API (flag and segment changes).
	pub api_url: String,
	/// URL of the streaming-access authentication endpoint.
	pub auth_url: String,
	/// URL of the streaming endpoint.
	pub stream_url: String,
	/// Bearer token sent with every request.
	pub sdk_key: String,
	/// Fixed delay between flag polls.
	pub flags_refresh: Duration,
	/// Fixed delay between segment polls.
	pub segments_refresh: Duration,
	/// Fixed backoff base for authentication retries.
	pub auth_retry_backoff: Duration,
	/// How long `open()` waits for streaming first contact.
	pub connect_timeout: Duration,
	/// Whether to attempt push at all; polling always runs.
	pub streaming_enabled: bool,
}

impl SyncConfig {
	pub fn new(
		api_url: impl Into<String>,
		auth_url: impl Into<String>,
		stream_url: impl Into<String>,
		sdk_key: impl Into<String>,
	) -> Self {
		Self {
			api_url: api_url.into(),
			auth_url: auth_url.into(),
			stream_url: stream_url.into(),
			sdk_key: sdk_key.into(),
			..Self::default()
		}
	}
}

impl Default for SyncConfig {
	fn default() -> Self {
		Self {
			api_url: String::new(),
			auth_url: String::new(),
			stream_url: String::new(),
			sdk_key: String::new(),
			flags_refresh: Duration::from_secs(60),
			segments_refresh: Duration::from_secs(60),
			auth_retry_backoff: Duration::from_secs(1),
			connect_timeout: Duration::from_secs(30),
			streaming_enabled: true,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = SyncConfig::default();
		assert_eq!(config.connect_timeout, Duration::from_secs(30));
		assert_eq!(config.flags_refresh, Duration::from_secs(60));
		assert!(config.streaming_enabled);
	}

	#[test]
	fn test_new_keeps_default_timings() {
		let config = SyncConfig::new("http://api", "http://auth", "http://stream", "key");
		assert_eq!(config.api_url, "http://api");
		assert_eq!(config.auth_retry_backoff, Duration::from_secs(1));
	}
}
