// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Push authentication client.
//!
//! Authentication never fails the session outright: every outcome folds
//! into an [`AuthResult`] telling the push manager whether push is usable
//! and whether another attempt is worth scheduling. A 4xx means the key
//! will never be accepted, so retrying is pointless; connection failures
//! and server errors are transient and flagged retryable.

use std::time::Duration;

use tracing::{debug, warn};

use beacon_flags_core::AuthPayload;

use crate::error::{FlagsError, Result};

/// Outcome of one authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResult {
	pub push_enabled: bool,
	pub token: String,
	pub channels: String,
	/// Server-declared token lifetime; `None` when the server declared no
	/// lifetime, in which case no refresh is scheduled.
	pub expires_in: Option<Duration>,
	/// Whether another attempt should be scheduled after the backoff.
	pub retry: bool,
}

impl AuthResult {
	fn denied(retry: bool) -> Self {
		Self {
			push_enabled: false,
			token: String::new(),
			channels: String::new(),
			expires_in: None,
			retry,
		}
	}
}

impl From<AuthPayload> for AuthResult {
	fn from(payload: AuthPayload) -> Self {
		let expires_in = (payload.exp > 0).then(|| Duration::from_secs(payload.exp));
		Self {
			push_enabled: payload.push_enabled,
			token: payload.token,
			channels: payload.channels,
			expires_in,
			retry: false,
		}
	}
}

pub struct AuthClient {
	client: reqwest::Client,
	url: String,
	sdk_key: String,
}

impl AuthClient {
	pub fn new(client: reqwest::Client, url: impl Into<String>, sdk_key: impl Into<String>) -> Self {
		Self {
			client,
			url: url.into(),
			sdk_key: sdk_key.into(),
		}
	}

	/// Runs one authentication attempt and classifies the outcome.
	pub async fn authenticate(&self) -> AuthResult {
		match self.request().await {
			Ok(payload) => {
				debug!(
					push_enabled = payload.push_enabled,
					exp = payload.exp,
					"authentication succeeded"
				);
				AuthResult::from(payload)
			}
			Err(FlagsError::AuthRejected { status }) => {
				warn!(status, "authentication rejected, push disabled for this session");
				AuthResult::denied(false)
			}
			Err(e) => {
				warn!(error = %e, "authentication attempt failed, will retry");
				AuthResult::denied(true)
			}
		}
	}

	async fn request(&self) -> Result<AuthPayload> {
		let response = self
			.client
			.get(&self.url)
			.bearer_auth(&self.sdk_key)
			.send()
			.await
			.map_err(FlagsError::AuthConnection)?;
		let status = response.status();
		if status.is_client_error() {
			return Err(FlagsError::AuthRejected {
				status: status.as_u16(),
			});
		}
		if !status.is_success() {
			return Err(FlagsError::AuthServerError {
				status: status.as_u16(),
			});
		}
		response.json().await.map_err(FlagsError::AuthConnection)
	}
}
