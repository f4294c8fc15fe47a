// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the synchronization client.
//!
//! None of these errors ever reach an evaluation caller: synchronizers
//! swallow and log them, leaving the cache at its last consistent cursor.
//! The worst observable outcome is a readiness gate that never opens.
//! Streaming failures are not errors at all; the transport reports them as
//! [`StreamStatus`](crate::transport::StreamStatus) transitions.

use thiserror::Error;

/// Result type for beacon-flags operations.
pub type Result<T> = std::result::Result<T, FlagsError>;

#[derive(Debug, Error)]
pub enum FlagsError {
	/// 4xx from the authentication endpoint. Terminal for this session;
	/// push stays disabled and no retry is scheduled.
	#[error("authentication rejected with status {status}")]
	AuthRejected { status: u16 },

	/// Could not reach the authentication endpoint. Push stays disabled,
	/// but a retry is scheduled.
	#[error("authentication request failed: {0}")]
	AuthConnection(#[source] reqwest::Error),

	/// 5xx from the authentication endpoint. Treated as transient, so a
	/// retry is scheduled.
	#[error("authentication endpoint unavailable, status {status}")]
	AuthServerError { status: u16 },

	/// A change-fetch request failed. The cursor is left unchanged and the
	/// next scheduled tick retries.
	#[error("change fetch failed: {0}")]
	Fetch(#[source] reqwest::Error),

	/// A change-fetch response could not be decoded.
	#[error("change fetch returned an undecodable body: {0}")]
	FetchDecode(#[source] reqwest::Error),
}
