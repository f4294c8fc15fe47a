// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for wire decoding and structural validation.

use thiserror::Error;

/// Result type for beacon-flags-core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
	/// The payload is not valid JSON, or a known notification type carries
	/// broken fields.
	#[error("malformed notification payload: {0}")]
	MalformedNotification(#[source] serde_json::Error),

	/// The payload has no `type` discriminator at all.
	#[error("notification payload has no type discriminator")]
	MissingNotificationType,

	/// A fetched flag definition failed structural validation.
	#[error("flag '{name}' failed validation: {reason}")]
	InvalidFlag { name: String, reason: String },
}
