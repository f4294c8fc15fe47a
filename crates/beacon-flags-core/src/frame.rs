// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Line-oriented stream frames.
//!
//! The streaming endpoint delivers blank-line-delimited frames of
//! `field: value` lines. The transport assembles raw frames; this module
//! parses them. A frame consisting solely of the keep-alive payload carries
//! no data and is discarded by the transport.

/// The fixed keep-alive payload sent by the server between events.
pub const KEEP_ALIVE_PAYLOAD: &str = ":keepalive";

/// One parsed stream frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamFrame {
	pub id: Option<String>,
	pub event: Option<String>,
	/// Concatenation of all `data` lines, newline-joined.
	pub data: String,
}

impl StreamFrame {
	/// Parses a raw frame body (the text between two blank lines).
	///
	/// Comment lines (leading `:`) and unknown fields are skipped, per the
	/// wire protocol's forward compatibility rules.
	pub fn parse(raw: &str) -> Self {
		let mut frame = StreamFrame::default();
		for line in raw.lines() {
			if line.starts_with(':') {
				continue;
			}
			let (field, value) = match line.split_once(':') {
				Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
				None => (line, ""),
			};
			match field {
				"id" => frame.id = Some(value.to_string()),
				"event" => frame.event = Some(value.to_string()),
				"data" => {
					if !frame.data.is_empty() {
						frame.data.push('\n');
					}
					frame.data.push_str(value);
				}
				_ => {}
			}
		}
		frame
	}

	/// Whether the frame carries a payload worth dispatching.
	pub fn is_empty(&self) -> bool {
		self.data.is_empty()
	}
}
