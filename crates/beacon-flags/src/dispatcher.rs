// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Routes decoded stream notifications to the synchronizers.
//!
//! The dispatcher sits between the transport's read loop and everything
//! downstream, so its handlers must never block on I/O: data-plane
//! notifications only bump cursors and wake polling tasks; control-plane
//! signals are forwarded on an unbounded channel for the push manager to act
//! on at its own pace. Malformed or unrecognized messages are logged and
//! dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use beacon_flags_core::{ControlType, Notification, NotificationEnvelope, StreamFrame};

use crate::cache::VersionedCache;
use crate::sync::{FlagSynchronizer, SegmentCoordinator};
use crate::transport::{StreamObserver, StreamStatus};

/// Control-plane signal forwarded to the push manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushEvent {
	StreamingPaused,
	StreamingResumed,
	StreamingDisabled,
	Status(StreamStatus),
}

pub struct NotificationDispatcher {
	flags: Arc<FlagSynchronizer>,
	segments: Arc<SegmentCoordinator>,
	cache: Arc<VersionedCache>,
	events: mpsc::UnboundedSender<PushEvent>,
	publishers: Mutex<HashMap<String, i64>>,
}

impl NotificationDispatcher {
	pub fn new(
		flags: Arc<FlagSynchronizer>,
		segments: Arc<SegmentCoordinator>,
		cache: Arc<VersionedCache>,
		events: mpsc::UnboundedSender<PushEvent>,
	) -> Self {
		Self {
			flags,
			segments,
			cache,
			events,
			publishers: Mutex::new(HashMap::new()),
		}
	}

	fn handle(&self, channel: &str, notification: Notification) {
		match notification {
			Notification::FlagChange { change_number } => {
				self.flags.notify_change(change_number);
			}
			Notification::FlagKill {
				change_number,
				flag_name,
				default_treatment,
			} => {
				// Apply locally first, then let the next poll reconcile the
				// full definition.
				self.cache.kill_flag(&flag_name, &default_treatment, change_number);
				self.flags.notify_change(change_number);
			}
			Notification::SegmentChange {
				change_number,
				segment_name,
			} => {
				self.segments.notify_change(&segment_name, change_number);
			}
			Notification::Control { control_type } => {
				let event = match control_type {
					ControlType::StreamingPaused => PushEvent::StreamingPaused,
					ControlType::StreamingResumed => PushEvent::StreamingResumed,
					ControlType::StreamingDisabled => PushEvent::StreamingDisabled,
				};
				self.send(event);
			}
			Notification::Occupancy { metrics } => {
				self.record_occupancy(channel, metrics.publishers);
			}
		}
	}

	/// Tracks publisher presence per channel. A channel whose publishers
	/// all vanish is treated as if a pause control arrived on it; their
	/// reappearance on that channel resumes it.
	fn record_occupancy(&self, channel: &str, publishers: i64) {
		let publishers = publishers.max(0);
		let previous = self
			.publishers
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.insert(channel.to_string(), publishers)
			.unwrap_or(0);

		debug!(channel, publishers, previous, "occupancy update");
		if previous > 0 && publishers == 0 {
			self.send(PushEvent::StreamingPaused);
		} else if previous == 0 && publishers > 0 {
			self.send(PushEvent::StreamingResumed);
		}
	}

	fn send(&self, event: PushEvent) {
		if self.events.send(event).is_err() {
			debug!(?event, "push event receiver gone, dropped");
		}
	}
}

impl StreamObserver for NotificationDispatcher {
	fn on_message(&self, frame: StreamFrame) {
		let envelope = match NotificationEnvelope::parse(&frame.data) {
			Ok(envelope) => envelope,
			Err(e) => {
				warn!(error = %e, "undecodable stream message dropped");
				return;
			}
		};
		match Notification::parse(&envelope.data) {
			Ok(Some(notification)) => self.handle(&envelope.channel, notification),
			Ok(None) => {
				debug!(channel = %envelope.channel, "unrecognized notification type, dropped");
			}
			Err(e) => {
				warn!(channel = %envelope.channel, error = %e, "malformed notification dropped");
			}
		}
	}

	fn on_status_change(&self, status: StreamStatus) {
		self.send(PushEvent::Status(status));
	}
}
