// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Push lifecycle orchestration.
//!
//! The push manager owns the authenticate-then-stream sequence and reacts
//! to control-plane events from the dispatcher. Polling runs regardless of
//! push state; push only makes convergence faster, so every failure here
//! degrades to polling rather than propagating.
//!
//! At most one timer is ever pending: scheduling a token refresh or an auth
//! retry cancels whatever was scheduled before it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use beacon_flags_core::FetchOptions;

use crate::auth::AuthClient;
use crate::dispatcher::PushEvent;
use crate::sync::{FlagSynchronizer, SegmentCoordinator};
use crate::transport::{StreamStatus, StreamingTransport};

pub struct PushManager {
	auth: AuthClient,
	transport: Arc<StreamingTransport>,
	flags: Arc<FlagSynchronizer>,
	segments: Arc<SegmentCoordinator>,
	stream_url: String,
	retry_backoff: Duration,
	running: AtomicBool,
	/// Cleared while publishers are absent or a control pause is in effect.
	streaming_active: AtomicBool,
	timer: Mutex<Option<JoinHandle<()>>>,
	event_task: Mutex<Option<JoinHandle<()>>>,
}

impl PushManager {
	/// Builds the manager and launches its event loop over the dispatcher's
	/// control-plane channel. The loop runs for the manager's lifetime;
	/// `start`/`stop` gate what it acts on.
	pub fn new(
		auth: AuthClient,
		transport: Arc<StreamingTransport>,
		flags: Arc<FlagSynchronizer>,
		segments: Arc<SegmentCoordinator>,
		stream_url: impl Into<String>,
		retry_backoff: Duration,
		events: mpsc::UnboundedReceiver<PushEvent>,
	) -> Arc<Self> {
		let manager = Arc::new(Self {
			auth,
			transport,
			flags,
			segments,
			stream_url: stream_url.into(),
			retry_backoff,
			running: AtomicBool::new(false),
			streaming_active: AtomicBool::new(false),
			timer: Mutex::new(None),
			event_task: Mutex::new(None),
		});
		// The loop holds only a weak handle so the manager can drop while
		// the dispatcher side of the channel is still alive.
		let weak = Arc::downgrade(&manager);
		let handle = tokio::spawn(async move { Self::event_loop(weak, events).await });
		*manager.slot(&manager.event_task) = Some(handle);
		manager
	}

	/// Authenticates and, when granted, opens the stream and schedules the
	/// token refresh at the server-declared expiry. A denied-but-retryable
	/// outcome schedules exactly one retry at the backoff base.
	pub async fn start(self: &Arc<Self>) {
		self.running.store(true, Ordering::SeqCst);
		let outcome = self.auth.authenticate().await;

		if outcome.push_enabled {
			let url = format!(
				"{}?v=1.1&channels={}&accessToken={}",
				self.stream_url, outcome.channels, outcome.token
			);
			let opened = self.transport.open(url).await;
			self.streaming_active.store(opened, Ordering::SeqCst);
			if opened {
				info!("push streaming established");
				if let Some(expires_in) = outcome.expires_in {
					self.schedule(expires_in, "token refresh");
				}
			}
			// A failed open surfaces as a status event; the event loop
			// decides whether to retry.
			return;
		}

		self.transport.close();
		self.streaming_active.store(false, Ordering::SeqCst);
		if outcome.retry {
			self.schedule(self.retry_backoff, "authentication retry");
		} else {
			debug!("push disabled for this session");
		}
	}

	/// Stops streaming and cancels any pending timer. Idempotent; polling
	/// synchronizers are unaffected.
	pub fn stop(&self) {
		if !self.running.swap(false, Ordering::SeqCst) {
			debug!("push manager not running");
			return;
		}
		self.cancel_timer();
		self.transport.close();
		self.streaming_active.store(false, Ordering::SeqCst);
	}

	pub fn is_streaming(&self) -> bool {
		self.streaming_active.load(Ordering::SeqCst)
	}

	/// Arms the single pending timer, replacing any previous one. When it
	/// fires, the transport is stopped first, then the full start sequence
	/// re-runs from authentication.
	fn schedule(self: &Arc<Self>, delay: Duration, reason: &'static str) {
		let me = Arc::clone(self);
		let handle = tokio::spawn(async move {
			tokio::time::sleep(delay).await;
			if !me.running.load(Ordering::SeqCst) {
				return;
			}
			debug!(reason, "push timer fired");
			me.transport.close();
			me.start().await;
		});
		debug!(reason, delay_ms = delay.as_millis(), "push timer armed");
		if let Some(previous) = self.slot(&self.timer).replace(handle) {
			previous.abort();
		}
	}

	fn cancel_timer(&self) {
		if let Some(handle) = self.slot(&self.timer).take() {
			handle.abort();
		}
	}

	async fn event_loop(weak: Weak<Self>, mut events: mpsc::UnboundedReceiver<PushEvent>) {
		while let Some(event) = events.recv().await {
			let Some(me) = weak.upgrade() else {
				break;
			};
			if !me.running.load(Ordering::SeqCst) {
				debug!(?event, "push event ignored while stopped");
				continue;
			}
			match event {
				PushEvent::Status(StreamStatus::Connected) => {
					debug!("stream connected");
				}
				PushEvent::Status(StreamStatus::RetryableError) => {
					warn!("stream lost, restarting push and resyncing");
					me.transport.close();
					me.streaming_active.store(false, Ordering::SeqCst);
					me.schedule(me.retry_backoff, "stream reconnect");
					me.resync().await;
				}
				PushEvent::Status(StreamStatus::NonRetryableError) => {
					warn!("stream rejected, push disabled until next start");
					me.transport.close();
					me.streaming_active.store(false, Ordering::SeqCst);
					me.cancel_timer();
				}
				PushEvent::Status(StreamStatus::ForcedStop) => {
					debug!("stream stopped locally");
				}
				PushEvent::StreamingPaused => {
					info!("streaming paused, polling carries synchronization");
					me.streaming_active.store(false, Ordering::SeqCst);
				}
				PushEvent::StreamingResumed => {
					if !me.streaming_active.swap(true, Ordering::SeqCst) {
						info!("streaming resumed, resyncing missed changes");
						me.resync().await;
					}
				}
				PushEvent::StreamingDisabled => {
					warn!("streaming disabled by server, polling only");
					me.transport.close();
					me.streaming_active.store(false, Ordering::SeqCst);
					me.cancel_timer();
				}
			}
		}
		debug!("push event loop ended");
	}

	/// Full refresh of flags and every known segment, run after any gap in
	/// stream coverage.
	async fn resync(&self) {
		let options = FetchOptions::new();
		let flags_changed = self.flags.fetch_all(options).await;
		let segments_changed = self.segments.fetch_all(options).await;
		debug!(flags_changed, segments_changed, "resync complete");
	}

	fn slot<'a>(
		&self,
		cell: &'a Mutex<Option<JoinHandle<()>>>,
	) -> std::sync::MutexGuard<'a, Option<JoinHandle<()>>> {
		cell.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

impl Drop for PushManager {
	fn drop(&mut self) {
		for cell in [&self.timer, &self.event_task] {
			if let Some(handle) = self.slot(cell).take() {
				handle.abort();
			}
		}
	}
}
